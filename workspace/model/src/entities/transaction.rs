use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Direction and nature of a transaction. Anything but `Income` counts as
/// an expense.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    #[sea_orm(string_value = "income")]
    Income,
    #[sea_orm(string_value = "fixed")]
    Fixed,
    #[sea_orm(string_value = "variable")]
    Variable,
}

impl TransactionKind {
    pub fn is_income(self) -> bool {
        self == TransactionKind::Income
    }

    pub fn is_expense(self) -> bool {
        !self.is_income()
    }
}

/// A single money movement of a user. Rows produced by month generation
/// remember the template and month they came from; those two columns are
/// plain values, not foreign keys, so template edits never cascade here.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    /// Non-negative magnitude; the sign comes from `kind`.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub amount: Decimal,
    #[sea_orm(column_name = "type")]
    pub kind: TransactionKind,
    /// Key into the static category table.
    pub category: Option<String>,
    #[sea_orm(default_value = "true")]
    pub is_paid: bool,
    /// The effective date of the transaction.
    pub created_at: DateTimeUtc,
    pub recurring_expense_id: Option<i32>,
    /// `YYYY-MM` of the generation run that produced this row.
    pub billing_period: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
