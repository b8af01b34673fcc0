use sea_orm::entity::prelude::*;

/// An account holder. Everything else in the schema hangs off a user.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Stored lowercased and trimmed.
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2id hash in PHC string format.
    pub password_hash: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::session::Entity")]
    Session,
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transaction,
    #[sea_orm(has_many = "super::recurring_expense::Entity")]
    RecurringExpense,
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl Related<super::recurring_expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecurringExpense.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
