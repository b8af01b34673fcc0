use std::collections::HashSet;

use common::YearMonth;
use compute::{ComputeError, MonthMaterializer, exclude_generated};
use model::entities::{recurring_expense, transaction};
use model::ledger::{LedgerEntry, RecurringTemplate};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Compute(#[from] ComputeError),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Result of one generation run.
#[derive(Debug)]
pub struct GenerationOutcome {
    pub month: YearMonth,
    pub created: Vec<transaction::Model>,
    /// Templates that already had a transaction for the month.
    pub skipped: usize,
}

/// Transactions of the user dated inside `month`, newest first.
pub async fn load_month_transactions<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    month: YearMonth,
) -> Result<Vec<transaction::Model>, DbErr> {
    transaction::Entity::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .filter(transaction::Column::CreatedAt.gte(month.start()))
        .filter(transaction::Column::CreatedAt.lt(month.end()))
        .order_by_desc(transaction::Column::CreatedAt)
        .order_by_desc(transaction::Column::Id)
        .all(db)
        .await
}

/// Every transaction of the user as ledger entries.
pub async fn load_ledger<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Vec<LedgerEntry>, DbErr> {
    let rows = transaction::Entity::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .order_by_asc(transaction::Column::CreatedAt)
        .all(db)
        .await?;
    Ok(rows.iter().map(LedgerEntry::from).collect())
}

/// Materializes the user's recurring expenses into `month`.
///
/// Templates that already produced a transaction for the month are skipped,
/// so running this twice is harmless. The inserts happen in one database
/// transaction; on any error nothing is written.
#[instrument(skip(db, materializer), fields(month = %month))]
pub async fn generate_month(
    db: &DatabaseConnection,
    materializer: &MonthMaterializer,
    user_id: i32,
    month: YearMonth,
) -> Result<GenerationOutcome, GenerationError> {
    let templates: Vec<RecurringTemplate> = recurring_expense::Entity::find()
        .filter(recurring_expense::Column::UserId.eq(user_id))
        .order_by_asc(recurring_expense::Column::Day)
        .order_by_asc(recurring_expense::Column::Id)
        .all(db)
        .await?
        .iter()
        .map(RecurringTemplate::from)
        .collect();
    debug!("Loaded {} recurring expenses", templates.len());

    let candidates = materializer.materialize(&templates, month)?;
    let period = month.to_string();
    let template_ids: Vec<i32> = templates.iter().map(|t| t.id).collect();

    let txn = db.begin().await?;

    let already_generated: HashSet<i32> = transaction::Entity::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .filter(transaction::Column::BillingPeriod.eq(period.as_str()))
        .filter(transaction::Column::RecurringExpenseId.is_in(template_ids))
        .all(&txn)
        .await?
        .into_iter()
        .filter_map(|row| row.recurring_expense_id)
        .collect();

    let (missing, skipped) = exclude_generated(candidates, &already_generated);

    let mut created = Vec::with_capacity(missing.len());
    for item in missing {
        let row = transaction::ActiveModel {
            user_id: Set(user_id),
            name: Set(item.name),
            amount: Set(item.amount),
            kind: Set(item.kind),
            category: Set(Some(item.category)),
            is_paid: Set(item.is_paid),
            created_at: Set(item.created_at),
            recurring_expense_id: Set(Some(item.recurring_expense_id)),
            billing_period: Set(Some(item.billing_period.to_string())),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        created.push(row);
    }

    txn.commit().await?;

    info!("Generated {} transactions for {}, skipped {}", created.len(), month, skipped);
    Ok(GenerationOutcome {
        month,
        created,
        skipped,
    })
}
