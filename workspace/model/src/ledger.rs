//! Database-independent views of stored rows, consumed by the compute crate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::entities::{recurring_expense, transaction};
pub use crate::entities::transaction::TransactionKind;

/// A transaction reduced to what aggregation needs. Amounts are `f64`
/// because totals are only ever displayed.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    kind: TransactionKind,
    amount: f64,
    category: Option<String>,
    is_paid: bool,
    occurred_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(kind: TransactionKind, amount: f64, occurred_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            amount,
            category: None,
            is_paid: true,
            occurred_at,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn unpaid(mut self) -> Self {
        self.is_paid = false;
        self
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn is_paid(&self) -> bool {
        self.is_paid
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

impl From<&transaction::Model> for LedgerEntry {
    fn from(model: &transaction::Model) -> Self {
        Self {
            kind: model.kind,
            amount: model.amount.to_f64().unwrap_or(0.0),
            category: model.category.clone(),
            is_paid: model.is_paid,
            occurred_at: model.created_at,
        }
    }
}

/// A recurring expense template as the materializer sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringTemplate {
    pub id: i32,
    pub name: String,
    pub amount: Decimal,
    pub category: String,
    pub day: u32,
}

impl From<&recurring_expense::Model> for RecurringTemplate {
    fn from(model: &recurring_expense::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            amount: model.amount,
            category: model.category.clone(),
            // negative days can only come from manual edits and are rejected downstream
            day: u32::try_from(model.day).unwrap_or(0),
        }
    }
}
