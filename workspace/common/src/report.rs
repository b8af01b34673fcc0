use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::YearMonth;

/// Totals over a set of transactions. Expense covers every non-income type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Summary {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
    /// Part of `expense` recorded as fixed.
    pub fixed: f64,
    /// Part of `expense` recorded as variable.
    pub variable: f64,
    /// Unpaid expenses still due.
    pub pending: f64,
    pub pending_count: usize,
    pub transaction_count: usize,
}

/// One row of the category ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategoryShare {
    pub key: String,
    pub label: String,
    pub icon: String,
    pub color: String,
    pub total: f64,
    /// Share of total expense, 0-100.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthBucket {
    #[schema(value_type = String, example = "2024-05")]
    pub period: YearMonth,
    pub label: String,
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

/// Everything the analysis view shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalysisReport {
    pub months: u32,
    pub trend: Vec<MonthBucket>,
    pub categories: Vec<CategoryShare>,
    pub total_expense: f64,
    /// Income minus expense over every transaction considered.
    pub total_saved: f64,
    /// Mean monthly savings rate in percent over months that had income.
    pub average_savings_rate: f64,
}
