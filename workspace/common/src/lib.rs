//! Shared building blocks for the fluxo workspace.
//!
//! Holds the static category table, calendar month arithmetic, the shapes
//! produced by the aggregation layer and money formatting helpers. Nothing in
//! here touches the database.

mod categories;
mod money;
mod period;
mod report;

pub use categories::{
    CATEGORIES, Category, CategoryKind, DEFAULT_RECURRING_CATEGORY, FALLBACK_CATEGORY, category,
    categories_for, is_known_category,
};
pub use money::{format_amount, format_f64};
pub use period::{PeriodError, TrendWindow, YearMonth};
pub use report::{AnalysisReport, CategoryShare, MonthBucket, Summary};
