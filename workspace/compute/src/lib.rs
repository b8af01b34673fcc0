//! Pure computations behind fluxo: turning recurring expense templates into
//! a month of transactions, and reducing transactions into the totals the
//! clients display. Nothing in this crate performs I/O.

pub mod aggregate;
pub mod categories;
pub mod error;
pub mod materialize;

pub use aggregate::{analyze, average_savings_rate, monthly_trend, summarize, summarize_month};
pub use categories::category_breakdown;
pub use error::{ComputeError, Result};
pub use materialize::{DayOverflow, MaterializedTransaction, MonthMaterializer, exclude_generated};
