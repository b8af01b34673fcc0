//! Projection of recurring expense templates onto a concrete month.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use common::YearMonth;
use model::ledger::{RecurringTemplate, TransactionKind};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{ComputeError, Result};

/// Hour of day (UTC) every generated transaction is pinned to.
pub const BILLING_HOUR: u32 = 12;

/// What happens to a template day that does not exist in the target month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOverflow {
    /// Use the last day of the month (31 in April becomes April 30).
    #[default]
    Clamp,
    /// Carry the excess into the next month (31 in April becomes May 1).
    Rollover,
}

impl fmt::Display for DayOverflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayOverflow::Clamp => write!(f, "clamp"),
            DayOverflow::Rollover => write!(f, "rollover"),
        }
    }
}

impl FromStr for DayOverflow {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clamp" => Ok(DayOverflow::Clamp),
            "rollover" => Ok(DayOverflow::Rollover),
            other => Err(format!("unknown day overflow policy '{other}'")),
        }
    }
}

/// A transaction ready to be inserted, derived from one template.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedTransaction {
    pub recurring_expense_id: i32,
    pub name: String,
    pub amount: Decimal,
    pub category: String,
    pub kind: TransactionKind,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub billing_period: YearMonth,
}

/// Builds the transactions of a month from the user's templates.
///
/// Generated rows are always `variable` and unpaid; the user marks them paid
/// as the bills are settled.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonthMaterializer {
    overflow: DayOverflow,
}

impl MonthMaterializer {
    pub fn new(overflow: DayOverflow) -> Self {
        Self { overflow }
    }

    pub fn overflow(&self) -> DayOverflow {
        self.overflow
    }

    /// Resolves a template day inside `month` according to the overflow policy.
    pub fn due_date(&self, month: YearMonth, day: u32) -> Option<NaiveDate> {
        if !(1..=31).contains(&day) {
            return None;
        }
        match self.overflow {
            DayOverflow::Clamp => month.clamped_day(day),
            DayOverflow::Rollover => month.rolled_day(day),
        }
    }

    /// One transaction per template, in template order.
    #[instrument(skip(self, templates), fields(templates = templates.len(), month = %month, overflow = %self.overflow))]
    pub fn materialize(
        &self,
        templates: &[RecurringTemplate],
        month: YearMonth,
    ) -> Result<Vec<MaterializedTransaction>> {
        if templates.is_empty() {
            warn!("Nothing to materialize for {}", month);
            return Err(ComputeError::NoTemplates);
        }

        let noon = NaiveTime::from_hms_opt(BILLING_HOUR, 0, 0)
            .ok_or_else(|| ComputeError::Date(format!("invalid billing hour {BILLING_HOUR}")))?;

        let materialized = templates
            .iter()
            .map(|template| {
                let date = self
                    .due_date(month, template.day)
                    .ok_or(ComputeError::InvalidDay {
                        template_id: template.id,
                        day: template.day,
                    })?;
                debug!(template_id = template.id, %date, "Materializing recurring expense");
                Ok(MaterializedTransaction {
                    recurring_expense_id: template.id,
                    name: template.name.clone(),
                    amount: template.amount,
                    category: template.category.clone(),
                    kind: TransactionKind::Variable,
                    is_paid: false,
                    created_at: date.and_time(noon).and_utc(),
                    billing_period: month,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!("Materialized {} transactions for {}", materialized.len(), month);
        Ok(materialized)
    }
}

/// Splits candidates into those still missing and the number already present,
/// given the template ids that have a row for the month.
pub fn exclude_generated(
    candidates: Vec<MaterializedTransaction>,
    already_generated: &HashSet<i32>,
) -> (Vec<MaterializedTransaction>, usize) {
    let total = candidates.len();
    let missing: Vec<_> = candidates
        .into_iter()
        .filter(|c| !already_generated.contains(&c.recurring_expense_id))
        .collect();
    let skipped = total - missing.len();
    (missing, skipped)
}
