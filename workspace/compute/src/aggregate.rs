//! Reductions over ledger entries: monthly summaries, trailing trends and the
//! analysis report. Everything here is a pure function of its input.

use common::{AnalysisReport, MonthBucket, Summary, TrendWindow, YearMonth};
use model::ledger::{LedgerEntry, TransactionKind};
use tracing::{debug, instrument};

use crate::categories::category_breakdown;

/// Totals over `entries`; expense is every type other than income.
pub fn summarize<'a, I>(entries: I) -> Summary
where
    I: IntoIterator<Item = &'a LedgerEntry>,
{
    let mut summary = Summary::default();

    for entry in entries {
        let amount = entry.amount();
        summary.transaction_count += 1;
        match entry.kind() {
            TransactionKind::Income => summary.income += amount,
            TransactionKind::Fixed => {
                summary.expense += amount;
                summary.fixed += amount;
            }
            TransactionKind::Variable => {
                summary.expense += amount;
                summary.variable += amount;
            }
        }
        if entry.kind().is_expense() && !entry.is_paid() {
            summary.pending += amount;
            summary.pending_count += 1;
        }
    }

    summary.balance = summary.income - summary.expense;
    summary
}

/// Summary restricted to entries dated inside `month`.
pub fn summarize_month(entries: &[LedgerEntry], month: YearMonth) -> Summary {
    summarize(entries.iter().filter(|e| month.contains(e.occurred_at())))
}

/// One bucket per month of the window ending at `reference`, oldest first.
/// Entries outside the window are ignored; empty months stay at zero.
#[instrument(skip(entries), fields(num_entries = entries.len(), months = window.months(), reference = %reference))]
pub fn monthly_trend(
    entries: &[LedgerEntry],
    window: TrendWindow,
    reference: YearMonth,
) -> Vec<MonthBucket> {
    let mut buckets: Vec<MonthBucket> = reference
        .trailing(window.months())
        .into_iter()
        .map(|period| MonthBucket {
            period,
            label: period.short_label(),
            income: 0.0,
            expense: 0.0,
            balance: 0.0,
        })
        .collect();

    for entry in entries {
        let period = YearMonth::containing(entry.occurred_at());
        let Some(bucket) = buckets.iter_mut().find(|b| b.period == period) else {
            continue;
        };
        if entry.kind().is_income() {
            bucket.income += entry.amount();
        } else {
            bucket.expense += entry.amount();
        }
    }

    for bucket in &mut buckets {
        bucket.balance = bucket.income - bucket.expense;
    }

    debug!("Built {} monthly buckets", buckets.len());
    buckets
}

/// Mean of `(income - expense) / income` over buckets with income, in
/// percent. Zero when no month had income.
pub fn average_savings_rate(buckets: &[MonthBucket]) -> f64 {
    let rates: Vec<f64> = buckets
        .iter()
        .filter(|b| b.income > 0.0)
        .map(|b| (b.income - b.expense) / b.income)
        .collect();

    if rates.is_empty() {
        0.0
    } else {
        rates.iter().sum::<f64>() / rates.len() as f64 * 100.0
    }
}

/// Builds the full analysis view.
///
/// The trend and savings rate only look at the window, while the category
/// ranking and the total saved cover every entry passed in.
#[instrument(skip(entries), fields(num_entries = entries.len(), months = window.months()))]
pub fn analyze(entries: &[LedgerEntry], window: TrendWindow, reference: YearMonth) -> AnalysisReport {
    let trend = monthly_trend(entries, window, reference);
    let categories = category_breakdown(entries);
    let totals = summarize(entries);

    AnalysisReport {
        months: window.months(),
        average_savings_rate: average_savings_rate(&trend),
        trend,
        categories,
        total_expense: totals.expense,
        total_saved: totals.balance,
    }
}
