use std::cmp::Ordering;
use std::collections::HashMap;

use common::{CategoryShare, FALLBACK_CATEGORY, category};
use model::ledger::LedgerEntry;
use tracing::{debug, instrument};

/// Ranks expense categories by total spent.
///
/// Income is ignored. Entries without a category, or with a key the table does
/// not know, are grouped under `others`. Percentages are relative to the total
/// expense of the input and are all zero when there is no expense.
#[instrument(skip(entries), fields(num_entries = entries.len()))]
pub fn category_breakdown(entries: &[LedgerEntry]) -> Vec<CategoryShare> {
    let mut totals: HashMap<&'static str, f64> = HashMap::new();

    for entry in entries.iter().filter(|e| e.kind().is_expense()) {
        let key = category(entry.category().unwrap_or(FALLBACK_CATEGORY)).key;
        *totals.entry(key).or_insert(0.0) += entry.amount();
    }

    let total_expense: f64 = totals.values().sum();
    debug!("Grouped expenses into {} categories", totals.len());

    let mut shares: Vec<CategoryShare> = totals
        .into_iter()
        .map(|(key, total)| {
            let meta = category(key);
            CategoryShare {
                key: meta.key.to_string(),
                label: meta.label.to_string(),
                icon: meta.icon.to_string(),
                color: meta.color.to_string(),
                total,
                percent: if total_expense > 0.0 {
                    total / total_expense * 100.0
                } else {
                    0.0
                },
            }
        })
        .collect();

    shares.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.key.cmp(&b.key))
    });
    shares
}
