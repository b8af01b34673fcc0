use anyhow::Result;
use common::{YearMonth, format_f64};
use compute::{category_breakdown, summarize};
use model::ledger::LedgerEntry;
use tracing::trace;

use super::connect_for_user;
use crate::config::Settings;
use crate::helpers::ledger::load_month_transactions;
use crate::helpers::periods::resolve_month;

pub async fn print_summary(
    settings: Settings,
    email: &str,
    year: Option<i32>,
    month: Option<u32>,
) -> Result<()> {
    trace!("Entering summary command");
    let month = resolve_month(year, month, YearMonth::current())?;
    let (db, user) = connect_for_user(&settings.database_url, email).await?;

    let rows = load_month_transactions(&db, user.id, month).await?;
    let entries: Vec<LedgerEntry> = rows.iter().map(LedgerEntry::from).collect();
    let summary = summarize(&entries);
    let money = |value: f64| format_f64(value, &settings.currency);

    println!("Summary for {} ({})", user.email, month);
    println!("  Income:    {}", money(summary.income));
    println!("  Expense:   {}", money(summary.expense));
    println!("    fixed:    {}", money(summary.fixed));
    println!("    variable: {}", money(summary.variable));
    println!("  Balance:   {}", money(summary.balance));
    println!(
        "  Pending:   {} in {} transactions",
        money(summary.pending),
        summary.pending_count
    );

    let categories = category_breakdown(&entries);
    if !categories.is_empty() {
        println!("  By category:");
        for share in categories {
            println!("    {:<14} {:>14} {:>6.1}%", share.label, money(share.total), share.percent);
        }
    }

    Ok(())
}
