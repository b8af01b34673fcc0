use anyhow::Result;
use common::{YearMonth, format_amount};
use compute::MonthMaterializer;
use tracing::{info, trace};

use super::connect_for_user;
use crate::config::Settings;
use crate::helpers::ledger;
use crate::helpers::periods::resolve_month;

pub async fn generate_month(
    settings: Settings,
    email: &str,
    year: Option<i32>,
    month: Option<u32>,
) -> Result<()> {
    trace!("Entering generate_month command");
    let month = resolve_month(year, month, YearMonth::current())?;
    let (db, user) = connect_for_user(&settings.database_url, email).await?;

    let materializer = MonthMaterializer::new(settings.day_overflow);
    info!("Generating {} for user {} ({} overflow)", month, user.id, materializer.overflow());

    let outcome = ledger::generate_month(&db, &materializer, user.id, month).await?;

    println!(
        "{}: created {} transactions, skipped {} already generated",
        outcome.month,
        outcome.created.len(),
        outcome.skipped
    );
    for row in &outcome.created {
        println!(
            "  {}  {:<30} {}",
            row.created_at.format("%Y-%m-%d"),
            row.name,
            format_amount(row.amount, &settings.currency)
        );
    }

    Ok(())
}
