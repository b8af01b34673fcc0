use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use rusty_money::{Money, iso};
use tracing::warn;

/// Formats an amount in the given ISO 4217 currency, e.g. `R$1.239,90`.
pub fn format_amount(amount: Decimal, currency_code: &str) -> String {
    // Whole amounts keep their cents
    let mut amount = amount.round_dp(2);
    amount.rescale(2);

    match iso::find(currency_code) {
        Some(currency) => Money::from_decimal(amount, currency).to_string(),
        None => {
            warn!(currency_code, "Unknown currency code, formatting without symbol");
            format!("{} {}", currency_code, amount)
        }
    }
}

/// Same as [`format_amount`] for aggregated floating point totals.
pub fn format_f64(amount: f64, currency_code: &str) -> String {
    let amount = Decimal::from_f64(amount).unwrap_or_default();
    format_amount(amount, currency_code)
}
