use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use common::{Summary, YearMonth};
use compute::summarize;
use model::ledger::LedgerEntry;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::extractors::ValidQuery;
use crate::handlers::transactions::TransactionResponse;
use crate::helpers::ledger::load_month_transactions;
use crate::helpers::periods::resolve_month;
use crate::schemas::{ApiError, ApiResponse, AppState, ErrorResponse, api_error, database_error};

/// How many of the latest transactions the summary carries.
const RECENT_TRANSACTIONS: usize = 3;

/// Query parameters for the monthly summary
#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SummaryQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
    /// Defaults to the current month
    #[validate(range(min = 1, max = 12))]
    pub month: Option<u32>,
}

/// Monthly overview shown on the home screen
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MonthlySummaryResponse {
    /// `YYYY-MM`
    pub period: String,
    pub label: String,
    pub summary: Summary,
    /// Latest transactions of the month, newest first
    pub recent: Vec<TransactionResponse>,
}

/// Totals of one month plus its most recent transactions
#[utoipa::path(
    get,
    path = "/api/v1/summary",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(SummaryQuery),
    responses(
        (status = 200, description = "Summary computed", body = ApiResponse<MonthlySummaryResponse>),
        (status = 400, description = "Invalid month", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_monthly_summary(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidQuery(query): ValidQuery<SummaryQuery>,
) -> Result<(StatusCode, Json<ApiResponse<MonthlySummaryResponse>>), ApiError> {
    let month = resolve_month(query.year, query.month, YearMonth::current())
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string(), "INVALID_PERIOD"))?;

    let rows = load_month_transactions(&state.db, user.user_id, month)
        .await
        .map_err(|e| database_error("Failed to load month transactions", e))?;
    debug!("Summarizing {} transactions of {}", rows.len(), month);

    let entries: Vec<LedgerEntry> = rows.iter().map(LedgerEntry::from).collect();
    let summary = summarize(&entries);
    let recent = rows
        .into_iter()
        .take(RECENT_TRANSACTIONS)
        .map(TransactionResponse::from)
        .collect();

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            MonthlySummaryResponse {
                period: month.to_string(),
                label: month.short_label(),
                summary,
                recent,
            },
            "Summary retrieved successfully",
        )),
    ))
}
