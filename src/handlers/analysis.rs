use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use common::{AnalysisReport, TrendWindow, YearMonth};
use compute::analyze;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use utoipa::IntoParams;
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::extractors::ValidQuery;
use crate::helpers::ledger::load_ledger;
use crate::schemas::{
    ApiError, ApiResponse, AppState, CachedData, ErrorResponse, api_error, database_error,
};

/// Query parameters for the analysis view
#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnalysisQuery {
    /// Trailing window in months: 3, 6 (default) or 12
    pub months: Option<u32>,
}

/// Spending trend, category ranking and savings KPIs
#[utoipa::path(
    get,
    path = "/api/v1/analysis",
    tag = "reports",
    security(("bearer_auth" = [])),
    params(AnalysisQuery),
    responses(
        (status = 200, description = "Analysis computed", body = ApiResponse<AnalysisReport>),
        (status = 400, description = "Unsupported window", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_analysis(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidQuery(query): ValidQuery<AnalysisQuery>,
) -> Result<(StatusCode, Json<ApiResponse<AnalysisReport>>), ApiError> {
    let window = match query.months {
        Some(months) => TrendWindow::try_from(months)
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string(), "INVALID_PERIOD"))?,
        None => TrendWindow::default(),
    };
    let reference = YearMonth::current();
    let cache_key = state.current_analysis_key(user.user_id, window, reference);

    if let Some(CachedData::Analysis(report)) = state.cache.get(&cache_key).await {
        debug!("Serving analysis from cache");
        return Ok((
            StatusCode::OK,
            Json(ApiResponse::new(report, "Analysis retrieved successfully")),
        ));
    }

    let entries = load_ledger(&state.db, user.user_id)
        .await
        .map_err(|e| database_error("Failed to load transactions", e))?;

    let report = analyze(&entries, window, reference);
    info!(
        "Computed {}-month analysis over {} transactions",
        window.months(),
        entries.len()
    );

    state
        .cache
        .insert(cache_key, CachedData::Analysis(report.clone()))
        .await;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(report, "Analysis retrieved successfully")),
    ))
}
