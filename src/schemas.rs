use std::sync::Arc;

use axum::{http::StatusCode, response::Json};
use common::{AnalysisReport, CategoryKind, CategoryShare, MonthBucket, Summary, TrendWindow, YearMonth};
use compute::MonthMaterializer;
use model::entities::transaction::TransactionKind;
use moka::future::Cache;
use sea_orm::{DatabaseConnection, DbErr};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use utoipa::{
    Modify, OpenApi, ToSchema,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use validator::ValidationErrors;

use crate::config::Settings;
use crate::realtime::{ChangeEvent, ChangeHub};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Cache for expensive operations
    pub cache: Cache<String, CachedData>,
    /// Per-user change feed
    pub changes: ChangeHub,
    pub settings: Arc<Settings>,
}

/// Cached data types
#[derive(Clone, Debug)]
pub enum CachedData {
    Analysis(AnalysisReport),
}

impl AppState {
    pub fn materializer(&self) -> MonthMaterializer {
        MonthMaterializer::new(self.settings.day_overflow)
    }

    /// Key of an analysis computed from the user's rows as of `revision`.
    pub fn analysis_cache_key(
        user_id: i32,
        window: TrendWindow,
        reference: YearMonth,
        revision: u64,
    ) -> String {
        format!("analysis:{}:{}:{}:{}", user_id, window.months(), reference, revision)
    }

    /// Key for the user's current data revision.
    ///
    /// Must be taken before the rows are loaded. A report computed while a
    /// change lands is then filed under the older revision and never served.
    pub fn current_analysis_key(&self, user_id: i32, window: TrendWindow, reference: YearMonth) -> String {
        Self::analysis_cache_key(user_id, window, reference, self.changes.revision(user_id))
    }

    /// Moves the user to a new data revision, drops the reports of the old
    /// one and tells its subscribers to re-fetch.
    pub async fn notify(&self, event: ChangeEvent) {
        let user_id = event.user_id;
        let previous = self.changes.revision(user_id);
        let receivers = self.changes.publish(event);
        debug!(receivers, "Change event delivered");

        let reference = YearMonth::current();
        for window in [TrendWindow::Quarter, TrendWindow::HalfYear, TrendWindow::Year] {
            self.cache
                .invalidate(&Self::analysis_cache_key(user_id, window, reference, previous))
                .await;
        }
    }
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            success: true,
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, error: impl Into<String>, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.to_string(),
            success: false,
        }),
    )
}

/// Logs the database failure and hides its details from the client.
pub fn database_error(context: &str, err: DbErr) -> ApiError {
    error!("{}: {}", context, err);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, context, "DATABASE_ERROR")
}

pub fn validation_error(errors: ValidationErrors) -> ApiError {
    warn!("Request validation failed: {}", errors);
    api_error(StatusCode::BAD_REQUEST, errors.to_string(), "VALIDATION_ERROR")
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::sign_up,
        crate::handlers::auth::sign_in,
        crate::handlers::auth::sign_out,
        crate::handlers::auth::get_session,
        crate::handlers::auth::update_password,
        crate::handlers::transactions::create_transaction,
        crate::handlers::transactions::get_transactions,
        crate::handlers::transactions::get_transaction,
        crate::handlers::transactions::update_transaction,
        crate::handlers::transactions::delete_transaction,
        crate::handlers::recurring_expenses::create_recurring_expense,
        crate::handlers::recurring_expenses::get_recurring_expenses,
        crate::handlers::recurring_expenses::get_recurring_expense,
        crate::handlers::recurring_expenses::update_recurring_expense,
        crate::handlers::recurring_expenses::delete_recurring_expense,
        crate::handlers::recurring_expenses::generate_month,
        crate::handlers::summary::get_monthly_summary,
        crate::handlers::analysis::get_analysis,
        crate::handlers::categories::get_categories,
        crate::handlers::realtime::subscribe_changes,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            TransactionKind,
            CategoryKind,
            Summary,
            CategoryShare,
            MonthBucket,
            AnalysisReport,
            crate::realtime::ChangeEvent,
            crate::realtime::ChangeTopic,
            crate::realtime::ChangeAction,
            crate::handlers::auth::SignUpRequest,
            crate::handlers::auth::SignInRequest,
            crate::handlers::auth::UpdatePasswordRequest,
            crate::handlers::auth::UserResponse,
            crate::handlers::auth::SessionResponse,
            crate::handlers::transactions::CreateTransactionRequest,
            crate::handlers::transactions::UpdateTransactionRequest,
            crate::handlers::transactions::TransactionResponse,
            crate::handlers::transactions::TransactionFilter,
            crate::handlers::transactions::SortOrder,
            crate::handlers::recurring_expenses::CreateRecurringExpenseRequest,
            crate::handlers::recurring_expenses::UpdateRecurringExpenseRequest,
            crate::handlers::recurring_expenses::RecurringExpenseResponse,
            crate::handlers::recurring_expenses::GenerateMonthRequest,
            crate::handlers::recurring_expenses::GenerateMonthResponse,
            crate::handlers::summary::MonthlySummaryResponse,
            crate::handlers::categories::CategoryResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Sign-up, sign-in and session management"),
        (name = "transactions", description = "Income and expense entries"),
        (name = "recurring-expenses", description = "Monthly expense templates and month generation"),
        (name = "reports", description = "Monthly summary and multi-month analysis"),
        (name = "categories", description = "Static category table"),
        (name = "realtime", description = "Server-sent change feed"),
    ),
    info(
        title = "Fluxo API",
        description = "Personal finance tracker API - transactions, recurring expenses and spending analysis",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
