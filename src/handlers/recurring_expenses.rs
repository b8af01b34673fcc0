use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use common::{DEFAULT_RECURRING_CATEGORY, Summary, YearMonth};
use compute::{ComputeError, summarize};
use model::entities::recurring_expense;
use model::ledger::LedgerEntry;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::handlers::transactions::{
    TransactionResponse, validate_amount, validate_category, validate_name,
};
use crate::extractors::ValidJson;
use crate::helpers::ledger::{GenerationError, generate_month as run_generation, load_month_transactions};
use crate::helpers::periods::resolve_month;
use crate::realtime::{ChangeAction, ChangeEvent, ChangeTopic};
use crate::schemas::{
    ApiError, ApiResponse, AppState, ErrorResponse, api_error, database_error,
};

/// Request body for creating a recurring expense
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateRecurringExpenseRequest {
    #[validate(length(max = 120), custom(function = "validate_name"))]
    pub name: String,
    #[validate(custom(function = "validate_amount"))]
    #[schema(value_type = String, example = "1200.00")]
    pub amount: Decimal,
    /// Defaults to `bills`
    #[validate(custom(function = "validate_category"))]
    pub category: Option<String>,
    /// Day of month the expense is due, 1-31
    #[validate(range(min = 1, max = 31))]
    pub day: i32,
}

/// Request body for editing a recurring expense; absent fields are left untouched
#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateRecurringExpenseRequest {
    #[validate(length(max = 120), custom(function = "validate_name"))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_amount"))]
    #[schema(value_type = Option<String>, example = "1200.00")]
    pub amount: Option<Decimal>,
    #[validate(custom(function = "validate_category"))]
    pub category: Option<String>,
    #[validate(range(min = 1, max = 31))]
    pub day: Option<i32>,
}

/// Recurring expense response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecurringExpenseResponse {
    pub id: i32,
    pub name: String,
    #[schema(value_type = String, example = "1200.00")]
    pub amount: Decimal,
    pub category: String,
    pub day: i32,
    pub created_at: DateTime<Utc>,
}

impl From<recurring_expense::Model> for RecurringExpenseResponse {
    fn from(model: recurring_expense::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            amount: model.amount,
            category: model.category,
            day: model.day,
            created_at: model.created_at,
        }
    }
}

/// Request body for generating a month of transactions
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct GenerateMonthRequest {
    /// Defaults to the current year
    pub year: Option<i32>,
    /// Defaults to the current month
    pub month: Option<u32>,
    /// Must be true; generation writes one transaction per recurring expense
    #[serde(default)]
    pub confirm: bool,
}

/// Outcome of a generation run
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerateMonthResponse {
    /// `YYYY-MM`
    pub period: String,
    pub created_count: usize,
    /// Recurring expenses already generated for this month
    pub skipped_count: usize,
    pub transactions: Vec<TransactionResponse>,
    /// Totals of the whole month after generation
    pub summary: Summary,
}

fn not_found(recurring_expense_id: i32) -> ApiError {
    api_error(
        StatusCode::NOT_FOUND,
        format!("Recurring expense with ID {} not found", recurring_expense_id),
        "RECURRING_EXPENSE_NOT_FOUND",
    )
}

async fn find_owned(
    state: &AppState,
    user_id: i32,
    recurring_expense_id: i32,
) -> Result<recurring_expense::Model, ApiError> {
    recurring_expense::Entity::find_by_id(recurring_expense_id)
        .filter(recurring_expense::Column::UserId.eq(user_id))
        .one(&state.db)
        .await
        .map_err(|e| database_error("Failed to retrieve recurring expense", e))?
        .ok_or_else(|| {
            warn!("Recurring expense {} not found for user {}", recurring_expense_id, user_id);
            not_found(recurring_expense_id)
        })
}

/// Create a recurring expense
#[utoipa::path(
    post,
    path = "/api/v1/recurring-expenses",
    tag = "recurring-expenses",
    security(("bearer_auth" = [])),
    request_body = CreateRecurringExpenseRequest,
    responses(
        (status = 201, description = "Recurring expense created successfully", body = ApiResponse<RecurringExpenseResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_recurring_expense(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidJson(request): ValidJson<CreateRecurringExpenseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RecurringExpenseResponse>>), ApiError> {

    let model = recurring_expense::ActiveModel {
        user_id: Set(user.user_id),
        name: Set(request.name.trim().to_string()),
        amount: Set(request.amount),
        category: Set(request
            .category
            .unwrap_or_else(|| DEFAULT_RECURRING_CATEGORY.to_string())),
        day: Set(request.day),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| database_error("Failed to create recurring expense", e))?;

    info!("Recurring expense {} created for user {}", model.id, user.user_id);
    state
        .notify(ChangeEvent::new(
            user.user_id,
            ChangeTopic::RecurringExpenses,
            ChangeAction::Insert,
            Some(model.id),
        ))
        .await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            RecurringExpenseResponse::from(model),
            "Recurring expense created successfully",
        )),
    ))
}

/// List recurring expenses, earliest due day first
#[utoipa::path(
    get,
    path = "/api/v1/recurring-expenses",
    tag = "recurring-expenses",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Recurring expenses retrieved successfully", body = ApiResponse<Vec<RecurringExpenseResponse>>),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_recurring_expenses(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<(StatusCode, Json<ApiResponse<Vec<RecurringExpenseResponse>>>), ApiError> {
    let models = recurring_expense::Entity::find()
        .filter(recurring_expense::Column::UserId.eq(user.user_id))
        .order_by_asc(recurring_expense::Column::Day)
        .order_by_asc(recurring_expense::Column::Id)
        .all(&state.db)
        .await
        .map_err(|e| database_error("Failed to retrieve recurring expenses", e))?;

    debug!("Retrieved {} recurring expenses", models.len());
    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            models.into_iter().map(RecurringExpenseResponse::from).collect(),
            "Recurring expenses retrieved successfully",
        )),
    ))
}

/// Get a recurring expense by ID
#[utoipa::path(
    get,
    path = "/api/v1/recurring-expenses/{recurring_expense_id}",
    tag = "recurring-expenses",
    security(("bearer_auth" = [])),
    params(
        ("recurring_expense_id" = i32, Path, description = "Recurring expense ID"),
    ),
    responses(
        (status = 200, description = "Recurring expense retrieved successfully", body = ApiResponse<RecurringExpenseResponse>),
        (status = 404, description = "Recurring expense not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_recurring_expense(
    Path(recurring_expense_id): Path<i32>,
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<(StatusCode, Json<ApiResponse<RecurringExpenseResponse>>), ApiError> {
    let model = find_owned(&state, user.user_id, recurring_expense_id).await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            RecurringExpenseResponse::from(model),
            "Recurring expense retrieved successfully",
        )),
    ))
}

/// Edit a recurring expense. Transactions generated earlier are not touched.
#[utoipa::path(
    put,
    path = "/api/v1/recurring-expenses/{recurring_expense_id}",
    tag = "recurring-expenses",
    security(("bearer_auth" = [])),
    params(
        ("recurring_expense_id" = i32, Path, description = "Recurring expense ID"),
    ),
    request_body = UpdateRecurringExpenseRequest,
    responses(
        (status = 200, description = "Recurring expense updated successfully", body = ApiResponse<RecurringExpenseResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Recurring expense not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_recurring_expense(
    Path(recurring_expense_id): Path<i32>,
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidJson(request): ValidJson<UpdateRecurringExpenseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RecurringExpenseResponse>>), ApiError> {
    let model = find_owned(&state, user.user_id, recurring_expense_id).await?;

    let mut active = model.into_active_model();
    if let Some(name) = request.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(amount) = request.amount {
        active.amount = Set(amount);
    }
    if let Some(category) = request.category {
        active.category = Set(category);
    }
    if let Some(day) = request.day {
        active.day = Set(day);
    }

    let updated = active
        .update(&state.db)
        .await
        .map_err(|e| database_error("Failed to update recurring expense", e))?;

    info!("Recurring expense {} updated", updated.id);
    state
        .notify(ChangeEvent::new(
            user.user_id,
            ChangeTopic::RecurringExpenses,
            ChangeAction::Update,
            Some(updated.id),
        ))
        .await;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            RecurringExpenseResponse::from(updated),
            "Recurring expense updated successfully",
        )),
    ))
}

/// Delete a recurring expense. Transactions generated earlier are kept.
#[utoipa::path(
    delete,
    path = "/api/v1/recurring-expenses/{recurring_expense_id}",
    tag = "recurring-expenses",
    security(("bearer_auth" = [])),
    params(
        ("recurring_expense_id" = i32, Path, description = "Recurring expense ID"),
    ),
    responses(
        (status = 200, description = "Recurring expense deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Recurring expense not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_recurring_expense(
    Path(recurring_expense_id): Path<i32>,
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<(StatusCode, Json<ApiResponse<String>>), ApiError> {
    let result = recurring_expense::Entity::delete_many()
        .filter(recurring_expense::Column::Id.eq(recurring_expense_id))
        .filter(recurring_expense::Column::UserId.eq(user.user_id))
        .exec(&state.db)
        .await
        .map_err(|e| database_error("Failed to delete recurring expense", e))?;

    if result.rows_affected == 0 {
        warn!("Recurring expense {} not found for deletion", recurring_expense_id);
        return Err(not_found(recurring_expense_id));
    }

    info!("Recurring expense {} deleted", recurring_expense_id);
    state
        .notify(ChangeEvent::new(
            user.user_id,
            ChangeTopic::RecurringExpenses,
            ChangeAction::Delete,
            Some(recurring_expense_id),
        ))
        .await;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            format!("Recurring expense {} deleted", recurring_expense_id),
            "Recurring expense deleted successfully",
        )),
    ))
}

/// Generate the month's transactions from every recurring expense
#[utoipa::path(
    post,
    path = "/api/v1/recurring-expenses/generate",
    tag = "recurring-expenses",
    security(("bearer_auth" = [])),
    request_body = GenerateMonthRequest,
    responses(
        (status = 201, description = "Transactions generated", body = ApiResponse<GenerateMonthResponse>),
        (status = 200, description = "Month was already generated, nothing created", body = ApiResponse<GenerateMonthResponse>),
        (status = 400, description = "Not confirmed, invalid month or no recurring expenses", body = ErrorResponse),
        (status = 422, description = "A recurring expense has an invalid day", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn generate_month(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidJson(request): ValidJson<GenerateMonthRequest>,
) -> Result<(StatusCode, Json<ApiResponse<GenerateMonthResponse>>), ApiError> {
    if !request.confirm {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Generating a month must be confirmed with \"confirm\": true",
            "CONFIRMATION_REQUIRED",
        ));
    }

    let month = resolve_month(request.year, request.month, YearMonth::current())
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string(), "INVALID_PERIOD"))?;

    let outcome = run_generation(&state.db, &state.materializer(), user.user_id, month)
        .await
        .map_err(|e| match e {
            GenerationError::Compute(ComputeError::NoTemplates) => api_error(
                StatusCode::BAD_REQUEST,
                "There are no recurring expenses to generate",
                "NO_TEMPLATES",
            ),
            GenerationError::Compute(err @ ComputeError::InvalidDay { .. }) => {
                api_error(StatusCode::UNPROCESSABLE_ENTITY, err.to_string(), "INVALID_TEMPLATE")
            }
            GenerationError::Compute(err) => {
                error!("Month generation failed: {}", err);
                api_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to generate month",
                    "GENERATION_ERROR",
                )
            }
            GenerationError::Database(err) => database_error("Failed to generate month", err),
        })?;

    if !outcome.created.is_empty() {
        state
            .notify(ChangeEvent::new(
                user.user_id,
                ChangeTopic::Transactions,
                ChangeAction::Insert,
                None,
            ))
            .await;
    }

    let month_rows = load_month_transactions(&state.db, user.user_id, month)
        .await
        .map_err(|e| database_error("Failed to load month transactions", e))?;
    let entries: Vec<LedgerEntry> = month_rows.iter().map(LedgerEntry::from).collect();

    let status = if outcome.created.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    let message = format!(
        "Generated {} transactions for {} ({} already present)",
        outcome.created.len(),
        month,
        outcome.skipped
    );

    Ok((
        status,
        Json(ApiResponse::new(
            GenerateMonthResponse {
                period: month.to_string(),
                created_count: outcome.created.len(),
                skipped_count: outcome.skipped,
                transactions: outcome
                    .created
                    .into_iter()
                    .map(TransactionResponse::from)
                    .collect(),
                summary: summarize(&entries),
            },
            message,
        )),
    ))
}
