use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use common::is_known_category;
use model::entities::transaction::{self, TransactionKind};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, Select, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::auth::AuthenticatedUser;
use crate::extractors::{ValidJson, ValidQuery};
use crate::helpers::periods::{end_of_day, start_of_day};
use crate::realtime::{ChangeAction, ChangeEvent, ChangeTopic};
use crate::schemas::{
    ApiError, ApiResponse, AppState, ErrorResponse, api_error, database_error,
};

pub(crate) fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("blank_name"));
    }
    Ok(())
}

pub(crate) fn validate_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount < Decimal::ZERO {
        return Err(ValidationError::new("negative_amount"));
    }
    Ok(())
}

pub(crate) fn validate_category(key: &str) -> Result<(), ValidationError> {
    if is_known_category(key) {
        Ok(())
    } else {
        Err(ValidationError::new("unknown_category"))
    }
}

/// Request body for recording a transaction
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateTransactionRequest {
    #[validate(length(max = 120), custom(function = "validate_name"))]
    pub name: String,
    /// Non-negative magnitude; direction comes from `kind`
    #[validate(custom(function = "validate_amount"))]
    #[schema(value_type = String, example = "39.90")]
    pub amount: Decimal,
    /// Defaults to `variable`
    pub kind: Option<TransactionKind>,
    /// Key from `/api/v1/categories`
    #[validate(custom(function = "validate_category"))]
    pub category: Option<String>,
    /// Defaults to true
    pub is_paid: Option<bool>,
    /// Effective date, defaults to now
    pub created_at: Option<DateTime<Utc>>,
}

/// Request body for editing a transaction; absent fields are left untouched
#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateTransactionRequest {
    #[validate(length(max = 120), custom(function = "validate_name"))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_amount"))]
    #[schema(value_type = Option<String>, example = "39.90")]
    pub amount: Option<Decimal>,
    pub kind: Option<TransactionKind>,
    #[validate(custom(function = "validate_category"))]
    pub category: Option<String>,
    pub is_paid: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Transaction response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub id: i32,
    pub name: String,
    #[schema(value_type = String, example = "39.90")]
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub category: Option<String>,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    /// Template this row was generated from, if any
    pub recurring_expense_id: Option<i32>,
    /// Month (`YYYY-MM`) of the generation run that created it
    pub billing_period: Option<String>,
}

impl From<transaction::Model> for TransactionResponse {
    fn from(model: transaction::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            amount: model.amount,
            kind: model.kind,
            category: model.category,
            is_paid: model.is_paid,
            created_at: model.created_at,
            recurring_expense_id: model.recurring_expense_id,
            billing_period: model.billing_period,
        }
    }
}

/// Which transactions a listing includes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionFilter {
    #[default]
    All,
    Income,
    /// Fixed and variable
    Expense,
    Fixed,
    Variable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Query parameters for listing transactions
#[derive(Debug, Default, Serialize, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransactionQuery {
    pub filter: Option<TransactionFilter>,
    /// First day to include (YYYY-MM-DD)
    pub start: Option<NaiveDate>,
    /// Last day to include (YYYY-MM-DD)
    pub end: Option<NaiveDate>,
    /// Newest first unless `asc`
    pub order: Option<SortOrder>,
    /// 1-based page number
    #[validate(range(min = 1))]
    pub page: Option<u64>,
    /// Page size, default 100
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<u64>,
}

const DEFAULT_PAGE_SIZE: u64 = 100;

fn apply_filter(select: Select<transaction::Entity>, filter: TransactionFilter) -> Select<transaction::Entity> {
    match filter {
        TransactionFilter::All => select,
        TransactionFilter::Income => select.filter(transaction::Column::Kind.eq(TransactionKind::Income)),
        TransactionFilter::Expense => select.filter(transaction::Column::Kind.ne(TransactionKind::Income)),
        TransactionFilter::Fixed => select.filter(transaction::Column::Kind.eq(TransactionKind::Fixed)),
        TransactionFilter::Variable => {
            select.filter(transaction::Column::Kind.eq(TransactionKind::Variable))
        }
    }
}

fn not_found(transaction_id: i32) -> ApiError {
    api_error(
        StatusCode::NOT_FOUND,
        format!("Transaction with ID {} not found", transaction_id),
        "TRANSACTION_NOT_FOUND",
    )
}

/// Loads a transaction of the user; other users' rows are reported as missing.
async fn find_owned(
    state: &AppState,
    user_id: i32,
    transaction_id: i32,
) -> Result<transaction::Model, ApiError> {
    transaction::Entity::find_by_id(transaction_id)
        .filter(transaction::Column::UserId.eq(user_id))
        .one(&state.db)
        .await
        .map_err(|e| database_error("Failed to retrieve transaction", e))?
        .ok_or_else(|| {
            warn!("Transaction {} not found for user {}", transaction_id, user_id);
            not_found(transaction_id)
        })
}

/// Create a new transaction
#[utoipa::path(
    post,
    path = "/api/v1/transactions",
    tag = "transactions",
    security(("bearer_auth" = [])),
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Transaction created successfully", body = ApiResponse<TransactionResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_transaction(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidJson(request): ValidJson<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TransactionResponse>>), ApiError> {

    let new_transaction = transaction::ActiveModel {
        user_id: Set(user.user_id),
        name: Set(request.name.trim().to_string()),
        amount: Set(request.amount),
        kind: Set(request.kind.unwrap_or(TransactionKind::Variable)),
        category: Set(request.category),
        is_paid: Set(request.is_paid.unwrap_or(true)),
        created_at: Set(request.created_at.unwrap_or_else(Utc::now)),
        recurring_expense_id: Set(None),
        billing_period: Set(None),
        ..Default::default()
    };

    let model = new_transaction
        .insert(&state.db)
        .await
        .map_err(|e| database_error("Failed to create transaction", e))?;

    info!("Transaction {} created for user {}", model.id, user.user_id);
    state
        .notify(ChangeEvent::new(
            user.user_id,
            ChangeTopic::Transactions,
            ChangeAction::Insert,
            Some(model.id),
        ))
        .await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            TransactionResponse::from(model),
            "Transaction created successfully",
        )),
    ))
}

/// List transactions of the signed-in user
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(TransactionQuery),
    responses(
        (status = 200, description = "Transactions retrieved successfully", body = ApiResponse<Vec<TransactionResponse>>),
        (status = 400, description = "Invalid query", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_transactions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidQuery(query): ValidQuery<TransactionQuery>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<TransactionResponse>>>), ApiError> {
    if let (Some(start), Some(end)) = (query.start, query.end) {
        if start > end {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "start must not be after end",
                "INVALID_PERIOD",
            ));
        }
    }

    let mut select = transaction::Entity::find().filter(transaction::Column::UserId.eq(user.user_id));
    select = apply_filter(select, query.filter.unwrap_or_default());

    if let Some(start) = query.start {
        select = select.filter(transaction::Column::CreatedAt.gte(start_of_day(start)));
    }
    if let Some(end) = query.end {
        select = select.filter(transaction::Column::CreatedAt.lt(end_of_day(end)));
    }

    select = match query.order.unwrap_or_default() {
        SortOrder::Desc => select
            .order_by_desc(transaction::Column::CreatedAt)
            .order_by_desc(transaction::Column::Id),
        SortOrder::Asc => select
            .order_by_asc(transaction::Column::CreatedAt)
            .order_by_asc(transaction::Column::Id),
    };

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let page = query.page.unwrap_or(1);
    debug!("Listing transactions page {} (limit {})", page, limit);

    let transactions = select
        .paginate(&state.db, limit)
        .fetch_page(page - 1)
        .await
        .map_err(|e| database_error("Failed to retrieve transactions", e))?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            transactions.into_iter().map(TransactionResponse::from).collect(),
            "Transactions retrieved successfully",
        )),
    ))
}

/// Get a transaction by ID
#[utoipa::path(
    get,
    path = "/api/v1/transactions/{transaction_id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(
        ("transaction_id" = i32, Path, description = "Transaction ID"),
    ),
    responses(
        (status = 200, description = "Transaction retrieved successfully", body = ApiResponse<TransactionResponse>),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_transaction(
    Path(transaction_id): Path<i32>,
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<(StatusCode, Json<ApiResponse<TransactionResponse>>), ApiError> {
    let model = find_owned(&state, user.user_id, transaction_id).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            TransactionResponse::from(model),
            "Transaction retrieved successfully",
        )),
    ))
}

/// Edit a transaction
#[utoipa::path(
    put,
    path = "/api/v1/transactions/{transaction_id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(
        ("transaction_id" = i32, Path, description = "Transaction ID"),
    ),
    request_body = UpdateTransactionRequest,
    responses(
        (status = 200, description = "Transaction updated successfully", body = ApiResponse<TransactionResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_transaction(
    Path(transaction_id): Path<i32>,
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidJson(request): ValidJson<UpdateTransactionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TransactionResponse>>), ApiError> {
    let model = find_owned(&state, user.user_id, transaction_id).await?;

    let mut active = model.into_active_model();
    if let Some(name) = request.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(amount) = request.amount {
        active.amount = Set(amount);
    }
    if let Some(kind) = request.kind {
        active.kind = Set(kind);
    }
    if let Some(category) = request.category {
        active.category = Set(Some(category));
    }
    if let Some(is_paid) = request.is_paid {
        active.is_paid = Set(is_paid);
    }
    if let Some(created_at) = request.created_at {
        active.created_at = Set(created_at);
    }

    let updated = active
        .update(&state.db)
        .await
        .map_err(|e| database_error("Failed to update transaction", e))?;

    info!("Transaction {} updated", updated.id);
    state
        .notify(ChangeEvent::new(
            user.user_id,
            ChangeTopic::Transactions,
            ChangeAction::Update,
            Some(updated.id),
        ))
        .await;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            TransactionResponse::from(updated),
            "Transaction updated successfully",
        )),
    ))
}

/// Delete a transaction
#[utoipa::path(
    delete,
    path = "/api/v1/transactions/{transaction_id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(
        ("transaction_id" = i32, Path, description = "Transaction ID"),
    ),
    responses(
        (status = 200, description = "Transaction deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_transaction(
    Path(transaction_id): Path<i32>,
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<(StatusCode, Json<ApiResponse<String>>), ApiError> {
    let result = transaction::Entity::delete_many()
        .filter(transaction::Column::Id.eq(transaction_id))
        .filter(transaction::Column::UserId.eq(user.user_id))
        .exec(&state.db)
        .await
        .map_err(|e| database_error("Failed to delete transaction", e))?;

    if result.rows_affected == 0 {
        warn!("Transaction {} not found for deletion", transaction_id);
        return Err(not_found(transaction_id));
    }

    info!("Transaction {} deleted", transaction_id);
    state
        .notify(ChangeEvent::new(
            user.user_id,
            ChangeTopic::Transactions,
            ChangeAction::Delete,
            Some(transaction_id),
        ))
        .await;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            format!("Transaction {} deleted", transaction_id),
            "Transaction deleted successfully",
        )),
    ))
}
