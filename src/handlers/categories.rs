use axum::{http::StatusCode, response::Json};
use common::{CategoryKind, categories_for};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::extractors::ValidQuery;
use crate::schemas::{ApiResponse, ErrorResponse};

/// Query parameters for the category table
#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CategoryQuery {
    /// `expense` or `income`; omitted returns every category
    pub kind: Option<CategoryKind>,
}

/// Response structure for a category
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    pub key: String,
    pub label: String,
    pub icon: String,
    pub color: String,
    pub kind: CategoryKind,
}

impl From<&common::Category> for CategoryResponse {
    fn from(category: &common::Category) -> Self {
        Self {
            key: category.key.to_string(),
            label: category.label.to_string(),
            icon: category.icon.to_string(),
            color: category.color.to_string(),
            kind: category.kind,
        }
    }
}

/// Get the static category table
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "categories",
    params(CategoryQuery),
    responses(
        (status = 200, description = "List of categories", body = ApiResponse<Vec<CategoryResponse>>),
        (status = 400, description = "Unknown kind", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn get_categories(
    ValidQuery(query): ValidQuery<CategoryQuery>,
) -> (StatusCode, Json<ApiResponse<Vec<CategoryResponse>>>) {
    let categories = categories_for(query.kind.unwrap_or(CategoryKind::Neutral))
        .map(CategoryResponse::from)
        .collect();

    (
        StatusCode::OK,
        Json(ApiResponse::new(categories, "Categories retrieved successfully")),
    )
}
