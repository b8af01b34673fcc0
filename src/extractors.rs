//! Request extractors that validate their payload. Every rejection, whether
//! the body does not parse or a field fails validation, is answered with the
//! JSON error shape and the `VALIDATION_ERROR` code.

use axum::{
    async_trait,
    extract::{
        FromRequest, FromRequestParts, Json, Query, Request,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, request::Parts},
};
use axum_valid::{Valid, ValidRejection};
use std::fmt::Display;
use tracing::warn;

use crate::schemas::{ApiError, api_error, validation_error};

/// JSON body checked with its `Validate` rules.
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

/// Query string checked with its `Validate` rules.
#[derive(Debug)]
pub struct ValidQuery<T>(pub T);

fn rejection_error<E: Display>(rejection: ValidRejection<E>) -> ApiError {
    match rejection {
        ValidRejection::Valid(errors) => validation_error(errors),
        ValidRejection::Inner(inner) => {
            warn!("Malformed request: {}", inner);
            api_error(StatusCode::BAD_REQUEST, inner.to_string(), "VALIDATION_ERROR")
        }
    }
}

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    Valid<Json<T>>: FromRequest<S, Rejection = ValidRejection<JsonRejection>>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Valid(Json(value)) = Valid::<Json<T>>::from_request(req, state)
            .await
            .map_err(rejection_error)?;
        Ok(Self(value))
    }
}

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    Valid<Query<T>>: FromRequestParts<S, Rejection = ValidRejection<QueryRejection>>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Valid(Query(value)) = Valid::<Query<T>>::from_request_parts(parts, state)
            .await
            .map_err(rejection_error)?;
        Ok(Self(value))
    }
}
