use axum::{extract::State, http::StatusCode, response::Json};
use chrono::{DateTime, Utc};
use model::entities::{session, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, IntoActiveModel, QueryFilter, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{
    AuthError, AuthenticatedUser, hash_password, normalize_email, start_session, verify_password,
};
use crate::extractors::ValidJson;
use crate::realtime::{ChangeAction, ChangeEvent, ChangeTopic};
use crate::schemas::{
    ApiError, ApiResponse, AppState, ErrorResponse, api_error, database_error,
};

/// Request body for creating an account
#[derive(Deserialize, Serialize, Validate, ToSchema)]
pub struct SignUpRequest {
    #[validate(email)]
    pub email: String,
    /// At least 6 characters
    #[validate(length(min = 6, max = 256))]
    pub password: String,
}

/// Request body for signing in
#[derive(Deserialize, Serialize, Validate, ToSchema)]
pub struct SignInRequest {
    #[validate(length(min = 1))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Request body for changing the password of the signed-in user
#[derive(Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdatePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 6, max = 256))]
    pub new_password: String,
    pub confirm_password: String,
}

// Passwords stay out of the logs.
impl std::fmt::Debug for SignUpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignUpRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for SignInRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for UpdatePasswordRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdatePasswordRequest").finish_non_exhaustive()
    }
}

/// Public view of a user
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            created_at: model.created_at,
        }
    }
}

/// A session and the user it belongs to
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    /// Bearer token to send as `Authorization: Bearer <token>`
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserResponse,
}

fn auth_failure(context: &str, err: AuthError) -> ApiError {
    error!("{}: {}", context, err);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, context, "AUTH_ERROR")
}

fn email_taken() -> ApiError {
    api_error(
        StatusCode::CONFLICT,
        "Email already registered",
        "EMAIL_ALREADY_EXISTS",
    )
}

/// A concurrent sign-up can pass the lookup and still lose on the unique index.
fn user_insert_error(err: DbErr) -> ApiError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            warn!("Email taken by a concurrent sign-up: {}", detail);
            email_taken()
        }
        _ => database_error("Failed to create user", err),
    }
}

fn invalid_credentials() -> ApiError {
    api_error(
        StatusCode::UNAUTHORIZED,
        "Invalid email or password",
        "INVALID_CREDENTIALS",
    )
}

/// Create an account and sign it in
#[utoipa::path(
    post,
    path = "/api/v1/auth/sign-up",
    tag = "auth",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created and signed in", body = ApiResponse<SessionResponse>),
        (status = 400, description = "Invalid email or password too short", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn sign_up(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<SignUpRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SessionResponse>>), ApiError> {
    let email = normalize_email(&request.email);
    debug!("Signing up {}", email);

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(&state.db)
        .await
        .map_err(|e| database_error("Failed to check email", e))?;
    if existing.is_some() {
        warn!("Email {} already registered", email);
        return Err(email_taken());
    }

    let password_hash = hash_password(request.password, &state.settings.hashing)
        .await
        .map_err(|e| auth_failure("Failed to hash password", e))?;

    let user = user::ActiveModel {
        email: Set(email),
        password_hash: Set(password_hash),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(user_insert_error)?;

    let session = start_session(&state.db, user.id, state.settings.session_ttl_hours)
        .await
        .map_err(|e| database_error("Failed to create session", e))?;

    info!("User {} signed up", user.id);
    state
        .notify(ChangeEvent::new(user.id, ChangeTopic::Auth, ChangeAction::SignedIn, None))
        .await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            SessionResponse {
                access_token: session.token,
                expires_at: session.expires_at,
                user: UserResponse::from(user),
            },
            "Account created successfully",
        )),
    ))
}

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/api/v1/auth/sign-in",
    tag = "auth",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = ApiResponse<SessionResponse>),
        (status = 401, description = "Wrong email or password", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn sign_in(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<SignInRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SessionResponse>>), ApiError> {
    let email = normalize_email(&request.email);

    let Some(user) = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(&state.db)
        .await
        .map_err(|e| database_error("Failed to look up user", e))?
    else {
        debug!("Sign-in for unknown email {}", email);
        return Err(invalid_credentials());
    };

    let matches = verify_password(request.password, user.password_hash.clone())
        .await
        .map_err(|e| auth_failure("Failed to verify password", e))?;
    if !matches {
        warn!("Wrong password for user {}", user.id);
        return Err(invalid_credentials());
    }

    let session = start_session(&state.db, user.id, state.settings.session_ttl_hours)
        .await
        .map_err(|e| database_error("Failed to create session", e))?;

    info!("User {} signed in", user.id);
    state
        .notify(ChangeEvent::new(user.id, ChangeTopic::Auth, ChangeAction::SignedIn, None))
        .await;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            SessionResponse {
                access_token: session.token,
                expires_at: session.expires_at,
                user: UserResponse::from(user),
            },
            "Signed in successfully",
        )),
    ))
}

/// Revoke the presented session
#[utoipa::path(
    post,
    path = "/api/v1/auth/sign-out",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Signed out", body = ApiResponse<String>),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn sign_out(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<(StatusCode, Json<ApiResponse<String>>), ApiError> {
    session::Entity::delete_by_id(user.session_id)
        .exec(&state.db)
        .await
        .map_err(|e| database_error("Failed to revoke session", e))?;

    info!("User {} signed out", user.user_id);
    state
        .notify(ChangeEvent::new(user.user_id, ChangeTopic::Auth, ChangeAction::SignedOut, None))
        .await;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            "signed out".to_string(),
            "Signed out successfully",
        )),
    ))
}

/// Current user and session
#[utoipa::path(
    get,
    path = "/api/v1/auth/session",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Session is valid", body = ApiResponse<SessionResponse>),
        (status = 401, description = "Missing, unknown or expired token", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_session(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<(StatusCode, Json<ApiResponse<SessionResponse>>), ApiError> {
    let model = user::Entity::find_by_id(user.user_id)
        .one(&state.db)
        .await
        .map_err(|e| database_error("Failed to load user", e))?
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "User no longer exists", "UNAUTHORIZED"))?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            SessionResponse {
                access_token: user.token,
                expires_at: user.expires_at,
                user: UserResponse::from(model),
            },
            "Session retrieved successfully",
        )),
    ))
}

/// Change the password after re-checking the current one
#[utoipa::path(
    put,
    path = "/api/v1/auth/password",
    tag = "auth",
    security(("bearer_auth" = [])),
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<String>),
        (status = 400, description = "New password too short or confirmation differs", body = ErrorResponse),
        (status = 401, description = "Current password is wrong", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidJson(request): ValidJson<UpdatePasswordRequest>,
) -> Result<(StatusCode, Json<ApiResponse<String>>), ApiError> {
    if request.new_password != request.confirm_password {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Password confirmation does not match",
            "PASSWORD_MISMATCH",
        ));
    }

    let model = user::Entity::find_by_id(user.user_id)
        .one(&state.db)
        .await
        .map_err(|e| database_error("Failed to load user", e))?
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "User no longer exists", "UNAUTHORIZED"))?;

    let matches = verify_password(request.current_password, model.password_hash.clone())
        .await
        .map_err(|e| auth_failure("Failed to verify password", e))?;
    if !matches {
        warn!("Password change for user {} with wrong current password", user.user_id);
        return Err(invalid_credentials());
    }

    let password_hash = hash_password(request.new_password, &state.settings.hashing)
        .await
        .map_err(|e| auth_failure("Failed to hash password", e))?;

    let mut active = model.into_active_model();
    active.password_hash = Set(password_hash);
    active
        .update(&state.db)
        .await
        .map_err(|e| database_error("Failed to update password", e))?;

    info!("User {} changed password", user.user_id);
    state
        .notify(ChangeEvent::new(
            user.user_id,
            ChangeTopic::Auth,
            ChangeAction::PasswordUpdated,
            None,
        ))
        .await;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            "password updated".to_string(),
            "Password updated successfully",
        )),
    ))
}
