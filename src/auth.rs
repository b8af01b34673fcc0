//! Password hashing, session tokens and the extractor that turns a bearer
//! token into the authenticated user.

use std::fmt;
use std::str::FromStr;

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use model::entities::{session, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::config::HashingSettings;
use crate::schemas::{ApiError, AppState, api_error, database_error};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Stored password hash is malformed: {0}")]
    MalformedHash(String),

    #[error("Hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Hashes a password with Argon2id on the blocking pool.
pub async fn hash_password(password: String, params: &HashingSettings) -> Result<String, AuthError> {
    let params = params.clone();
    tokio::task::spawn_blocking(move || {
        argon2_kdf::Hasher::default()
            .algorithm(argon2_kdf::Algorithm::Argon2id)
            .salt_length(params.salt_length)
            .hash_length(params.hash_length)
            .iterations(params.iterations)
            .memory_cost_kib(params.mem_cost_kib)
            .threads(params.threads)
            .hash(password.as_bytes())
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hashing(e.to_string()))
    })
    .await?
}

/// Checks a password against a stored PHC hash string.
pub async fn verify_password(password: String, stored_hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || {
        let hash = argon2_kdf::Hash::from_str(&stored_hash)
            .map_err(|e| AuthError::MalformedHash(e.to_string()))?;
        Ok(hash.verify(password.as_bytes()))
    })
    .await?
}

/// Opaque bearer token, 256 bits of randomness.
pub fn new_session_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Creates a session row for the user.
pub async fn start_session<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    ttl_hours: i64,
) -> Result<session::Model, DbErr> {
    let now = Utc::now();
    session::ActiveModel {
        user_id: Set(user_id),
        token: Set(new_session_token()),
        created_at: Set(now),
        expires_at: Set(now + Duration::hours(ttl_hours)),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// The user behind the presented session token.
#[derive(Clone)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub email: String,
    pub session_id: i32,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for AuthenticatedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedUser")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("session_id", &self.session_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    access_token: Option<String>,
}

/// Bearer header first, then `?access_token=` for EventSource clients.
fn extract_token(parts: &Parts) -> Option<String> {
    let from_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());

    from_header.or_else(|| {
        Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(query)| query.access_token)
    })
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_token(parts).filter(|t| !t.is_empty()) else {
            trace!("Request without session token");
            return Err(api_error(
                StatusCode::UNAUTHORIZED,
                "Missing bearer token",
                "UNAUTHORIZED",
            ));
        };

        let found = session::Entity::find()
            .filter(session::Column::Token.eq(token.as_str()))
            .find_also_related(user::Entity)
            .one(&state.db)
            .await
            .map_err(|e| database_error("Failed to look up session", e))?;

        let (session, user) = match found {
            Some((session, Some(user))) => (session, user),
            _ => {
                debug!("Unknown session token presented");
                return Err(api_error(
                    StatusCode::UNAUTHORIZED,
                    "Invalid session token",
                    "UNAUTHORIZED",
                ));
            }
        };

        if session.is_expired(Utc::now()) {
            warn!(user_id = user.id, session_id = session.id, "Expired session presented");
            if let Err(e) = session::Entity::delete_by_id(session.id).exec(&state.db).await {
                warn!("Failed to remove expired session {}: {}", session.id, e);
            }
            return Err(api_error(
                StatusCode::UNAUTHORIZED,
                "Session expired",
                "UNAUTHORIZED",
            ));
        }

        Ok(AuthenticatedUser {
            user_id: user.id,
            email: user.email,
            session_id: session.id,
            token: session.token,
            expires_at: session.expires_at,
        })
    }
}
