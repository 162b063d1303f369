use axum::{
    Json,
    extract::{FromRequestParts, Request, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::domain::UserId;
use crate::services::{AuthError, Identity};

const SESSION_USER_KEY: &str = "user_id";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub id: UserId,
    pub username: String,
    pub api_key: String,
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            AuthError::Database(msg) => ApiError::DatabaseError(msg),
            AuthError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Resolves the caller from, in order:
/// 1. Session cookie (from login)
/// 2. `X-Api-Key` header
/// 3. `Authorization: Token <key>` or `Authorization: Bearer <key>` header
///
/// Anonymous requests pass through; a key that matches no user is rejected.
pub async fn identity_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let mut identity = None;

    if let Ok(Some(user_id)) = session.get::<i32>(SESSION_USER_KEY).await {
        identity = state
            .auth_service()
            .identity_for(UserId::new(user_id))
            .await?;
    }

    if identity.is_none()
        && let Some(key) = extract_api_key(&headers)
    {
        match state.auth_service().verify_api_key(&key).await? {
            Some(found) => identity = Some(found),
            None => {
                return Ok((
                    StatusCode::UNAUTHORIZED,
                    Json(ApiResponse::<()>::error("Invalid API key")),
                )
                    .into_response());
            }
        }
    }

    if let Some(identity) = identity {
        tracing::Span::current().record("user_id", identity.user_id.value());
        request.extensions_mut().insert(identity);
    }

    Ok(next.run(request).await)
}

/// Extract API key from headers
fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(api_key) = headers.get("X-Api-Key")
        && let Ok(key_str) = api_key.to_str()
    {
        return Some(key_str.trim().to_string());
    }

    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str
            .strip_prefix("Bearer ")
            .or_else(|| auth_str.strip_prefix("Token "))
    {
        return Some(token.trim().to_string());
    }

    None
}

// ============================================================================
// Extractors
// ============================================================================

/// The authenticated caller. Rejects anonymous requests with 401.
pub struct AuthUser(pub Identity);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(ApiError::unauthorized)
    }
}

/// The caller if one was identified.
pub struct MaybeUser(pub Option<Identity>);

impl MaybeUser {
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.0.as_ref().map(|i| i.user_id)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<Identity>().cloned()))
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
/// Authenticate with email and password, starts a session and returns the API key
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let Json(payload) = payload?;
    if payload.email.is_empty() {
        return Err(ApiError::field("email", "Email is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::field("password", "Password is required"));
    }

    let result = state
        .auth_service()
        .login(&payload.email, &payload.password)
        .await?;

    if let Err(e) = session.cycle_id().await {
        return Err(ApiError::internal(format!("Failed to create session: {e}")));
    }
    if let Err(e) = session.insert(SESSION_USER_KEY, result.id.value()).await {
        return Err(ApiError::internal(format!("Failed to create session: {e}")));
    }

    tracing::info!(user_id = %result.id, "User logged in");

    Ok(Json(ApiResponse::success(LoginResponse {
        id: result.id,
        username: result.username,
        api_key: result.api_key,
    })))
}

/// POST /auth/logout
/// Invalidate the current session
pub async fn logout(session: Session) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    session
        .flush()
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Logged out".to_string(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn api_key_sources() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_api_key(&headers), None);

        headers.insert("Authorization", HeaderValue::from_static("Token abc"));
        assert_eq!(extract_api_key(&headers).as_deref(), Some("abc"));

        headers.insert("Authorization", HeaderValue::from_static("Bearer def"));
        assert_eq!(extract_api_key(&headers).as_deref(), Some("def"));

        headers.insert("X-Api-Key", HeaderValue::from_static("ghi"));
        assert_eq!(extract_api_key(&headers).as_deref(), Some("ghi"));
    }

    #[test]
    fn unknown_scheme_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert_eq!(extract_api_key(&headers), None);
    }
}
