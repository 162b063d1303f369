use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::{AuthUser, MaybeUser};
use super::validation::{
    validate_email, validate_id, validate_page, validate_page_size, validate_person_name,
    validate_username,
};
use super::{
    ApiError, ApiResponse, AppState, MessageResponse, PageQuery, RecipesLimitQuery,
    SubscriptionsQuery,
};
use crate::domain::{Page, UserId};
use crate::services::UserError;
use crate::services::user_service::{RegisteredUser, Registration, Subscription, UserProfile};

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(id) => ApiError::not_found("User", id),
            UserError::Field(field) => field.into(),
            UserError::SelfFollow | UserError::AlreadyFollowing(_) | UserError::NotFollowing(_) => {
                ApiError::validation(err.to_string())
            }
            UserError::Database(msg) => ApiError::DatabaseError(msg),
            UserError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct SetPasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

/// GET /users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Page<UserProfile>>>, ApiError> {
    let page = validate_page(query.page)?;
    let limit = validate_page_size(query.limit)?;

    let users = state
        .user_service()
        .list(viewer.user_id(), page, limit)
        .await?;

    Ok(Json(ApiResponse::success(users)))
}

/// POST /users
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<RegisteredUser>>), ApiError> {
    let Json(payload) = payload?;
    let email = validate_email(payload.email.trim())?.to_string();
    let username = validate_username(payload.username.trim())?.to_string();
    let first_name = validate_person_name("first_name", &payload.first_name)?.to_string();
    let last_name = validate_person_name("last_name", &payload.last_name)?.to_string();

    let user = state
        .user_service()
        .register(Registration {
            email,
            username,
            first_name,
            last_name,
            password: payload.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let id = UserId::new(validate_id("user", id)?);
    let user = state.user_service().get(viewer.user_id(), id).await?;

    Ok(Json(ApiResponse::success(user)))
}

/// GET /users/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let profile = state.user_service().me(user.actor()).await?;

    Ok(Json(ApiResponse::success(profile)))
}

/// POST /users/set_password
pub async fn set_password(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<SetPasswordRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let Json(payload) = payload?;
    if payload.current_password.is_empty() {
        return Err(ApiError::field("current_password", "Current password is required"));
    }

    state
        .user_service()
        .set_password(user.actor(), &payload.current_password, &payload.new_password)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Password updated successfully".to_string(),
    })))
}

/// GET /users/subscriptions
pub async fn subscriptions(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<SubscriptionsQuery>,
) -> Result<Json<ApiResponse<Page<Subscription>>>, ApiError> {
    let page = validate_page(query.page)?;
    let limit = validate_page_size(query.limit)?;

    let subscriptions = state
        .user_service()
        .subscriptions(user.actor(), page, limit, query.recipes_limit)
        .await?;

    Ok(Json(ApiResponse::success(subscriptions)))
}

/// POST /users/{id}/subscribe
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
    Query(query): Query<RecipesLimitQuery>,
) -> Result<(StatusCode, Json<ApiResponse<Subscription>>), ApiError> {
    let target = UserId::new(validate_id("user", id)?);
    let subscription = state
        .user_service()
        .subscribe(user.actor(), target, query.recipes_limit)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(subscription))))
}

/// DELETE /users/{id}/subscribe
pub async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let target = UserId::new(validate_id("user", id)?);
    state.user_service().unsubscribe(user.actor(), target).await?;

    Ok(StatusCode::NO_CONTENT)
}
