use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use std::sync::Arc;

use super::auth::{AuthUser, MaybeUser};
use super::validation::{parse_flag, validate_id, validate_page, validate_page_size};
use super::{ApiError, ApiResponse, AppState};
use crate::domain::recipe::RecipeInput;
use crate::domain::{Page, RecipeId, UserId};
use crate::services::recipe_service::{RecipeListQuery, RecipeSummary, RecipeView};
use crate::services::{RecipeCollection, RecipeError};

impl From<RecipeError> for ApiError {
    fn from(err: RecipeError) -> Self {
        match err {
            RecipeError::NotFound(id) => ApiError::not_found("Recipe", id),
            RecipeError::Forbidden => ApiError::Forbidden(err.to_string()),
            RecipeError::Field(field) => field.into(),
            RecipeError::AlreadyInCollection { .. } | RecipeError::NotInCollection { .. } => {
                ApiError::validation(err.to_string())
            }
            RecipeError::EmptyShoppingList => ApiError::NotFound(err.to_string()),
            RecipeError::Database(msg) => ApiError::DatabaseError(msg),
            RecipeError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

/// Builds the list query from raw pairs so `tags` may repeat.
fn list_query(pairs: Vec<(String, String)>) -> Result<RecipeListQuery, ApiError> {
    let mut query = RecipeListQuery::default();
    let mut page = None;
    let mut limit = None;

    for (key, value) in pairs {
        match key.as_str() {
            "author" => {
                let id = value
                    .parse::<i32>()
                    .map_err(|_| ApiError::field("author", "Author must be a user id"))?;
                query.author = Some(UserId::new(validate_id("user", id)?));
            }
            "tags" => {
                if !value.is_empty() {
                    query.tags.push(value);
                }
            }
            "is_favorited" => query.is_favorited = parse_flag("is_favorited", &value)?,
            "is_in_shopping_cart" => {
                query.is_in_shopping_cart = parse_flag("is_in_shopping_cart", &value)?;
            }
            "page" => {
                page = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| ApiError::field("page", "Page must be a number"))?,
                );
            }
            "limit" => {
                limit = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| ApiError::field("limit", "Limit must be a number"))?,
                );
            }
            _ => {}
        }
    }

    query.page = validate_page(page)?;
    query.limit = validate_page_size(limit)?;
    Ok(query)
}

/// GET /recipes
pub async fn list_recipes(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<ApiResponse<Page<RecipeView>>>, ApiError> {
    let query = list_query(pairs)?;
    let page = state
        .recipe_service()
        .list(viewer.user_id(), query)
        .await?;

    Ok(Json(ApiResponse::success(page)))
}

/// GET /recipes/{id}
pub async fn get_recipe(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<RecipeView>>, ApiError> {
    let id = RecipeId::new(validate_id("recipe", id)?);
    let recipe = state.recipe_service().get(viewer.user_id(), id).await?;

    Ok(Json(ApiResponse::success(recipe)))
}

/// POST /recipes
pub async fn create_recipe(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    input: Result<Json<RecipeInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<RecipeView>>), ApiError> {
    let Json(input) = input?;
    let recipe = state.recipe_service().create(user.actor(), input).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(recipe))))
}

/// PATCH /recipes/{id}
pub async fn update_recipe(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
    input: Result<Json<RecipeInput>, JsonRejection>,
) -> Result<Json<ApiResponse<RecipeView>>, ApiError> {
    let id = RecipeId::new(validate_id("recipe", id)?);
    let Json(input) = input?;
    let recipe = state
        .recipe_service()
        .update(user.actor(), id, input)
        .await?;

    Ok(Json(ApiResponse::success(recipe)))
}

/// DELETE /recipes/{id}
pub async fn delete_recipe(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let id = RecipeId::new(validate_id("recipe", id)?);
    state.recipe_service().delete(user.actor(), id).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn add_to_collection(
    state: &AppState,
    user: AuthUser,
    collection: RecipeCollection,
    id: i32,
) -> Result<(StatusCode, Json<ApiResponse<RecipeSummary>>), ApiError> {
    let id = RecipeId::new(validate_id("recipe", id)?);
    let summary = state
        .recipe_service()
        .add_to(user.0.actor(), collection, id)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(summary))))
}

async fn remove_from_collection(
    state: &AppState,
    user: AuthUser,
    collection: RecipeCollection,
    id: i32,
) -> Result<StatusCode, ApiError> {
    let id = RecipeId::new(validate_id("recipe", id)?);
    state
        .recipe_service()
        .remove_from(user.0.actor(), collection, id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /recipes/{id}/favorite
pub async fn add_favorite(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<(StatusCode, Json<ApiResponse<RecipeSummary>>), ApiError> {
    add_to_collection(&state, user, RecipeCollection::Favorites, id).await
}

/// DELETE /recipes/{id}/favorite
pub async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    remove_from_collection(&state, user, RecipeCollection::Favorites, id).await
}

/// POST /recipes/{id}/shopping_cart
pub async fn add_to_cart(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<(StatusCode, Json<ApiResponse<RecipeSummary>>), ApiError> {
    add_to_collection(&state, user, RecipeCollection::ShoppingCart, id).await
}

/// DELETE /recipes/{id}/shopping_cart
pub async fn remove_from_cart(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    remove_from_collection(&state, user, RecipeCollection::ShoppingCart, id).await
}

/// GET /recipes/download_shopping_cart
/// Download the aggregated shopping list as a plain-text attachment
pub async fn download_shopping_cart(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let export = state.recipe_service().shopping_list(user.actor()).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export.filename),
            ),
        ],
        export.content,
    ))
}
