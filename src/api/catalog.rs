use axum::{
    Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState, SearchQuery};
use crate::services::{CatalogError, IngredientView, TagView};

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::TagNotFound(id) => ApiError::not_found("Tag", id),
            CatalogError::IngredientNotFound(id) => ApiError::not_found("Ingredient", id),
            CatalogError::InvalidImport(msg) => ApiError::ValidationError(msg),
            CatalogError::Database(msg) => ApiError::DatabaseError(msg),
            CatalogError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

/// GET /tags
pub async fn list_tags(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<TagView>>>, ApiError> {
    let tags = state.catalog_service().list_tags().await?;
    Ok(Json(ApiResponse::success(tags)))
}

/// GET /tags/{id}
pub async fn get_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<TagView>>, ApiError> {
    let tag = state
        .catalog_service()
        .get_tag(validate_id("tag", id)?)
        .await?;
    Ok(Json(ApiResponse::success(tag)))
}

/// GET /ingredients?search=<prefix>
pub async fn list_ingredients(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<IngredientView>>>, ApiError> {
    let ingredients = state
        .catalog_service()
        .search_ingredients(query.search.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(ingredients)))
}

/// GET /ingredients/{id}
pub async fn get_ingredient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<IngredientView>>, ApiError> {
    let ingredient = state
        .catalog_service()
        .get_ingredient(validate_id("ingredient", id)?)
        .await?;
    Ok(Json(ApiResponse::success(ingredient)))
}
