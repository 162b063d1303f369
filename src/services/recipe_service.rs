//! Domain service for recipes and the per-user recipe collections
//! (favorites and shopping cart).

use serde::Serialize;
use thiserror::Error;

use crate::domain::recipe::{FieldError, RecipeInput};
use crate::domain::shopping_list::ShoppingListItem;
use crate::domain::{Actor, Page, RecipeId, UserId};
use crate::entities::recipes;
use crate::services::catalog_service::TagView;
use crate::services::user_service::UserProfile;

pub use crate::db::RecipeCollection;

#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("Recipe {0} not found")]
    NotFound(RecipeId),

    #[error("Only the author or an admin can modify this recipe")]
    Forbidden,

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("Recipe {recipe} is already in {collection}")]
    AlreadyInCollection {
        recipe: RecipeId,
        collection: &'static str,
    },

    #[error("Recipe {recipe} is not in {collection}")]
    NotInCollection {
        recipe: RecipeId,
        collection: &'static str,
    },

    #[error("Shopping list is empty")]
    EmptyShoppingList,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for RecipeError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for RecipeError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeIngredientView {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Full recipe as returned by the read endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeView {
    pub id: RecipeId,
    pub tags: Vec<TagView>,
    pub author: UserProfile,
    pub ingredients: Vec<RecipeIngredientView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: String,
}

/// Short recipe card used by collection toggles and subscriptions.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeSummary {
    pub id: RecipeId,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<recipes::Model> for RecipeSummary {
    fn from(model: recipes::Model) -> Self {
        Self {
            id: RecipeId::new(model.id),
            name: model.name,
            image: model.image,
            cooking_time: model.cooking_time,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecipeListQuery {
    pub author: Option<UserId>,
    pub tags: Vec<String>,
    /// Only recipes the viewer favorited. Ignored for anonymous viewers.
    pub is_favorited: bool,
    /// Only recipes in the viewer's cart. Ignored for anonymous viewers.
    pub is_in_shopping_cart: bool,
    pub page: u64,
    pub limit: u64,
}

/// Rendered shopping list ready to be sent as a download.
#[derive(Debug, Clone)]
pub struct ShoppingListExport {
    pub filename: String,
    pub content: String,
    pub items: Vec<ShoppingListItem>,
}

#[async_trait::async_trait]
pub trait RecipeService: Send + Sync {
    async fn list(
        &self,
        viewer: Option<UserId>,
        query: RecipeListQuery,
    ) -> Result<Page<RecipeView>, RecipeError>;

    async fn get(&self, viewer: Option<UserId>, id: RecipeId) -> Result<RecipeView, RecipeError>;

    /// Validates and stores a new recipe authored by `actor`.
    ///
    /// # Errors
    ///
    /// Returns [`RecipeError::Field`] for any invalid field, unknown
    /// ingredient or tag id, or a name the author already used.
    async fn create(&self, actor: Actor, input: RecipeInput) -> Result<RecipeView, RecipeError>;

    /// Replaces the recipe and its ingredient and tag sets.
    ///
    /// # Errors
    ///
    /// [`RecipeError::NotFound`], then [`RecipeError::Forbidden`] unless `actor`
    /// is the author or an admin, then the same field errors as `create`.
    async fn update(
        &self,
        actor: Actor,
        id: RecipeId,
        input: RecipeInput,
    ) -> Result<RecipeView, RecipeError>;

    async fn delete(&self, actor: Actor, id: RecipeId) -> Result<(), RecipeError>;

    async fn add_to(
        &self,
        actor: Actor,
        collection: RecipeCollection,
        id: RecipeId,
    ) -> Result<RecipeSummary, RecipeError>;

    async fn remove_from(
        &self,
        actor: Actor,
        collection: RecipeCollection,
        id: RecipeId,
    ) -> Result<(), RecipeError>;

    /// Aggregates and renders the actor's shopping cart.
    ///
    /// # Errors
    ///
    /// Returns [`RecipeError::EmptyShoppingList`] when the cart has no recipes.
    async fn shopping_list(&self, actor: Actor) -> Result<ShoppingListExport, RecipeError>;
}
