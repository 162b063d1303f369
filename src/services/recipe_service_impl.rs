//! `SeaORM` implementation of the `RecipeService` trait.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::ShoppingListConfig;
use crate::db::{RecipeDetails, RecipeFilter, Store, is_unique_violation};
use crate::domain::recipe::{FieldError, RecipeDraft, RecipeInput};
use crate::domain::shopping_list;
use crate::domain::{Actor, Page, RecipeId, UserId};
use crate::entities::recipes;
use crate::services::catalog_service::TagView;
use crate::services::recipe_service::{
    RecipeCollection, RecipeError, RecipeIngredientView, RecipeListQuery, RecipeService,
    RecipeSummary, RecipeView, ShoppingListExport,
};
use crate::services::user_service_impl::profile;

/// A concurrent write can claim the name between the check and the insert.
fn name_conflict(name: &str, err: anyhow::Error) -> RecipeError {
    if is_unique_violation(&err) {
        duplicate_name(name).into()
    } else {
        err.into()
    }
}

fn duplicate_name(name: &str) -> FieldError {
    FieldError::new(
        "name",
        format!("A recipe named '{name}' already exists for this author"),
    )
}

pub struct SeaOrmRecipeService {
    store: Store,
    shopping_list: ShoppingListConfig,
}

impl SeaOrmRecipeService {
    #[must_use]
    pub const fn new(store: Store, shopping_list: ShoppingListConfig) -> Self {
        Self {
            store,
            shopping_list,
        }
    }

    async fn existing(&self, id: RecipeId) -> Result<recipes::Model, RecipeError> {
        self.store
            .get_recipe(id.value())
            .await?
            .ok_or(RecipeError::NotFound(id))
    }

    /// Checks the parts of a draft that need the database: referenced ids
    /// exist and the author has no other recipe with the same name.
    async fn check_references(
        &self,
        author_id: i32,
        draft: &RecipeDraft,
        exclude: Option<i32>,
    ) -> Result<(), RecipeError> {
        let missing = self
            .store
            .missing_ingredient_ids(&draft.ingredient_ids())
            .await?;
        if !missing.is_empty() {
            return Err(FieldError::new(
                "ingredients",
                format!("Unknown ingredient id(s): {}", join_ids(&missing)),
            )
            .into());
        }

        let missing = self.store.missing_tag_ids(&draft.tags).await?;
        if !missing.is_empty() {
            return Err(FieldError::new(
                "tags",
                format!("Unknown tag id(s): {}", join_ids(&missing)),
            )
            .into());
        }

        if self
            .store
            .recipe_name_taken(author_id, &draft.name, exclude)
            .await?
        {
            return Err(duplicate_name(&draft.name).into());
        }

        Ok(())
    }

    async fn view(
        &self,
        recipe: recipes::Model,
        viewer: Option<UserId>,
    ) -> Result<RecipeView, RecipeError> {
        self.store
            .load_recipe_details(vec![recipe], viewer.map(|v| v.value()))
            .await?
            .pop()
            .map(to_view)
            .ok_or_else(|| RecipeError::Internal("Recipe details missing".to_string()))
    }
}

fn join_ids(ids: &[i32]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn to_view(details: RecipeDetails) -> RecipeView {
    let RecipeDetails {
        recipe,
        author,
        author_is_subscribed,
        tags,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
    } = details;

    RecipeView {
        id: RecipeId::new(recipe.id),
        tags: tags.into_iter().map(TagView::from).collect(),
        author: profile(author, author_is_subscribed),
        ingredients: ingredients
            .into_iter()
            .map(|line| RecipeIngredientView {
                id: line.id,
                name: line.name,
                measurement_unit: line.measurement_unit,
                amount: line.amount,
            })
            .collect(),
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
        pub_date: recipe.pub_date,
    }
}

#[async_trait]
impl RecipeService for SeaOrmRecipeService {
    async fn list(
        &self,
        viewer: Option<UserId>,
        query: RecipeListQuery,
    ) -> Result<Page<RecipeView>, RecipeError> {
        let viewer_id = viewer.map(|v| v.value());

        let filter = RecipeFilter {
            author_id: query.author.map(|a| a.value()),
            tag_slugs: query.tags,
            favorited_by: viewer_id.filter(|_| query.is_favorited),
            in_cart_of: viewer_id.filter(|_| query.is_in_shopping_cart),
        };

        let (recipes, count, total_pages) = self
            .store
            .list_recipes(&filter, query.page, query.limit)
            .await?;

        debug!(count, page = query.page, "Listed recipes");

        let details = self.store.load_recipe_details(recipes, viewer_id).await?;

        Ok(Page {
            count,
            total_pages,
            results: details.into_iter().map(to_view).collect(),
        })
    }

    async fn get(&self, viewer: Option<UserId>, id: RecipeId) -> Result<RecipeView, RecipeError> {
        let recipe = self.existing(id).await?;
        self.view(recipe, viewer).await
    }

    async fn create(&self, actor: Actor, input: RecipeInput) -> Result<RecipeView, RecipeError> {
        let draft = input.validate()?;
        self.check_references(actor.id.value(), &draft, None).await?;

        let recipe = self
            .store
            .create_recipe(actor.id.value(), &draft)
            .await
            .map_err(|e| name_conflict(&draft.name, e))?;

        self.view(recipe, Some(actor.id)).await
    }

    async fn update(
        &self,
        actor: Actor,
        id: RecipeId,
        input: RecipeInput,
    ) -> Result<RecipeView, RecipeError> {
        let existing = self.existing(id).await?;
        if !actor.may_modify(UserId::new(existing.author_id)) {
            return Err(RecipeError::Forbidden);
        }

        let draft = input.validate()?;
        self.check_references(existing.author_id, &draft, Some(existing.id))
            .await?;

        let recipe = self
            .store
            .update_recipe(id.value(), &draft)
            .await
            .map_err(|e| name_conflict(&draft.name, e))?
            .ok_or(RecipeError::NotFound(id))?;

        self.view(recipe, Some(actor.id)).await
    }

    async fn delete(&self, actor: Actor, id: RecipeId) -> Result<(), RecipeError> {
        let existing = self.existing(id).await?;
        if !actor.may_modify(UserId::new(existing.author_id)) {
            return Err(RecipeError::Forbidden);
        }

        if !self.store.delete_recipe(id.value()).await? {
            return Err(RecipeError::NotFound(id));
        }
        Ok(())
    }

    async fn add_to(
        &self,
        actor: Actor,
        collection: RecipeCollection,
        id: RecipeId,
    ) -> Result<RecipeSummary, RecipeError> {
        let recipe = self.existing(id).await?;

        if !self
            .store
            .add_to_collection(collection, actor.id.value(), id.value())
            .await?
        {
            return Err(RecipeError::AlreadyInCollection {
                recipe: id,
                collection: collection.label(),
            });
        }

        info!(user_id = %actor.id, recipe_id = %id, collection = collection.label(), "Recipe added");
        Ok(RecipeSummary::from(recipe))
    }

    async fn remove_from(
        &self,
        actor: Actor,
        collection: RecipeCollection,
        id: RecipeId,
    ) -> Result<(), RecipeError> {
        self.existing(id).await?;

        if !self
            .store
            .remove_from_collection(collection, actor.id.value(), id.value())
            .await?
        {
            return Err(RecipeError::NotInCollection {
                recipe: id,
                collection: collection.label(),
            });
        }

        info!(user_id = %actor.id, recipe_id = %id, collection = collection.label(), "Recipe removed");
        Ok(())
    }

    async fn shopping_list(&self, actor: Actor) -> Result<ShoppingListExport, RecipeError> {
        if self.store.cart_size(actor.id.value()).await? == 0 {
            return Err(RecipeError::EmptyShoppingList);
        }

        let items = self.store.aggregate_shopping_list(actor.id.value()).await?;
        if items.is_empty() {
            return Err(RecipeError::EmptyShoppingList);
        }

        let content = shopping_list::render(
            &self.shopping_list.header,
            chrono::Local::now().date_naive(),
            &items,
        );

        info!(user_id = %actor.id, lines = items.len(), "Shopping list exported");

        Ok(ShoppingListExport {
            filename: self.shopping_list.filename.clone(),
            content,
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewIngredient, NewTag};
    use crate::domain::recipe::IngredientAmount;

    fn draft(name: &str) -> RecipeDraft {
        RecipeDraft {
            name: name.into(),
            text: "Simmer.".into(),
            image: "data:image/png;base64,AAAA".into(),
            cooking_time: 20,
            ingredients: vec![IngredientAmount {
                ingredient_id: 1,
                amount: 5,
            }],
            tags: vec![1],
        }
    }

    #[tokio::test]
    async fn lost_name_race_is_a_field_error() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        store
            .import_ingredients(vec![NewIngredient {
                name: "Salt".into(),
                measurement_unit: "g".into(),
            }])
            .await
            .unwrap();
        store
            .import_tags(vec![NewTag {
                name: "Dinner".into(),
                color: "#49B64E".into(),
                slug: "dinner".into(),
            }])
            .await
            .unwrap();

        let admin = store.get_user_by_username("admin").await.unwrap().unwrap();
        store.create_recipe(admin.id, &draft("Soup")).await.unwrap();

        let err = store.create_recipe(admin.id, &draft("Soup")).await.unwrap_err();
        match name_conflict("Soup", err) {
            RecipeError::Field(field) => assert_eq!(field.field, "name"),
            other => panic!("expected a name field error, got {other:?}"),
        }

        let err = anyhow::anyhow!("connection reset");
        assert!(matches!(
            name_conflict("Soup", err),
            RecipeError::Internal(_)
        ));
    }
}
