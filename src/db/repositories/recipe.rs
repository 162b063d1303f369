use crate::domain::recipe::RecipeDraft;
use crate::entities::{
    favorites, follows, ingredients, prelude::*, recipe_ingredients, recipe_tags, recipes,
    shopping_cart, tags,
};
use anyhow::{Context, Result};
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Select, Set, TransactionTrait,
};
use std::collections::{HashMap, HashSet};
use tracing::info;

use super::user::{User, UserRepository};

/// Restrictions applied to the public recipe list.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub author_id: Option<i32>,
    /// Matches recipes carrying any of these tags.
    pub tag_slugs: Vec<String>,
    pub favorited_by: Option<i32>,
    pub in_cart_of: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeIngredientLine {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// A recipe with everything the read model shows, flags relative to one viewer.
#[derive(Debug, Clone)]
pub struct RecipeDetails {
    pub recipe: recipes::Model,
    pub author: User,
    pub author_is_subscribed: bool,
    pub tags: Vec<tags::Model>,
    pub ingredients: Vec<RecipeIngredientLine>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

pub struct RecipeRepository {
    conn: DatabaseConnection,
}

impl RecipeRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<Option<recipes::Model>> {
        Ok(Recipes::find_by_id(id).one(&self.conn).await?)
    }

    /// Whether `author_id` already owns a recipe called `name`, ignoring `exclude`.
    pub async fn name_taken(&self, author_id: i32, name: &str, exclude: Option<i32>) -> Result<bool> {
        let mut query = Recipes::find()
            .filter(recipes::Column::AuthorId.eq(author_id))
            .filter(recipes::Column::Name.eq(name));

        if let Some(id) = exclude {
            query = query.filter(recipes::Column::Id.ne(id));
        }

        Ok(query.count(&self.conn).await? > 0)
    }

    /// Inserts the recipe and its ingredient and tag rows in one transaction.
    pub async fn create(&self, author_id: i32, draft: &RecipeDraft) -> Result<recipes::Model> {
        let txn = self.conn.begin().await?;

        let recipe = recipes::ActiveModel {
            author_id: Set(author_id),
            name: Set(draft.name.clone()),
            text: Set(draft.text.clone()),
            cooking_time: Set(draft.cooking_time),
            image: Set(draft.image.clone()),
            pub_date: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert recipe")?;

        Self::insert_children(&txn, recipe.id, draft).await?;

        txn.commit().await?;

        info!(recipe_id = recipe.id, author_id, "Recipe created");
        Ok(recipe)
    }

    /// Replaces every scalar field and the full ingredient and tag sets.
    pub async fn update(&self, id: i32, draft: &RecipeDraft) -> Result<Option<recipes::Model>> {
        let txn = self.conn.begin().await?;

        let Some(existing) = Recipes::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };

        let mut active: recipes::ActiveModel = existing.into();
        active.name = Set(draft.name.clone());
        active.text = Set(draft.text.clone());
        active.cooking_time = Set(draft.cooking_time);
        active.image = Set(draft.image.clone());
        let recipe = active.update(&txn).await.context("Failed to update recipe")?;

        RecipeIngredients::delete_many()
            .filter(recipe_ingredients::Column::RecipeId.eq(id))
            .exec(&txn)
            .await?;
        RecipeTags::delete_many()
            .filter(recipe_tags::Column::RecipeId.eq(id))
            .exec(&txn)
            .await?;

        Self::insert_children(&txn, id, draft).await?;

        txn.commit().await?;

        info!(recipe_id = id, "Recipe updated");
        Ok(Some(recipe))
    }

    async fn insert_children<C: ConnectionTrait>(
        conn: &C,
        recipe_id: i32,
        draft: &RecipeDraft,
    ) -> Result<()> {
        let ingredient_rows = draft
            .ingredients
            .iter()
            .map(|item| recipe_ingredients::ActiveModel {
                recipe_id: Set(recipe_id),
                ingredient_id: Set(item.ingredient_id),
                amount: Set(item.amount),
            });

        RecipeIngredients::insert_many(ingredient_rows)
            .exec_without_returning(conn)
            .await
            .context("Failed to insert recipe ingredients")?;

        let tag_rows = draft.tags.iter().map(|tag_id| recipe_tags::ActiveModel {
            recipe_id: Set(recipe_id),
            tag_id: Set(*tag_id),
        });

        RecipeTags::insert_many(tag_rows)
            .exec_without_returning(conn)
            .await
            .context("Failed to insert recipe tags")?;

        Ok(())
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let txn = self.conn.begin().await?;

        RecipeIngredients::delete_many()
            .filter(recipe_ingredients::Column::RecipeId.eq(id))
            .exec(&txn)
            .await?;
        RecipeTags::delete_many()
            .filter(recipe_tags::Column::RecipeId.eq(id))
            .exec(&txn)
            .await?;
        Favorites::delete_many()
            .filter(favorites::Column::RecipeId.eq(id))
            .exec(&txn)
            .await?;
        ShoppingCart::delete_many()
            .filter(shopping_cart::Column::RecipeId.eq(id))
            .exec(&txn)
            .await?;

        let result = Recipes::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        if result.rows_affected > 0 {
            info!(recipe_id = id, "Recipe deleted");
        }
        Ok(result.rows_affected > 0)
    }

    async fn filtered(&self, filter: &RecipeFilter) -> Result<Option<Select<Recipes>>> {
        let mut query = Recipes::find();

        if let Some(author_id) = filter.author_id {
            query = query.filter(recipes::Column::AuthorId.eq(author_id));
        }

        if !filter.tag_slugs.is_empty() {
            let tag_ids: Vec<i32> = Tags::find()
                .filter(tags::Column::Slug.is_in(filter.tag_slugs.iter().cloned()))
                .all(&self.conn)
                .await?
                .into_iter()
                .map(|t| t.id)
                .collect();

            if tag_ids.is_empty() {
                return Ok(None);
            }

            query = query.filter(
                recipes::Column::Id.in_subquery(
                    Query::select()
                        .column(recipe_tags::Column::RecipeId)
                        .from(RecipeTags)
                        .and_where(recipe_tags::Column::TagId.is_in(tag_ids))
                        .to_owned(),
                ),
            );
        }

        if let Some(user_id) = filter.favorited_by {
            query = query.filter(
                recipes::Column::Id.in_subquery(
                    Query::select()
                        .column(favorites::Column::RecipeId)
                        .from(Favorites)
                        .and_where(favorites::Column::UserId.eq(user_id))
                        .to_owned(),
                ),
            );
        }

        if let Some(user_id) = filter.in_cart_of {
            query = query.filter(
                recipes::Column::Id.in_subquery(
                    Query::select()
                        .column(shopping_cart::Column::RecipeId)
                        .from(ShoppingCart)
                        .and_where(shopping_cart::Column::UserId.eq(user_id))
                        .to_owned(),
                ),
            );
        }

        Ok(Some(query))
    }

    /// Newest first. Returns the page plus total item and page counts.
    pub async fn list(
        &self,
        filter: &RecipeFilter,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<recipes::Model>, u64, u64)> {
        let Some(query) = self.filtered(filter).await? else {
            return Ok((Vec::new(), 0, 0));
        };

        let paginator = query
            .order_by_desc(recipes::Column::PubDate)
            .order_by_desc(recipes::Column::Id)
            .paginate(&self.conn, page_size);

        let totals = paginator.num_items_and_pages().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((items, totals.number_of_items, totals.number_of_pages))
    }

    /// Every recipe of the given authors, newest first.
    pub async fn list_by_authors(&self, author_ids: &[i32]) -> Result<Vec<recipes::Model>> {
        if author_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(Recipes::find()
            .filter(recipes::Column::AuthorId.is_in(author_ids.iter().copied()))
            .order_by_desc(recipes::Column::PubDate)
            .order_by_desc(recipes::Column::Id)
            .all(&self.conn)
            .await?)
    }

    /// Attaches authors, tags, ingredient lines and the viewer's flags, keeping input order.
    pub async fn load_details(
        &self,
        recipes: Vec<recipes::Model>,
        viewer: Option<i32>,
    ) -> Result<Vec<RecipeDetails>> {
        if recipes.is_empty() {
            return Ok(Vec::new());
        }

        let recipe_ids: Vec<i32> = recipes.iter().map(|r| r.id).collect();
        let mut author_ids: Vec<i32> = recipes.iter().map(|r| r.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let authors: HashMap<i32, User> = UserRepository::new(self.conn.clone())
            .get_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let mut tags_by_recipe: HashMap<i32, Vec<tags::Model>> = HashMap::new();
        let tag_rows = RecipeTags::find()
            .filter(recipe_tags::Column::RecipeId.is_in(recipe_ids.iter().copied()))
            .find_also_related(Tags)
            .order_by_asc(tags::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to load recipe tags")?;
        for (link, tag) in tag_rows {
            if let Some(tag) = tag {
                tags_by_recipe.entry(link.recipe_id).or_default().push(tag);
            }
        }

        let mut lines_by_recipe: HashMap<i32, Vec<RecipeIngredientLine>> = HashMap::new();
        let ingredient_rows = RecipeIngredients::find()
            .filter(recipe_ingredients::Column::RecipeId.is_in(recipe_ids.iter().copied()))
            .find_also_related(Ingredients)
            .order_by_asc(ingredients::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to load recipe ingredients")?;
        for (link, ingredient) in ingredient_rows {
            if let Some(ingredient) = ingredient {
                lines_by_recipe
                    .entry(link.recipe_id)
                    .or_default()
                    .push(RecipeIngredientLine {
                        id: ingredient.id,
                        name: ingredient.name,
                        measurement_unit: ingredient.measurement_unit,
                        amount: link.amount,
                    });
            }
        }

        let (favorited, in_cart, subscribed) = match viewer {
            Some(user_id) => (
                Favorites::find()
                    .filter(favorites::Column::UserId.eq(user_id))
                    .filter(favorites::Column::RecipeId.is_in(recipe_ids.iter().copied()))
                    .all(&self.conn)
                    .await?
                    .into_iter()
                    .map(|f| f.recipe_id)
                    .collect::<HashSet<_>>(),
                ShoppingCart::find()
                    .filter(shopping_cart::Column::UserId.eq(user_id))
                    .filter(shopping_cart::Column::RecipeId.is_in(recipe_ids.iter().copied()))
                    .all(&self.conn)
                    .await?
                    .into_iter()
                    .map(|c| c.recipe_id)
                    .collect::<HashSet<_>>(),
                Follows::find()
                    .filter(follows::Column::UserId.eq(user_id))
                    .filter(follows::Column::FollowingId.is_in(author_ids.iter().copied()))
                    .all(&self.conn)
                    .await?
                    .into_iter()
                    .map(|f| f.following_id)
                    .collect::<HashSet<_>>(),
            ),
            None => (HashSet::new(), HashSet::new(), HashSet::new()),
        };

        let mut details = Vec::with_capacity(recipes.len());
        for recipe in recipes {
            let author = authors
                .get(&recipe.author_id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("Recipe {} has no author", recipe.id))?;

            details.push(RecipeDetails {
                author_is_subscribed: subscribed.contains(&recipe.author_id),
                tags: tags_by_recipe.remove(&recipe.id).unwrap_or_default(),
                ingredients: lines_by_recipe.remove(&recipe.id).unwrap_or_default(),
                is_favorited: favorited.contains(&recipe.id),
                is_in_shopping_cart: in_cart.contains(&recipe.id),
                author,
                recipe,
            });
        }

        Ok(details)
    }
}
