//! User-to-user and user-to-recipe link tables. Each link is a composite-key row;
//! adding an existing link or removing a missing one reports `false`.

use crate::entities::{favorites, follows, prelude::*, shopping_cart, users};
use anyhow::Result;
use sea_orm::sea_query::{OnConflict, Query};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};

use super::user::User;

/// Which per-user recipe collection an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeCollection {
    Favorites,
    ShoppingCart,
}

impl RecipeCollection {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Favorites => "favorites",
            Self::ShoppingCart => "shopping cart",
        }
    }
}

pub struct MembershipRepository {
    conn: DatabaseConnection,
}

impl MembershipRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn now() -> String {
        chrono::Utc::now().to_rfc3339()
    }

    /// Returns `false` when the link already existed.
    pub async fn add_recipe(
        &self,
        collection: RecipeCollection,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<bool> {
        let inserted = match collection {
            RecipeCollection::Favorites => {
                Favorites::insert(favorites::ActiveModel {
                    user_id: Set(user_id),
                    recipe_id: Set(recipe_id),
                    created_at: Set(Self::now()),
                })
                .on_conflict(
                    OnConflict::columns([favorites::Column::UserId, favorites::Column::RecipeId])
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&self.conn)
                .await?
            }
            RecipeCollection::ShoppingCart => {
                ShoppingCart::insert(shopping_cart::ActiveModel {
                    user_id: Set(user_id),
                    recipe_id: Set(recipe_id),
                    created_at: Set(Self::now()),
                })
                .on_conflict(
                    OnConflict::columns([
                        shopping_cart::Column::UserId,
                        shopping_cart::Column::RecipeId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&self.conn)
                .await?
            }
        };

        Ok(inserted > 0)
    }

    /// Returns `false` when there was nothing to remove.
    pub async fn remove_recipe(
        &self,
        collection: RecipeCollection,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<bool> {
        let result = match collection {
            RecipeCollection::Favorites => {
                Favorites::delete_by_id((user_id, recipe_id))
                    .exec(&self.conn)
                    .await?
            }
            RecipeCollection::ShoppingCart => {
                ShoppingCart::delete_by_id((user_id, recipe_id))
                    .exec(&self.conn)
                    .await?
            }
        };

        Ok(result.rows_affected > 0)
    }

    pub async fn cart_size(&self, user_id: i32) -> Result<u64> {
        Ok(ShoppingCart::find()
            .filter(shopping_cart::Column::UserId.eq(user_id))
            .count(&self.conn)
            .await?)
    }

    pub async fn follow(&self, user_id: i32, following_id: i32) -> Result<bool> {
        let inserted = Follows::insert(follows::ActiveModel {
            user_id: Set(user_id),
            following_id: Set(following_id),
            created_at: Set(Self::now()),
        })
        .on_conflict(
            OnConflict::columns([follows::Column::UserId, follows::Column::FollowingId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&self.conn)
        .await?;

        Ok(inserted > 0)
    }

    pub async fn unfollow(&self, user_id: i32, following_id: i32) -> Result<bool> {
        let result = Follows::delete_by_id((user_id, following_id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Ids among `candidates` that `user_id` follows.
    pub async fn followed_among(&self, user_id: i32, candidates: &[i32]) -> Result<Vec<i32>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        Ok(Follows::find()
            .filter(follows::Column::UserId.eq(user_id))
            .filter(follows::Column::FollowingId.is_in(candidates.iter().copied()))
            .all(&self.conn)
            .await?
            .into_iter()
            .map(|f| f.following_id)
            .collect())
    }

    /// Users that `user_id` follows, ordered by username.
    pub async fn list_following(
        &self,
        user_id: i32,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<User>, u64, u64)> {
        let paginator = Users::find()
            .filter(
                users::Column::Id.in_subquery(
                    Query::select()
                        .column(follows::Column::FollowingId)
                        .from(Follows)
                        .and_where(follows::Column::UserId.eq(user_id))
                        .to_owned(),
                ),
            )
            .order_by_asc(users::Column::Username)
            .paginate(&self.conn, page_size);

        let totals = paginator.num_items_and_pages().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((
            items.into_iter().map(User::from).collect(),
            totals.number_of_items,
            totals.number_of_pages,
        ))
    }
}
