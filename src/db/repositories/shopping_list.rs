use crate::domain::shopping_list::ShoppingListItem;
use crate::entities::{ingredients, prelude::*, recipe_ingredients, shopping_cart};
use anyhow::{Context, Result};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait,
};

#[derive(Debug, FromQueryResult)]
struct AggregatedRow {
    name: String,
    measurement_unit: String,
    total_amount: i64,
}

pub struct ShoppingListRepository {
    conn: DatabaseConnection,
}

impl ShoppingListRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Sums ingredient amounts over every recipe in the user's cart,
    /// grouped by (name, unit) and ordered by name then unit.
    pub async fn aggregate(&self, user_id: i32) -> Result<Vec<ShoppingListItem>> {
        let rows = RecipeIngredients::find()
            .select_only()
            .column_as(ingredients::Column::Name, "name")
            .column_as(ingredients::Column::MeasurementUnit, "measurement_unit")
            .column_as(
                Expr::col((RecipeIngredients, recipe_ingredients::Column::Amount)).sum(),
                "total_amount",
            )
            .join(
                JoinType::InnerJoin,
                recipe_ingredients::Relation::Ingredient.def(),
            )
            .filter(
                recipe_ingredients::Column::RecipeId.in_subquery(
                    Query::select()
                        .column(shopping_cart::Column::RecipeId)
                        .from(ShoppingCart)
                        .and_where(shopping_cart::Column::UserId.eq(user_id))
                        .to_owned(),
                ),
            )
            .group_by(ingredients::Column::Name)
            .group_by(ingredients::Column::MeasurementUnit)
            .order_by_asc(ingredients::Column::Name)
            .order_by_asc(ingredients::Column::MeasurementUnit)
            .into_model::<AggregatedRow>()
            .all(&self.conn)
            .await
            .context("Failed to aggregate shopping list")?;

        Ok(rows
            .into_iter()
            .map(|r| ShoppingListItem {
                name: r.name,
                measurement_unit: r.measurement_unit,
                total_amount: r.total_amount,
            })
            .collect())
    }
}
