use crate::entities::{ingredients, prelude::*, tags};
use anyhow::{Context, Result};
use sea_orm::sea_query::LikeExpr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::collections::HashSet;
use tracing::info;

/// Escapes `LIKE` wildcards so user input only ever matches literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Ingredient row as read from an import file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTag {
    pub name: String,
    pub color: String,
    pub slug: String,
}

/// Reference data: ingredients and tags. Read-only over HTTP.
pub struct CatalogRepository {
    conn: DatabaseConnection,
}

impl CatalogRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_tags(&self) -> Result<Vec<tags::Model>> {
        Ok(Tags::find()
            .order_by_asc(tags::Column::Id)
            .all(&self.conn)
            .await?)
    }

    pub async fn get_tag(&self, id: i32) -> Result<Option<tags::Model>> {
        Ok(Tags::find_by_id(id).one(&self.conn).await?)
    }

    /// Case-insensitive name prefix search. SQLite `LIKE` folds ASCII case.
    pub async fn search_ingredients(&self, prefix: Option<&str>) -> Result<Vec<ingredients::Model>> {
        let mut query = Ingredients::find();

        if let Some(prefix) = prefix.map(str::trim).filter(|p| !p.is_empty()) {
            let pattern = format!("{}%", escape_like(prefix));
            query = query.filter(ingredients::Column::Name.like(LikeExpr::new(pattern).escape('\\')));
        }

        Ok(query
            .order_by_asc(ingredients::Column::Name)
            .order_by_asc(ingredients::Column::Id)
            .all(&self.conn)
            .await?)
    }

    pub async fn get_ingredient(&self, id: i32) -> Result<Option<ingredients::Model>> {
        Ok(Ingredients::find_by_id(id).one(&self.conn).await?)
    }

    /// Ids from `ids` with no ingredient row, in input order.
    pub async fn missing_ingredient_ids(&self, ids: &[i32]) -> Result<Vec<i32>> {
        let found: HashSet<i32> = Ingredients::find()
            .filter(ingredients::Column::Id.is_in(ids.iter().copied()))
            .all(&self.conn)
            .await?
            .into_iter()
            .map(|i| i.id)
            .collect();

        Ok(ids.iter().copied().filter(|id| !found.contains(id)).collect())
    }

    pub async fn missing_tag_ids(&self, ids: &[i32]) -> Result<Vec<i32>> {
        let found: HashSet<i32> = Tags::find()
            .filter(tags::Column::Id.is_in(ids.iter().copied()))
            .all(&self.conn)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();

        Ok(ids.iter().copied().filter(|id| !found.contains(id)).collect())
    }

    /// Inserts ingredients not already present as an exact (name, unit) pair.
    /// Returns the number of rows added.
    pub async fn import_ingredients(&self, items: Vec<NewIngredient>) -> Result<usize> {
        let txn = self.conn.begin().await?;

        let mut seen: HashSet<(String, String)> = Ingredients::find()
            .all(&txn)
            .await?
            .into_iter()
            .map(|i| (i.name, i.measurement_unit))
            .collect();

        let fresh: Vec<ingredients::ActiveModel> = items
            .into_iter()
            .filter(|i| seen.insert((i.name.clone(), i.measurement_unit.clone())))
            .map(|i| ingredients::ActiveModel {
                name: Set(i.name),
                measurement_unit: Set(i.measurement_unit),
                ..Default::default()
            })
            .collect();

        let added = fresh.len();
        if added > 0 {
            Ingredients::insert_many(fresh)
                .exec_without_returning(&txn)
                .await
                .context("Failed to insert ingredients")?;
        }

        txn.commit().await?;

        info!(added, "Imported ingredients");
        Ok(added)
    }

    /// Inserts tags whose name, color and slug are all unused. Returns the number added.
    pub async fn import_tags(&self, items: Vec<NewTag>) -> Result<usize> {
        let txn = self.conn.begin().await?;

        let existing = Tags::find().all(&txn).await?;
        let mut names: HashSet<String> = existing.iter().map(|t| t.name.clone()).collect();
        let mut colors: HashSet<String> = existing.iter().map(|t| t.color.clone()).collect();
        let mut slugs: HashSet<String> = existing.into_iter().map(|t| t.slug).collect();

        let mut fresh = Vec::new();
        for tag in items {
            if names.contains(&tag.name) || colors.contains(&tag.color) || slugs.contains(&tag.slug)
            {
                continue;
            }
            names.insert(tag.name.clone());
            colors.insert(tag.color.clone());
            slugs.insert(tag.slug.clone());

            fresh.push(tags::ActiveModel {
                name: Set(tag.name),
                color: Set(tag.color),
                slug: Set(tag.slug),
                ..Default::default()
            });
        }

        let added = fresh.len();
        if added > 0 {
            Tags::insert_many(fresh)
                .exec_without_returning(&txn)
                .await
                .context("Failed to insert tags")?;
        }

        txn.commit().await?;

        info!(added, "Imported tags");
        Ok(added)
    }
}
