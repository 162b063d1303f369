//! Read access to tags and ingredients, plus bulk import of reference data.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entities::{ingredients, tags};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Tag {0} not found")]
    TagNotFound(i32),

    #[error("Ingredient {0} not found")]
    IngredientNotFound(i32),

    #[error("Invalid import data: {0}")]
    InvalidImport(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for CatalogError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for CatalogError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TagView {
    pub id: i32,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl From<tags::Model> for TagView {
    fn from(model: tags::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            color: model.color,
            slug: model.slug,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngredientView {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
}

impl From<ingredients::Model> for IngredientView {
    fn from(model: ingredients::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            measurement_unit: model.measurement_unit,
        }
    }
}

/// One entry of an ingredient import file.
#[derive(Debug, Clone, Deserialize)]
pub struct IngredientRecord {
    pub name: String,
    pub measurement_unit: String,
}

/// One entry of a tag import file.
#[derive(Debug, Clone, Deserialize)]
pub struct TagRecord {
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[async_trait::async_trait]
pub trait CatalogService: Send + Sync {
    async fn list_tags(&self) -> Result<Vec<TagView>, CatalogError>;

    async fn get_tag(&self, id: i32) -> Result<TagView, CatalogError>;

    /// Ingredients whose name starts with `search`, case-insensitively.
    async fn search_ingredients(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<IngredientView>, CatalogError>;

    async fn get_ingredient(&self, id: i32) -> Result<IngredientView, CatalogError>;

    /// Adds ingredients not already present. Returns how many were added.
    async fn import_ingredients(
        &self,
        records: Vec<IngredientRecord>,
    ) -> Result<usize, CatalogError>;

    /// Adds tags whose name, color and slug are all unused. Returns how many were added.
    async fn import_tags(&self, records: Vec<TagRecord>) -> Result<usize, CatalogError>;
}
