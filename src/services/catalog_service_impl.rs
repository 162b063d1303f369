//! `SeaORM` implementation of the `CatalogService` trait.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use crate::db::{NewIngredient, NewTag, Store};
use crate::services::catalog_service::{
    CatalogError, CatalogService, IngredientRecord, IngredientView, TagRecord, TagView,
};

static COLOR_REGEX: OnceLock<Regex> = OnceLock::new();
static SLUG_REGEX: OnceLock<Regex> = OnceLock::new();

fn color_regex() -> &'static Regex {
    COLOR_REGEX.get_or_init(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid color regex"))
}

fn slug_regex() -> &'static Regex {
    SLUG_REGEX.get_or_init(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid slug regex"))
}

fn validate_tag(record: &TagRecord) -> Result<(), CatalogError> {
    if record.name.trim().is_empty() {
        return Err(CatalogError::InvalidImport("tag name is empty".to_string()));
    }
    if !color_regex().is_match(&record.color) {
        return Err(CatalogError::InvalidImport(format!(
            "tag '{}' has invalid color '{}', expected #RRGGBB",
            record.name, record.color
        )));
    }
    if !slug_regex().is_match(&record.slug) {
        return Err(CatalogError::InvalidImport(format!(
            "tag '{}' has invalid slug '{}'",
            record.name, record.slug
        )));
    }
    Ok(())
}

pub struct SeaOrmCatalogService {
    store: Store,
}

impl SeaOrmCatalogService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CatalogService for SeaOrmCatalogService {
    async fn list_tags(&self) -> Result<Vec<TagView>, CatalogError> {
        let tags = self.store.list_tags().await?;
        Ok(tags.into_iter().map(TagView::from).collect())
    }

    async fn get_tag(&self, id: i32) -> Result<TagView, CatalogError> {
        self.store
            .get_tag(id)
            .await?
            .map(TagView::from)
            .ok_or(CatalogError::TagNotFound(id))
    }

    async fn search_ingredients(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<IngredientView>, CatalogError> {
        let found = self.store.search_ingredients(search).await?;
        Ok(found.into_iter().map(IngredientView::from).collect())
    }

    async fn get_ingredient(&self, id: i32) -> Result<IngredientView, CatalogError> {
        self.store
            .get_ingredient(id)
            .await?
            .map(IngredientView::from)
            .ok_or(CatalogError::IngredientNotFound(id))
    }

    async fn import_ingredients(
        &self,
        records: Vec<IngredientRecord>,
    ) -> Result<usize, CatalogError> {
        let mut items = Vec::with_capacity(records.len());
        for record in records {
            let name = record.name.trim().to_string();
            let measurement_unit = record.measurement_unit.trim().to_string();
            if name.is_empty() || measurement_unit.is_empty() {
                return Err(CatalogError::InvalidImport(
                    "ingredient name and measurement_unit are required".to_string(),
                ));
            }
            items.push(NewIngredient {
                name,
                measurement_unit,
            });
        }

        Ok(self.store.import_ingredients(items).await?)
    }

    async fn import_tags(&self, records: Vec<TagRecord>) -> Result<usize, CatalogError> {
        for record in &records {
            validate_tag(record)?;
        }

        let items = records
            .into_iter()
            .map(|r| NewTag {
                name: r.name.trim().to_string(),
                color: r.color,
                slug: r.slug,
            })
            .collect();

        Ok(self.store.import_tags(items).await?)
    }
}
