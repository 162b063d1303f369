//! Reference data import command handlers

use anyhow::Context;
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::config::Config;
use crate::db::Store;
use crate::services::catalog_service::{IngredientRecord, TagRecord};
use crate::services::{CatalogService, SeaOrmCatalogService};

fn read_records<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file: {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse import file: {}", path.display()))
}

async fn catalog(config: &Config) -> anyhow::Result<SeaOrmCatalogService> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;
    Ok(SeaOrmCatalogService::new(store))
}

pub async fn cmd_import_ingredients(config: &Config, path: &Path) -> anyhow::Result<()> {
    let records: Vec<IngredientRecord> = read_records(path)?;
    let total = records.len();

    let added = catalog(config).await?.import_ingredients(records).await?;

    println!("✓ Imported {added} of {total} ingredients ({} already present)", total - added);
    Ok(())
}

pub async fn cmd_import_tags(config: &Config, path: &Path) -> anyhow::Result<()> {
    let records: Vec<TagRecord> = read_records(path)?;
    let total = records.len();

    let added = catalog(config).await?.import_tags(records).await?;

    println!("✓ Imported {added} of {total} tags ({} already present)", total - added);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ingredient_file() {
        let dir = std::env::temp_dir().join(format!("foodgram-import-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("ingredients.json");
        std::fs::write(
            &path,
            r#"[{"name": "абрикосовое варенье", "measurement_unit": "г"}, {"name": "Salt", "measurement_unit": "g"}]"#,
        )
        .unwrap();

        let records: Vec<IngredientRecord> = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].name, "Salt");

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn missing_file_is_an_error() {
        let result: anyhow::Result<Vec<TagRecord>> =
            read_records(Path::new("/nonexistent/foodgram/tags.json"));
        assert!(result.is_err());
    }
}
