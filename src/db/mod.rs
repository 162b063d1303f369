use crate::config::SecurityConfig;
use crate::domain::recipe::RecipeDraft;
use crate::domain::shopping_list::ShoppingListItem;
use crate::entities::{ingredients, recipes, tags};
use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, SqlErr, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::catalog::{NewIngredient, NewTag};
pub use repositories::membership::RecipeCollection;
pub use repositories::recipe::{RecipeDetails, RecipeFilter, RecipeIngredientLine};
pub use repositories::user::{NewUser, User};

/// Whether `err` was caused by a unique index or primary key rejecting a row.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<DbErr>().and_then(DbErr::sql_err),
            Some(SqlErr::UniqueConstraintViolation(_))
        )
    })
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");

        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        // Each pooled connection to an in-memory database sees its own empty database.
        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn recipe_repo(&self) -> repositories::recipe::RecipeRepository {
        repositories::recipe::RecipeRepository::new(self.conn.clone())
    }

    fn catalog_repo(&self) -> repositories::catalog::CatalogRepository {
        repositories::catalog::CatalogRepository::new(self.conn.clone())
    }

    fn membership_repo(&self) -> repositories::membership::MembershipRepository {
        repositories::membership::MembershipRepository::new(self.conn.clone())
    }

    fn shopping_list_repo(&self) -> repositories::shopping_list::ShoppingListRepository {
        repositories::shopping_list::ShoppingListRepository::new(self.conn.clone())
    }

    // Users

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_users_by_ids(&self, ids: &[i32]) -> Result<Vec<User>> {
        self.user_repo().get_by_ids(ids).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn find_taken_identity(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<&'static str>> {
        self.user_repo().find_taken_identity(username, email).await
    }

    pub async fn list_users(&self, page: u64, page_size: u64) -> Result<(Vec<User>, u64, u64)> {
        self.user_repo().list(page, page_size).await
    }

    pub async fn create_user(&self, new_user: NewUser, config: &SecurityConfig) -> Result<User> {
        self.user_repo().create(new_user, config).await
    }

    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<User>> {
        self.user_repo().verify_credentials(email, password).await
    }

    pub async fn verify_user_password(&self, user_id: i32, password: &str) -> Result<bool> {
        self.user_repo().verify_password(user_id, password).await
    }

    pub async fn update_user_password(
        &self,
        user_id: i32,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<()> {
        self.user_repo()
            .update_password(user_id, new_password, config)
            .await
    }

    pub async fn verify_api_key(&self, api_key: &str) -> Result<Option<User>> {
        self.user_repo().verify_api_key(api_key).await
    }

    // Recipes

    pub async fn get_recipe(&self, id: i32) -> Result<Option<recipes::Model>> {
        self.recipe_repo().get(id).await
    }

    pub async fn recipe_name_taken(
        &self,
        author_id: i32,
        name: &str,
        exclude: Option<i32>,
    ) -> Result<bool> {
        self.recipe_repo().name_taken(author_id, name, exclude).await
    }

    pub async fn create_recipe(&self, author_id: i32, draft: &RecipeDraft) -> Result<recipes::Model> {
        self.recipe_repo().create(author_id, draft).await
    }

    pub async fn update_recipe(
        &self,
        id: i32,
        draft: &RecipeDraft,
    ) -> Result<Option<recipes::Model>> {
        self.recipe_repo().update(id, draft).await
    }

    pub async fn delete_recipe(&self, id: i32) -> Result<bool> {
        self.recipe_repo().delete(id).await
    }

    pub async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<recipes::Model>, u64, u64)> {
        self.recipe_repo().list(filter, page, page_size).await
    }

    pub async fn list_recipes_by_authors(&self, author_ids: &[i32]) -> Result<Vec<recipes::Model>> {
        self.recipe_repo().list_by_authors(author_ids).await
    }

    pub async fn load_recipe_details(
        &self,
        recipes: Vec<recipes::Model>,
        viewer: Option<i32>,
    ) -> Result<Vec<RecipeDetails>> {
        self.recipe_repo().load_details(recipes, viewer).await
    }

    // Tags and ingredients

    pub async fn list_tags(&self) -> Result<Vec<tags::Model>> {
        self.catalog_repo().list_tags().await
    }

    pub async fn get_tag(&self, id: i32) -> Result<Option<tags::Model>> {
        self.catalog_repo().get_tag(id).await
    }

    pub async fn search_ingredients(&self, prefix: Option<&str>) -> Result<Vec<ingredients::Model>> {
        self.catalog_repo().search_ingredients(prefix).await
    }

    pub async fn get_ingredient(&self, id: i32) -> Result<Option<ingredients::Model>> {
        self.catalog_repo().get_ingredient(id).await
    }

    pub async fn missing_ingredient_ids(&self, ids: &[i32]) -> Result<Vec<i32>> {
        self.catalog_repo().missing_ingredient_ids(ids).await
    }

    pub async fn missing_tag_ids(&self, ids: &[i32]) -> Result<Vec<i32>> {
        self.catalog_repo().missing_tag_ids(ids).await
    }

    pub async fn import_ingredients(&self, items: Vec<NewIngredient>) -> Result<usize> {
        self.catalog_repo().import_ingredients(items).await
    }

    pub async fn import_tags(&self, items: Vec<NewTag>) -> Result<usize> {
        self.catalog_repo().import_tags(items).await
    }

    // Follows, favorites and the shopping cart

    pub async fn add_to_collection(
        &self,
        collection: RecipeCollection,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<bool> {
        self.membership_repo()
            .add_recipe(collection, user_id, recipe_id)
            .await
    }

    pub async fn remove_from_collection(
        &self,
        collection: RecipeCollection,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<bool> {
        self.membership_repo()
            .remove_recipe(collection, user_id, recipe_id)
            .await
    }

    pub async fn cart_size(&self, user_id: i32) -> Result<u64> {
        self.membership_repo().cart_size(user_id).await
    }

    pub async fn follow(&self, user_id: i32, following_id: i32) -> Result<bool> {
        self.membership_repo().follow(user_id, following_id).await
    }

    pub async fn unfollow(&self, user_id: i32, following_id: i32) -> Result<bool> {
        self.membership_repo().unfollow(user_id, following_id).await
    }

    pub async fn followed_among(&self, user_id: i32, candidates: &[i32]) -> Result<Vec<i32>> {
        self.membership_repo()
            .followed_among(user_id, candidates)
            .await
    }

    pub async fn list_following(
        &self,
        user_id: i32,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<User>, u64, u64)> {
        self.membership_repo()
            .list_following(user_id, page, page_size)
            .await
    }

    pub async fn aggregate_shopping_list(&self, user_id: i32) -> Result<Vec<ShoppingListItem>> {
        self.shopping_list_repo().aggregate(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recipe::IngredientAmount;

    async fn store() -> Store {
        Store::new("sqlite::memory:").await.unwrap()
    }

    fn security() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        }
    }

    async fn seed_catalog(store: &Store) {
        store
            .import_ingredients(vec![
                NewIngredient {
                    name: "Flour".into(),
                    measurement_unit: "g".into(),
                },
                NewIngredient {
                    name: "Salt".into(),
                    measurement_unit: "g".into(),
                },
                NewIngredient {
                    name: "Egg".into(),
                    measurement_unit: "pcs".into(),
                },
            ])
            .await
            .unwrap();
        store
            .import_tags(vec![NewTag {
                name: "Breakfast".into(),
                color: "#E26C2D".into(),
                slug: "breakfast".into(),
            }])
            .await
            .unwrap();
    }

    async fn user(store: &Store, name: &str) -> User {
        store
            .create_user(
                NewUser {
                    username: name.into(),
                    email: format!("{name}@example.com"),
                    first_name: name.into(),
                    last_name: "Tester".into(),
                    password: "secret-password".into(),
                },
                &security(),
            )
            .await
            .unwrap()
    }

    fn draft(name: &str, ingredients: &[(i32, i32)]) -> RecipeDraft {
        RecipeDraft {
            name: name.into(),
            text: "Cook it.".into(),
            image: "data:image/png;base64,AAAA".into(),
            cooking_time: 10,
            ingredients: ingredients
                .iter()
                .map(|&(ingredient_id, amount)| IngredientAmount {
                    ingredient_id,
                    amount,
                })
                .collect(),
            tags: vec![1],
        }
    }

    #[tokio::test]
    async fn admin_is_seeded() {
        let store = store().await;
        let admin = store.get_user_by_username("admin").await.unwrap().unwrap();
        assert!(admin.role.is_admin());
        assert_eq!(admin.api_key, migrator::DEFAULT_API_KEY);
    }

    #[tokio::test]
    async fn import_skips_existing_rows() {
        let store = store().await;
        seed_catalog(&store).await;

        let added = store
            .import_ingredients(vec![
                NewIngredient {
                    name: "Flour".into(),
                    measurement_unit: "g".into(),
                },
                NewIngredient {
                    name: "Flour".into(),
                    measurement_unit: "kg".into(),
                },
            ])
            .await
            .unwrap();
        assert_eq!(added, 1);

        let found = store.search_ingredients(Some("fl")).await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn update_replaces_ingredient_set() {
        let store = store().await;
        seed_catalog(&store).await;
        let author = user(&store, "cook").await;

        let recipe = store
            .create_recipe(author.id, &draft("Bread", &[(1, 500), (2, 10)]))
            .await
            .unwrap();

        store
            .update_recipe(recipe.id, &draft("Bread", &[(3, 2)]))
            .await
            .unwrap()
            .unwrap();

        let details = store
            .load_recipe_details(vec![store.get_recipe(recipe.id).await.unwrap().unwrap()], None)
            .await
            .unwrap();
        assert_eq!(details[0].ingredients.len(), 1);
        assert_eq!(details[0].ingredients[0].name, "Egg");
        assert_eq!(details[0].ingredients[0].amount, 2);
    }

    #[tokio::test]
    async fn failed_update_keeps_previous_recipe() {
        let store = store().await;
        seed_catalog(&store).await;
        let author = user(&store, "cook").await;

        let recipe = store
            .create_recipe(author.id, &draft("Bread", &[(1, 500), (2, 10)]))
            .await
            .unwrap();

        // Ingredient 999 does not exist, so the child insert fails mid-transaction.
        let result = store
            .update_recipe(recipe.id, &draft("Brioche", &[(3, 2), (999, 1)]))
            .await;
        assert!(result.is_err());

        let unchanged = store.get_recipe(recipe.id).await.unwrap().unwrap();
        assert_eq!(unchanged.name, "Bread");

        let details = store.load_recipe_details(vec![unchanged], None).await.unwrap();
        let lines: Vec<(&str, i32)> = details[0]
            .ingredients
            .iter()
            .map(|i| (i.name.as_str(), i.amount))
            .collect();
        assert_eq!(lines, vec![("Flour", 500), ("Salt", 10)]);
        assert_eq!(details[0].tags.len(), 1);
        assert_eq!(details[0].tags[0].slug, "breakfast");
    }

    #[tokio::test]
    async fn duplicate_recipe_name_is_a_unique_violation() {
        let store = store().await;
        seed_catalog(&store).await;
        let author = user(&store, "cook").await;

        store
            .create_recipe(author.id, &draft("Bread", &[(1, 500)]))
            .await
            .unwrap();
        let other = store
            .create_recipe(author.id, &draft("Rolls", &[(1, 300)]))
            .await
            .unwrap();

        let err = store
            .create_recipe(author.id, &draft("Bread", &[(2, 5)]))
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));

        let err = store
            .update_recipe(other.id, &draft("Bread", &[(2, 5)]))
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));

        let err = store
            .update_recipe(other.id, &draft("Rolls", &[(999, 5)]))
            .await
            .unwrap_err();
        assert!(!is_unique_violation(&err));
    }

    #[tokio::test]
    async fn ingredient_search_treats_wildcards_literally() {
        let store = store().await;
        seed_catalog(&store).await;

        assert!(store.search_ingredients(Some("_")).await.unwrap().is_empty());
        assert!(store.search_ingredients(Some("%")).await.unwrap().is_empty());
        assert_eq!(store.search_ingredients(Some("SA")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn collections_report_duplicates_and_missing() {
        let store = store().await;
        seed_catalog(&store).await;
        let author = user(&store, "cook").await;
        let recipe = store
            .create_recipe(author.id, &draft("Bread", &[(1, 500)]))
            .await
            .unwrap();

        let fav = RecipeCollection::Favorites;
        assert!(store.add_to_collection(fav, author.id, recipe.id).await.unwrap());
        assert!(!store.add_to_collection(fav, author.id, recipe.id).await.unwrap());
        assert!(store.remove_from_collection(fav, author.id, recipe.id).await.unwrap());
        assert!(!store.remove_from_collection(fav, author.id, recipe.id).await.unwrap());
    }

    #[tokio::test]
    async fn shopping_list_sums_across_recipes() {
        let store = store().await;
        seed_catalog(&store).await;
        let author = user(&store, "cook").await;
        let buyer = user(&store, "buyer").await;

        let bread = store
            .create_recipe(author.id, &draft("Bread", &[(1, 500), (2, 10)]))
            .await
            .unwrap();
        let cake = store
            .create_recipe(author.id, &draft("Cake", &[(1, 250), (3, 4)]))
            .await
            .unwrap();

        let cart = RecipeCollection::ShoppingCart;
        store.add_to_collection(cart, buyer.id, bread.id).await.unwrap();
        store.add_to_collection(cart, buyer.id, cake.id).await.unwrap();

        let items = store.aggregate_shopping_list(buyer.id).await.unwrap();
        let lines: Vec<(&str, i64)> = items
            .iter()
            .map(|i| (i.name.as_str(), i.total_amount))
            .collect();
        assert_eq!(lines, vec![("Egg", 4), ("Flour", 750), ("Salt", 10)]);

        assert!(store.aggregate_shopping_list(author.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_recipe_clears_links() {
        let store = store().await;
        seed_catalog(&store).await;
        let author = user(&store, "cook").await;
        let recipe = store
            .create_recipe(author.id, &draft("Bread", &[(1, 500)]))
            .await
            .unwrap();
        store
            .add_to_collection(RecipeCollection::ShoppingCart, author.id, recipe.id)
            .await
            .unwrap();

        assert!(store.delete_recipe(recipe.id).await.unwrap());
        assert!(!store.delete_recipe(recipe.id).await.unwrap());
        assert_eq!(store.cart_size(author.id).await.unwrap(), 0);
    }
}
