#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
};
use foodgram::api::AppState;
use foodgram::config::Config;
use foodgram::services::catalog_service::{IngredientRecord, TagRecord};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

pub use foodgram::db::migrator::DEFAULT_API_KEY;

pub const FLOUR: i64 = 1;
pub const SALT: i64 = 2;
pub const EGG: i64 = 3;

pub const BREAKFAST: i64 = 1;
pub const DINNER: i64 = 2;

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

pub async fn spawn_app() -> TestApp {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.server.secure_cookies = false;

    let state = foodgram::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    let router = foodgram::api::router(state.clone()).await;

    TestApp { router, state }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub text: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text).unwrap_or(Value::Null)
    }
}

impl TestApp {
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        api_key: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = api_key {
            builder = builder.header("Authorization", format!("Token {key}"));
        }

        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        TestResponse {
            status,
            headers,
            text: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&self, uri: &str, api_key: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, api_key, None).await
    }

    pub async fn post(&self, uri: &str, api_key: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::POST, uri, api_key, Some(body)).await
    }

    pub async fn post_empty(&self, uri: &str, api_key: Option<&str>) -> TestResponse {
        self.send(Method::POST, uri, api_key, None).await
    }

    pub async fn patch(&self, uri: &str, api_key: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::PATCH, uri, api_key, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, api_key: Option<&str>) -> TestResponse {
        self.send(Method::DELETE, uri, api_key, None).await
    }

    /// Registers `username` and returns (id, api_key).
    pub async fn register(&self, username: &str) -> (i64, String) {
        let response = self
            .post(
                "/api/users",
                None,
                json!({
                    "email": format!("{username}@example.com"),
                    "username": username,
                    "first_name": "Test",
                    "last_name": "Cook",
                    "password": "very-secret-password",
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);

        let json = response.json();
        (
            json["data"]["id"].as_i64().unwrap(),
            json["data"]["api_key"].as_str().unwrap().to_string(),
        )
    }

    /// Ingredients Flour (g), Salt (g), Egg (pcs); tags breakfast, dinner.
    pub async fn seed_catalog(&self) {
        let ingredients = [("Flour", "g"), ("Salt", "g"), ("Egg", "pcs")]
            .into_iter()
            .map(|(name, unit)| IngredientRecord {
                name: name.to_string(),
                measurement_unit: unit.to_string(),
            })
            .collect();
        self.state
            .catalog_service()
            .import_ingredients(ingredients)
            .await
            .unwrap();

        let tags = vec![
            TagRecord {
                name: "Breakfast".to_string(),
                color: "#E26C2D".to_string(),
                slug: "breakfast".to_string(),
            },
            TagRecord {
                name: "Dinner".to_string(),
                color: "#49B64E".to_string(),
                slug: "dinner".to_string(),
            },
        ];
        self.state.catalog_service().import_tags(tags).await.unwrap();
    }

    /// Creates a recipe and returns its id.
    pub async fn create_recipe(
        &self,
        api_key: &str,
        name: &str,
        ingredients: &[(i64, i64)],
        tags: &[i64],
    ) -> i64 {
        let response = self
            .post("/api/recipes", Some(api_key), recipe_body(name, ingredients, tags))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
        response.json()["data"]["id"].as_i64().unwrap()
    }
}

pub fn recipe_body(name: &str, ingredients: &[(i64, i64)], tags: &[i64]) -> Value {
    json!({
        "ingredients": ingredients
            .iter()
            .map(|(id, amount)| json!({"id": id, "amount": amount}))
            .collect::<Vec<_>>(),
        "tags": tags,
        "image": "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==",
        "name": name,
        "text": "Mix everything and bake.",
        "cooking_time": 30,
    })
}
