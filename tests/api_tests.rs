mod common;

use axum::http::{Method, StatusCode, header};
use common::{DEFAULT_API_KEY, SALT, spawn_app};
use serde_json::json;

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;

    let response = app.get("/api/health", None).await;
    assert_eq!(response.status, StatusCode::OK);

    let json = response.json();
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["database"], "ok");
}

#[tokio::test]
async fn test_anonymous_reads_are_allowed() {
    let app = spawn_app().await;
    app.seed_catalog().await;

    for uri in ["/api/recipes", "/api/tags", "/api/ingredients", "/api/users"] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status, StatusCode::OK, "GET {uri}: {}", response.text);
    }
}

#[tokio::test]
async fn test_writes_require_identity() {
    let app = spawn_app().await;

    let response = app.post("/api/recipes", None, json!({})).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json()["success"], false);

    let response = app.get("/api/users/me", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app.get("/api/recipes/download_shopping_cart", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_api_key_is_rejected() {
    let app = spawn_app().await;

    let response = app.get("/api/recipes", Some("not-a-real-key")).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_seeded_admin_key() {
    let app = spawn_app().await;

    let response = app.get("/api/users/me", Some(DEFAULT_API_KEY)).await;
    assert_eq!(response.status, StatusCode::OK);

    let json = response.json();
    assert_eq!(json["data"]["username"], "admin");
    assert_eq!(json["data"]["is_subscribed"], false);
}

#[tokio::test]
async fn test_register_and_fetch_profile() {
    let app = spawn_app().await;
    let (id, api_key) = app.register("alice").await;

    let response = app.get("/api/users/me", Some(&api_key)).await;
    assert_eq!(response.status, StatusCode::OK);
    let json = response.json();
    assert_eq!(json["data"]["id"], id);
    assert_eq!(json["data"]["email"], "alice@example.com");
    assert!(json["data"].get("password").is_none());

    let response = app.get(&format!("/api/users/{id}"), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["data"]["username"], "alice");

    let response = app.get("/api/users/9999", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_register_rejects_taken_identity() {
    let app = spawn_app().await;
    app.register("alice").await;

    let response = app
        .post(
            "/api/users",
            None,
            json!({
                "email": "other@example.com",
                "username": "alice",
                "first_name": "A",
                "last_name": "B",
                "password": "very-secret-password",
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["field"], "username");

    let response = app
        .post(
            "/api/users",
            None,
            json!({
                "email": "alice@example.com",
                "username": "alice2",
                "first_name": "A",
                "last_name": "B",
                "password": "very-secret-password",
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["field"], "email");
}

#[tokio::test]
async fn test_register_validates_fields() {
    let app = spawn_app().await;

    let response = app
        .post(
            "/api/users",
            None,
            json!({
                "email": "bob@example.com",
                "username": "bob",
                "first_name": "Bob",
                "last_name": "Cook",
                "password": "short",
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["field"], "password");

    let response = app
        .post(
            "/api/users",
            None,
            json!({
                "email": "bob@example.com",
                "username": "bob with spaces",
                "first_name": "Bob",
                "last_name": "Cook",
                "password": "very-secret-password",
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["field"], "username");

    let response = app
        .post(
            "/api/users",
            None,
            json!({
                "email": "not-an-email",
                "username": "bob",
                "first_name": "Bob",
                "last_name": "Cook",
                "password": "very-secret-password",
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["field"], "email");
}

#[tokio::test]
async fn test_set_password() {
    let app = spawn_app().await;
    let (_, api_key) = app.register("alice").await;

    let response = app
        .post(
            "/api/users/set_password",
            Some(&api_key),
            json!({"current_password": "wrong-password", "new_password": "another-secret"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["field"], "current_password");

    let response = app
        .post(
            "/api/users/set_password",
            Some(&api_key),
            json!({"current_password": "very-secret-password", "new_password": "another-secret"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text);

    let response = app
        .post(
            "/api/auth/login",
            None,
            json!({"email": "alice@example.com", "password": "another-secret"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_session_authenticates_requests() {
    let app = spawn_app().await;
    let (id, api_key) = app.register("alice").await;

    let response = app
        .post(
            "/api/auth/login",
            None,
            json!({"email": "alice@example.com", "password": "nope-nope-nope"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app
        .post(
            "/api/auth/login",
            None,
            json!({"email": "alice@example.com", "password": "very-secret-password"}),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["data"]["api_key"], api_key);

    let cookie = response
        .headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .expect("login sets a session cookie")
        .to_string();

    let request = axum::http::Request::builder()
        .method(Method::GET)
        .uri("/api/users/me")
        .header(header::COOKIE, cookie)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = http_body_util::BodyExt::collect(response.into_body())
        .await
        .unwrap()
        .to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["data"]["id"], id);
}

#[tokio::test]
async fn test_tags_and_ingredients() {
    let app = spawn_app().await;
    app.seed_catalog().await;

    let response = app.get("/api/tags", None).await;
    let tags = response.json()["data"].as_array().unwrap().clone();
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0]["slug"], "breakfast");
    assert_eq!(tags[0]["color"], "#E26C2D");

    let response = app.get("/api/tags/2", None).await;
    assert_eq!(response.json()["data"]["name"], "Dinner");

    let response = app.get("/api/tags/42", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.get("/api/ingredients?search=sa", None).await;
    let found = response.json()["data"].as_array().unwrap().clone();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["name"], "Salt");
    assert_eq!(found[0]["measurement_unit"], "g");

    let response = app.get(&format!("/api/ingredients/{SALT}"), None).await;
    assert_eq!(response.json()["data"]["name"], "Salt");

    let response = app.get("/api/ingredients/0", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_subscribe_lifecycle() {
    let app = spawn_app().await;
    app.seed_catalog().await;
    let (alice, alice_key) = app.register("alice").await;
    let (bob, bob_key) = app.register("bob").await;

    for name in ["Pancakes", "Omelette", "Porridge"] {
        app.create_recipe(&bob_key, name, &[(common::EGG, 2)], &[common::BREAKFAST])
            .await;
    }

    let uri = format!("/api/users/{alice}/subscribe");
    let response = app.post_empty(&uri, Some(&alice_key)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/users/{bob}/subscribe?recipes_limit=2");
    let response = app.post_empty(&uri, Some(&alice_key)).await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
    let json = response.json();
    assert_eq!(json["data"]["is_subscribed"], true);
    assert_eq!(json["data"]["recipes_count"], 3);
    assert_eq!(json["data"]["recipes"].as_array().unwrap().len(), 2);

    let response = app.post_empty(&uri, Some(&alice_key)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.get(&format!("/api/users/{bob}"), Some(&alice_key)).await;
    assert_eq!(response.json()["data"]["is_subscribed"], true);

    let response = app
        .get("/api/users/subscriptions?recipes_limit=1", Some(&alice_key))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let json = response.json();
    assert_eq!(json["data"]["count"], 1);
    assert_eq!(json["data"]["results"][0]["username"], "bob");
    assert_eq!(
        json["data"]["results"][0]["recipes"].as_array().unwrap().len(),
        1
    );

    let uri = format!("/api/users/{bob}/subscribe");
    let response = app.delete(&uri, Some(&alice_key)).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app.delete(&uri, Some(&alice_key)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.post_empty("/api/users/9999/subscribe", Some(&alice_key)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_bodies_are_bad_requests() {
    let app = spawn_app().await;

    let response = app
        .post("/api/users", None, json!({"email": 42, "username": ["bob"]}))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["success"], false);

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from("{\"email\": "))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ingredient_search_matches_wildcards_literally() {
    let app = spawn_app().await;
    app.seed_catalog().await;

    for search in ["_", "%25", "%5C"] {
        let response = app.get(&format!("/api/ingredients?search={search}"), None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.json()["data"].as_array().unwrap().is_empty(), "{search}");
    }

    let response = app.get("/api/ingredients?search=FL", None).await;
    assert_eq!(response.json()["data"][0]["name"], "Flour");
}
