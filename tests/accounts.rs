//! Account lifecycle tests: registration, login, and quota enforcement
//! through the HTTP surface.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::*;
use tower::ServiceExt;

async fn send(
    app: axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn register_body(email: &str, store: &str) -> serde_json::Value {
    serde_json::json!({
        "store_name": store,
        "email": email,
        "password": "hunter22",
        "phone": "(11) 98765-4321",
    })
}

#[tokio::test]
async fn register_login_and_fetch_profile() {
    let state = test_state();

    let (status, body) = send(
        test_app(state.clone()),
        "POST",
        "/auth/register",
        None,
        Some(register_body("shop@example.com", "My Shop")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());
    assert_eq!(body["user"]["email"], "shop@example.com");
    // New accounts start with no subscription
    assert_eq!(body["user"]["subscription_status"], "none");
    // Sensitive fields never serialize
    assert!(body["user"].get("password_hash").is_none());

    let (status, login) = send(
        test_app(state.clone()),
        "POST",
        "/auth/login",
        None,
        Some(serde_json::json!({ "email": "shop@example.com", "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = login["token"].as_str().unwrap().to_string();

    let (status, me) = send(test_app(state), "GET", "/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["store_name"], "My Shop");
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let state = test_state();

    let (status, _) = send(
        test_app(state.clone()),
        "POST",
        "/auth/register",
        None,
        Some(register_body("shop@example.com", "Shop One")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        test_app(state),
        "POST",
        "/auth/register",
        None,
        Some(register_body("shop@example.com", "Shop Two")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let state = test_state();
    send(
        test_app(state.clone()),
        "POST",
        "/auth/register",
        None,
        Some(register_body("shop@example.com", "My Shop")),
    )
    .await;

    let (status, _) = send(
        test_app(state),
        "POST",
        "/auth/login",
        None,
        Some(serde_json::json!({ "email": "shop@example.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unauthenticated_requests_are_rejected() {
    let state = test_state();
    let (status, _) = send(test_app(state), "GET", "/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn product_creation_is_denied_at_quota() {
    let state = test_state();
    let user = {
        let conn = state.db.get().unwrap();
        let user = create_test_user(&conn, "a@example.com", "Store A");
        for i in 0..10 {
            queries::create_product(
                &conn,
                &user.id,
                &CreateProduct {
                    name: format!("P{}", i),
                    description: None,
                    price_cents: 1000,
                    collection_id: None,
                    image_url: None,
                },
            )
            .unwrap();
        }
        user
    };
    let token = issue_token(&state.jwt_key, &user.id).unwrap();

    let (status, body) = send(
        test_app(state),
        "POST",
        "/products",
        Some(&token),
        Some(serde_json::json!({ "name": "One too many", "price_cents": 500 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["details"].as_str().unwrap().contains("10 products"));
}

#[tokio::test]
async fn plan_info_reports_live_usage() {
    let state = test_state();
    let user = {
        let conn = state.db.get().unwrap();
        let user = create_test_user(&conn, "a@example.com", "Store A");
        queries::create_collection(
            &conn,
            &user.id,
            &CreateCollection {
                name: "Catalog".to_string(),
                description: None,
            },
        )
        .unwrap();
        user
    };
    let token = issue_token(&state.jwt_key, &user.id).unwrap();

    let (status, info) = send(test_app(state), "GET", "/me/plan", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["plan"]["name"], "free");
    assert_eq!(info["collection_count"], 1);
    assert_eq!(info["product_count"], 0);
    assert_eq!(info["can_create_collection"], true);
    assert_eq!(info["can_create_product"], true);
}
