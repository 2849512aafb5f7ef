//! Test utilities and fixtures for Vitrine integration tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use jwt_simple::algorithms::HS256Key;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

pub use vitrine::auth::issue_token;
pub use vitrine::config::StripeConfig;
pub use vitrine::db::{init_db, queries, AppState, DbPool};
pub use vitrine::email::EmailService;
pub use vitrine::models::*;
pub use vitrine::payments::StripeClient;

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const TEST_JWT_SECRET: &[u8] = b"test-jwt-secret";

/// Plan catalog with fixed Stripe price references (independent of env vars).
pub fn test_plan_seeds() -> Vec<PlanSeed> {
    vec![
        PlanSeed {
            name: "free",
            display_name: "Free",
            description: "Starter",
            price_cents: 0,
            stripe_price_id: None,
            max_products: 10,
            max_collections: 2,
            features: "[]",
            is_active: true,
        },
        PlanSeed {
            name: "basic",
            display_name: "Basic",
            description: "Small stores",
            price_cents: 4990,
            stripe_price_id: Some("price_test_basic".to_string()),
            max_products: 30,
            max_collections: 3,
            features: "[]",
            is_active: true,
        },
        PlanSeed {
            name: "enterprise",
            display_name: "Enterprise",
            description: "No limits",
            price_cents: 29900,
            stripe_price_id: Some("price_test_enterprise".to_string()),
            max_products: UNLIMITED,
            max_collections: UNLIMITED,
            features: "[]",
            is_active: true,
        },
    ]
}

/// Create an in-memory test database with schema and plan catalog in place.
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    queries::seed_plans(&conn, &test_plan_seeds()).expect("Failed to seed plans");
    conn
}

/// Pool backed by a single shared in-memory connection, so every checkout
/// from the pool sees the same database.
pub fn setup_test_pool() -> DbPool {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder()
        .max_size(1)
        .build(manager)
        .expect("Failed to build test pool");
    {
        let conn = pool.get().expect("Failed to get test connection");
        init_db(&conn).expect("Failed to initialize schema");
        queries::seed_plans(&conn, &test_plan_seeds()).expect("Failed to seed plans");
    }
    pool
}

/// Test state with a Stripe client pointed at an unreachable address, so any
/// accidental outbound API call fails fast instead of hitting the network.
pub fn test_state() -> AppState {
    let stripe = StripeClient::new(&StripeConfig {
        secret_key: "sk_test_xxx".to_string(),
        webhook_secret: Some(TEST_WEBHOOK_SECRET.to_string()),
    })
    .with_api_base("http://127.0.0.1:9");

    AppState {
        db: setup_test_pool(),
        stripe,
        jwt_key: HS256Key::from_bytes(TEST_JWT_SECRET),
        email: Arc::new(EmailService::new(None, "test@vitrine.local".to_string())),
        frontend_url: "https://frontend.test".to_string(),
    }
}

/// Full application router over the given state.
pub fn test_app(state: AppState) -> Router {
    Router::new()
        .merge(vitrine::handlers::public_router())
        .merge(vitrine::handlers::authed_router())
        .merge(vitrine::handlers::webhooks::router())
        .with_state(state)
}

pub fn create_test_user(conn: &Connection, email: &str, store_name: &str) -> User {
    let free = queries::get_free_plan(conn).expect("Free plan missing");
    queries::create_user(
        conn,
        &queries::NewUser {
            store_name,
            email,
            password_hash: "$argon2id$fake$hash",
            phone: "11987654321",
            plan_id: &free.id,
        },
    )
    .expect("Failed to create test user")
}

/// A user that looks like an active paying subscriber.
pub fn create_subscribed_user(conn: &Connection, email: &str, customer_id: &str) -> User {
    let user = create_test_user(conn, email, &format!("Store {}", customer_id));
    let basic = queries::get_plan_by_name(conn, "basic")
        .expect("query failed")
        .expect("basic plan missing");
    let expires = chrono::Utc::now().timestamp() + 30 * 86400;
    queries::apply_checkout_to_user(
        conn,
        &user.id,
        customer_id,
        Some(&format!("sub_{}", customer_id)),
        &basic.id,
        expires,
    )
    .expect("Failed to mark user subscribed");
    queries::get_user_by_id(conn, &user.id)
        .expect("query failed")
        .expect("user vanished")
}

/// Compute a valid Stripe signature header for a payload.
pub fn sign_stripe_payload(payload: &[u8]) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let timestamp = chrono::Utc::now().timestamp();
    let signed = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac = Hmac::<Sha256>::new_from_slice(TEST_WEBHOOK_SECRET.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(signed.as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}
