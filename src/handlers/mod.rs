pub mod auth;
pub mod billing;
pub mod catalog;
pub mod collections;
pub mod orders;
pub mod plans;
pub mod products;
pub mod users;
pub mod webhooks;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::db::AppState;

/// Public endpoints: account entry points and the shared catalog surface.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/plans", get(plans::list_plans))
        .route("/catalog/{share_token}", get(catalog::get_catalog))
        .route("/catalog/{share_token}/meta", get(catalog::catalog_meta_page))
        .route("/catalog/{share_token}/orders", post(orders::create_order))
        .route("/orders/{order_token}", get(orders::get_order))
}

/// Authenticated endpoints. Each handler takes the `AuthUser` extractor, so
/// no auth middleware layer is needed here.
pub fn authed_router() -> Router<AppState> {
    Router::new()
        .route("/me", get(users::get_me))
        .route("/me", put(users::update_me))
        .route("/me/password", put(users::change_password))
        .route("/me/plan", get(plans::my_plan))
        .route("/products", post(products::create_product))
        .route("/products", get(products::list_products))
        .route("/products/{id}", get(products::get_product))
        .route("/products/{id}", put(products::update_product))
        .route("/products/{id}", delete(products::delete_product))
        .route("/collections", post(collections::create_collection))
        .route("/collections", get(collections::list_collections))
        .route("/collections/{id}", get(collections::get_collection))
        .route("/collections/{id}", put(collections::update_collection))
        .route("/collections/{id}", delete(collections::delete_collection))
        .route("/billing/checkout", post(billing::create_checkout))
        .route("/billing/cancel", post(billing::cancel_subscription))
}
