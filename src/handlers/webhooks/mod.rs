mod reconcile;
mod stripe;

pub use reconcile::*;

use axum::routing::post;
use axum::Router;

use crate::db::AppState;

pub fn router() -> Router<AppState> {
    // The body size cap lives in the handler itself, which reads the raw
    // body so signature verification sees the exact bytes.
    Router::new().route("/webhooks/stripe", post(stripe::handle_stripe_webhook))
}
