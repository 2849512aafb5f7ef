//! Webhook endpoint tests: signature gate, acknowledgment contract, and
//! body size limit.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::*;
use tower::ServiceExt;

async fn post_webhook(
    app: axum::Router,
    payload: &[u8],
    signature: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhooks/stripe")
        .header("content-type", "application/json");
    if let Some(sig) = signature {
        builder = builder.header("stripe-signature", sig);
    }
    let request = builder.body(Body::from(payload.to_vec())).unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn missing_signature_is_rejected() {
    let state = test_state();
    let app = test_app(state);

    let (status, _) = post_webhook(app, b"{}", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_signature_is_rejected_and_nothing_changes() {
    let state = test_state();
    let user = {
        let conn = state.db.get().unwrap();
        create_subscribed_user(&conn, "a@example.com", "cus_1")
    };
    let app = test_app(state.clone());

    let payload = serde_json::json!({
        "type": "customer.subscription.deleted",
        "data": { "object": { "customer": "cus_1", "status": "canceled" } }
    })
    .to_string();

    let (status, _) =
        post_webhook(app, payload.as_bytes(), Some("t=1,v1=deadbeef")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let conn = state.db.get().unwrap();
    let reloaded = queries::get_user_by_id(&conn, &user.id).unwrap().unwrap();
    assert_eq!(reloaded.subscription_status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn valid_signature_processes_event() {
    let state = test_state();
    let user = {
        let conn = state.db.get().unwrap();
        create_subscribed_user(&conn, "a@example.com", "cus_1")
    };
    let app = test_app(state.clone());

    let payload = serde_json::json!({
        "type": "customer.subscription.deleted",
        "data": { "object": { "customer": "cus_1", "status": "canceled" } }
    })
    .to_string();
    let sig = sign_stripe_payload(payload.as_bytes());

    let (status, body) = post_webhook(app, payload.as_bytes(), Some(&sig)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);

    let conn = state.db.get().unwrap();
    let reloaded = queries::get_user_by_id(&conn, &user.id).unwrap().unwrap();
    assert_eq!(reloaded.subscription_status, SubscriptionStatus::Canceled);
    assert!(reloaded.stripe_subscription_id.is_none());
}

#[tokio::test]
async fn unrecognized_event_type_is_acknowledged() {
    let state = test_state();
    let app = test_app(state);

    let payload = serde_json::json!({
        "type": "payment_method.attached",
        "data": { "object": {} }
    })
    .to_string();
    let sig = sign_stripe_payload(payload.as_bytes());

    let (status, body) = post_webhook(app, payload.as_bytes(), Some(&sig)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
}

#[tokio::test]
async fn unparseable_payload_with_valid_signature_is_acknowledged() {
    let state = test_state();
    let app = test_app(state);

    let payload = b"this is not json";
    let sig = sign_stripe_payload(payload);

    let (status, body) = post_webhook(app, payload, Some(&sig)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
}

#[tokio::test]
async fn missing_webhook_secret_fails_closed() {
    let mut state = test_state();
    state.stripe = StripeClient::new(&StripeConfig {
        secret_key: "sk_test_xxx".to_string(),
        webhook_secret: None,
    });
    let app = test_app(state);

    let payload = b"{}";
    // Even a signature computed with the usual test secret must be rejected
    let sig = sign_stripe_payload(payload);
    let (status, _) = post_webhook(app, payload, Some(&sig)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_body_answers_service_unavailable() {
    let state = test_state();
    let app = test_app(state);

    // 65 KiB, past the 64 KiB cap: the body read fails before the
    // signature gate, so even a valid signature doesn't matter.
    let payload = vec![b'x'; 65 * 1024];
    let sig = sign_stripe_payload(&payload);

    let (status, _) = post_webhook(app, &payload, Some(&sig)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn body_at_the_cap_is_still_verified() {
    // Exactly at the limit must pass the read and reach the signature gate.
    let state = test_state();
    let app = test_app(state);

    let payload = vec![b'x'; 64 * 1024];
    let sig = sign_stripe_payload(&payload);

    let (status, body) = post_webhook(app, &payload, Some(&sig)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
}

#[tokio::test]
async fn dispute_with_failed_charge_lookup_is_still_acknowledged() {
    // The test Stripe client points at an unreachable address, so the
    // charge-to-customer lookup fails. The event must be abandoned but acked.
    let state = test_state();
    let user = {
        let conn = state.db.get().unwrap();
        create_subscribed_user(&conn, "a@example.com", "cus_1")
    };
    let app = test_app(state.clone());

    let payload = serde_json::json!({
        "type": "charge.dispute.created",
        "data": { "object": { "charge": "ch_123" } }
    })
    .to_string();
    let sig = sign_stripe_payload(payload.as_bytes());

    let (status, body) = post_webhook(app, payload.as_bytes(), Some(&sig)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);

    // Lookup failed, so no state was changed
    let conn = state.db.get().unwrap();
    let reloaded = queries::get_user_by_id(&conn, &user.id).unwrap().unwrap();
    assert_eq!(reloaded.subscription_status, SubscriptionStatus::Active);
}
