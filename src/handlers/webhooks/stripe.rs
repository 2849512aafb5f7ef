use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::db::AppState;
use crate::payments::{
    CheckoutSessionObject, DisputeObject, InvoiceObject, StripeEvent, StripeEventKind,
    SubscriptionObject, WEBHOOK_BODY_LIMIT,
};

use super::reconcile;

/// Axum handler for Stripe webhooks.
///
/// The raw body is read here with a 64 KiB cap; an oversized or failed read
/// answers 503 before anything else runs. Authentication is strict: a
/// missing, malformed, or invalid signature gets a 400 and nothing is
/// processed. Past that gate the handler fails open - unparseable payloads,
/// unrecognized event types, and per-event processing errors are logged and
/// acknowledged with 200, because a retry would deliver the same payload
/// and fail the same way.
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    request: Request,
) -> Response {
    let (parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, WEBHOOK_BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to read Stripe webhook body: {}", e);
            return (StatusCode::SERVICE_UNAVAILABLE, "Failed to read body").into_response();
        }
    };

    let signature = match parts
        .headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    {
        Some(s) => s,
        None => {
            tracing::warn!("Stripe webhook without signature header");
            return (StatusCode::BAD_REQUEST, "Missing stripe-signature header").into_response();
        }
    };

    match state.stripe.verify_webhook_signature(&body, signature) {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!("Stripe webhook signature verification failed");
            return (StatusCode::BAD_REQUEST, "Invalid signature").into_response();
        }
        Err(e) => {
            tracing::warn!("Stripe webhook signature malformed: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid signature").into_response();
        }
    }

    if let Err(e) = process_event(&state, &body).await {
        // Acknowledged anyway; see the fail-open contract above.
        tracing::error!("Stripe webhook processing failed: {}", e);
    }

    Json(json!({ "received": true })).into_response()
}

async fn process_event(state: &AppState, body: &[u8]) -> crate::error::Result<()> {
    let event: StripeEvent = match serde_json::from_slice(body) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!("Unparseable Stripe webhook payload: {}", e);
            return Ok(());
        }
    };

    tracing::debug!("Stripe event received: {}", event.event_type);

    match event.kind() {
        StripeEventKind::CheckoutSessionCompleted => {
            let session: CheckoutSessionObject = serde_json::from_value(event.data.object)?;
            let conn = state.db.get()?;
            reconcile::apply_checkout_completed(&conn, &session)
        }
        StripeEventKind::InvoicePaymentSucceeded => {
            let invoice: InvoiceObject = serde_json::from_value(event.data.object)?;
            let conn = state.db.get()?;
            reconcile::apply_invoice_payment_succeeded(&conn, &invoice)
        }
        StripeEventKind::InvoicePaymentFailed => {
            let invoice: InvoiceObject = serde_json::from_value(event.data.object)?;
            let conn = state.db.get()?;
            reconcile::apply_invoice_payment_failed(&conn, &invoice)
        }
        StripeEventKind::SubscriptionUpdated => {
            let sub: SubscriptionObject = serde_json::from_value(event.data.object)?;
            let conn = state.db.get()?;
            reconcile::apply_subscription_updated(&conn, &sub)
        }
        StripeEventKind::SubscriptionDeleted => {
            let sub: SubscriptionObject = serde_json::from_value(event.data.object)?;
            let conn = state.db.get()?;
            reconcile::apply_subscription_deleted(&conn, &sub)
        }
        StripeEventKind::DisputeCreated => {
            let dispute: DisputeObject = serde_json::from_value(event.data.object)?;
            handle_dispute(state, &dispute).await
        }
        StripeEventKind::Unrecognized => {
            tracing::debug!("Ignoring Stripe event type: {}", event.event_type);
            Ok(())
        }
    }
}

/// Disputes only carry a charge reference, so the customer has to be looked
/// up via the provider API before the revert can run. If that lookup fails
/// the event is abandoned (and still acknowledged by the caller).
async fn handle_dispute(state: &AppState, dispute: &DisputeObject) -> crate::error::Result<()> {
    let Some(charge_id) = &dispute.charge else {
        tracing::warn!("charge.dispute.created without a charge reference, dropping");
        return Ok(());
    };

    let customer_id = match state.stripe.get_charge_customer(charge_id).await {
        Ok(Some(id)) => id,
        Ok(None) => {
            tracing::warn!(charge = %charge_id, "Disputed charge has no customer, dropping");
            return Ok(());
        }
        Err(e) => {
            tracing::error!(charge = %charge_id, "Failed to resolve disputed charge: {}", e);
            return Ok(());
        }
    };

    let conn = state.db.get()?;
    reconcile::apply_dispute_for_customer(&conn, &customer_id)
}
