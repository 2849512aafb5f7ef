use axum::extract::State;
use serde::Deserialize;
use serde_json::json;

use crate::auth::AuthUser;
use crate::db::{queries, AppState};
use crate::error::{AppError, OptionExt, Result};
use crate::extractors::Json;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub plan_id: String,
}

/// Start a subscription checkout for a paid plan.
///
/// Creates the Stripe customer lazily on first use and persists the
/// reference before the session is created, so the later webhook can
/// correlate by customer even if this request's response is lost.
pub async fn create_checkout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(input): Json<CheckoutRequest>,
) -> Result<Json<serde_json::Value>> {
    let plan = {
        let conn = state.db.get()?;
        queries::get_plan_by_id(&conn, &input.plan_id)?.or_not_found("Plan not found")?
    };

    if !plan.is_active {
        return Err(AppError::NotFound("Plan not found".into()));
    }
    if !plan.is_subscribable() {
        return Err(AppError::BadRequest("This plan cannot be subscribed to".into()));
    }
    // Non-empty by the check above
    let price_id = plan.stripe_price_id.as_deref().unwrap_or_default();

    let customer_id = match user.stripe_customer_id {
        Some(ref id) => id.clone(),
        None => {
            let id = state
                .stripe
                .create_customer(&user.email, &user.store_name, &user.id)
                .await?;
            let conn = state.db.get()?;
            queries::set_stripe_customer_id(&conn, &user.id, &id)?;
            id
        }
    };

    let success_url = format!("{}/billing/success", state.frontend_url);
    let cancel_url = format!("{}/billing/canceled", state.frontend_url);

    let checkout_url = state
        .stripe
        .create_checkout_session(
            &customer_id,
            price_id,
            &user.id,
            &plan.id,
            &success_url,
            &cancel_url,
        )
        .await?;

    tracing::info!(user_id = %user.id, plan = %plan.name, "Checkout session created");

    Ok(Json(json!({ "checkout_url": checkout_url })))
}

/// Cancel the caller's subscription.
///
/// With a live Stripe subscription, the provider is told to cancel and the
/// local record is left alone - the customer.subscription.deleted webhook
/// performs the actual revert. Without one, the revert happens locally and
/// immediately, with no external call.
pub async fn cancel_subscription(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<serde_json::Value>> {
    match user.stripe_subscription_id {
        Some(ref subscription_id) => {
            state.stripe.cancel_subscription(subscription_id).await?;
            tracing::info!(user_id = %user.id, "Subscription cancellation requested");
            Ok(Json(json!({
                "immediate": false,
                "message": "Cancellation requested; your plan stays active until it is confirmed"
            })))
        }
        None => {
            let conn = state.db.get()?;
            let free = queries::get_free_plan(&conn)?;
            queries::revert_to_free_immediately(&conn, &user.id, &free.id)?;
            tracing::info!(user_id = %user.id, "Reverted to free plan (no live subscription)");
            Ok(Json(json!({ "immediate": true, "plan": free })))
        }
    }
}
