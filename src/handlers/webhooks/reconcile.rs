//! Subscription state reconciliation.
//!
//! Each function applies one provider event to local records. They are
//! synchronous and take a plain connection, so the state machine can be
//! tested without HTTP or a running provider.
//!
//! Shared contract: a failure here never bubbles into the webhook response.
//! Events referencing unknown users or customers are logged and dropped -
//! the provider has nothing useful to do with an error for those.

use rusqlite::Connection;

use crate::db::queries;
use crate::error::Result;
use crate::models::SubscriptionStatus;
use crate::payments::{CheckoutSessionObject, InvoiceObject, SubscriptionObject};

/// checkout.session.completed: correlate by metadata, activate the plan.
///
/// Sessions created by this service always carry user_id and plan_id in
/// metadata; a session without them is foreign traffic and is dropped.
pub fn apply_checkout_completed(conn: &Connection, session: &CheckoutSessionObject) -> Result<()> {
    let (Some(user_id), Some(plan_id)) =
        (&session.metadata.user_id, &session.metadata.plan_id)
    else {
        tracing::warn!("checkout.session.completed without correlation metadata, dropping");
        return Ok(());
    };

    let Some(customer_id) = &session.customer else {
        tracing::warn!("checkout.session.completed without a customer, dropping");
        return Ok(());
    };

    // Unknown plan: the session references a plan this deployment doesn't
    // have (e.g. stale metadata after a catalog change). Drop, don't guess.
    if queries::get_plan_by_id(conn, plan_id)?.is_none() {
        tracing::warn!(plan_id = %plan_id, "checkout completed for unknown plan, dropping");
        return Ok(());
    }

    let expires_at = queries::plan_expiry_from_now();
    let updated = queries::apply_checkout_to_user(
        conn,
        user_id,
        customer_id,
        session.subscription.as_deref(),
        plan_id,
        expires_at,
    )?;

    if updated {
        tracing::info!(user_id = %user_id, plan_id = %plan_id, "Subscription activated via checkout");
    } else {
        tracing::warn!(user_id = %user_id, "checkout completed for unknown user, dropping");
    }
    Ok(())
}

/// invoice.payment_succeeded: renew the expiry horizon.
///
/// Invoices without a subscription reference (one-off charges) are ignored.
/// The expiry is recomputed from now, not extended, so replayed or
/// out-of-order deliveries converge on the same value.
pub fn apply_invoice_payment_succeeded(conn: &Connection, invoice: &InvoiceObject) -> Result<()> {
    if invoice.subscription.is_none() {
        tracing::debug!("invoice.payment_succeeded without subscription reference, ignoring");
        return Ok(());
    }

    let Some(customer_id) = &invoice.customer else {
        tracing::warn!("invoice.payment_succeeded without a customer, dropping");
        return Ok(());
    };

    let expires_at = queries::plan_expiry_from_now();
    if queries::activate_subscription_by_customer(conn, customer_id, expires_at)? {
        tracing::info!(customer = %customer_id, "Subscription renewed");
    } else {
        tracing::warn!(customer = %customer_id, "Payment succeeded for unknown customer");
    }
    Ok(())
}

/// invoice.payment_failed: mark past_due and nothing else. The plan and
/// expiry stay put - the grace period ends only when the provider sends
/// customer.subscription.deleted.
pub fn apply_invoice_payment_failed(conn: &Connection, invoice: &InvoiceObject) -> Result<()> {
    let Some(customer_id) = &invoice.customer else {
        tracing::warn!("invoice.payment_failed without a customer, dropping");
        return Ok(());
    };

    if queries::set_subscription_status_by_customer(
        conn,
        customer_id,
        &SubscriptionStatus::PastDue,
    )? {
        tracing::info!(customer = %customer_id, "Subscription marked past_due");
    } else {
        tracing::warn!(customer = %customer_id, "Payment failed for unknown customer");
    }
    Ok(())
}

/// customer.subscription.updated: store the provider-reported status
/// verbatim. No interpretation, no field changes beyond the status.
pub fn apply_subscription_updated(conn: &Connection, sub: &SubscriptionObject) -> Result<()> {
    let Some(customer_id) = &sub.customer else {
        tracing::warn!("customer.subscription.updated without a customer, dropping");
        return Ok(());
    };
    let Some(status) = &sub.status else {
        tracing::warn!("customer.subscription.updated without a status, dropping");
        return Ok(());
    };

    let status = SubscriptionStatus::from(status.as_str());
    if queries::set_subscription_status_by_customer(conn, customer_id, &status)? {
        tracing::info!(customer = %customer_id, status = %status, "Subscription status updated");
    } else {
        tracing::warn!(customer = %customer_id, "Status update for unknown customer");
    }
    Ok(())
}

/// customer.subscription.deleted: the subscription is gone, revert to free.
/// Idempotent - a replay rewrites the same terminal state.
pub fn apply_subscription_deleted(conn: &Connection, sub: &SubscriptionObject) -> Result<()> {
    let Some(customer_id) = &sub.customer else {
        tracing::warn!("customer.subscription.deleted without a customer, dropping");
        return Ok(());
    };

    let free = queries::get_free_plan(conn)?;
    if queries::revert_to_free_by_customer(conn, customer_id, &free.id)? {
        tracing::info!(customer = %customer_id, "Subscription deleted, reverted to free plan");
    } else {
        tracing::warn!(customer = %customer_id, "Subscription deleted for unknown customer");
    }
    Ok(())
}

/// charge.dispute.created: treat a chargeback like a deletion and revert the
/// disputed customer to free. The caller resolves the charge to a customer
/// first (that needs a provider API call).
pub fn apply_dispute_for_customer(conn: &Connection, customer_id: &str) -> Result<()> {
    let free = queries::get_free_plan(conn)?;
    if queries::revert_to_free_by_customer(conn, customer_id, &free.id)? {
        tracing::warn!(customer = %customer_id, "Chargeback received, reverted to free plan");
    } else {
        tracing::warn!(customer = %customer_id, "Chargeback for unknown customer");
    }
    Ok(())
}
