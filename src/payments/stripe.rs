use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::StripeConfig;
use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

const STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Maximum accepted webhook body size. Anything larger is rejected before
/// signature verification even runs.
pub const WEBHOOK_BODY_LIMIT: usize = 64 * 1024;

// Note: checkout sessions always reference pre-configured Stripe prices
// (plan.stripe_price_id), never ad-hoc price_data. This keeps all plans
// organized in the Stripe dashboard.

#[derive(Debug, Deserialize)]
struct CreateCustomerResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CreateCheckoutSessionResponse {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChargeResponse {
    customer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    api_base: String,
    secret_key: String,
    webhook_secret: Option<String>,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            client: Client::new(),
            api_base: STRIPE_API_BASE.to_string(),
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
        }
    }

    /// Point API calls at a different base URL (mock servers in tests).
    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::External(format!(
                "Stripe API error ({}): {}",
                status, error_text
            )));
        }
        Ok(response)
    }

    /// Create a Stripe customer for a user. Called lazily the first time a
    /// user starts a checkout.
    pub async fn create_customer(&self, email: &str, name: &str, user_id: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/v1/customers", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[
                ("email", email),
                ("name", name),
                ("metadata[user_id]", user_id),
            ])
            .send()
            .await
            .map_err(|e| AppError::External(format!("Stripe API error: {}", e)))?;

        let customer: CreateCustomerResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::External(format!("Failed to parse Stripe response: {}", e)))?;

        Ok(customer.id)
    }

    /// Create a subscription-mode checkout session and return its redirect URL.
    ///
    /// `user_id` and `plan_id` travel in session metadata; the reconciler
    /// reads them back from checkout.session.completed to correlate the
    /// session with local records.
    pub async fn create_checkout_session(
        &self,
        customer_id: &str,
        price_id: &str,
        user_id: &str,
        plan_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[
                ("mode", "subscription"),
                ("customer", customer_id),
                ("success_url", success_url),
                ("cancel_url", cancel_url),
                ("line_items[0][price]", price_id),
                ("line_items[0][quantity]", "1"),
                ("metadata[user_id]", user_id),
                ("metadata[plan_id]", plan_id),
            ])
            .send()
            .await
            .map_err(|e| AppError::External(format!("Stripe API error: {}", e)))?;

        let session: CreateCheckoutSessionResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::External(format!("Failed to parse Stripe response: {}", e)))?;

        Ok(session.url)
    }

    /// Cancel a subscription at the provider. The local record is not touched
    /// here - the customer.subscription.deleted webhook does that.
    pub async fn cancel_subscription(&self, subscription_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(format!(
                "{}/v1/subscriptions/{}",
                self.api_base, subscription_id
            ))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| AppError::External(format!("Stripe API error: {}", e)))?;

        Self::check(response).await?;
        Ok(())
    }

    /// Look up the customer behind a charge. Used by dispute handling, where
    /// the event only carries a charge reference.
    pub async fn get_charge_customer(&self, charge_id: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(format!("{}/v1/charges/{}", self.api_base, charge_id))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| AppError::External(format!("Stripe API error: {}", e)))?;

        let charge: ChargeResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::External(format!("Failed to parse Stripe response: {}", e)))?;

        Ok(charge.customer)
    }

    /// Maximum age of a webhook timestamp before it's rejected (in seconds).
    /// Stripe recommends 300 seconds (5 minutes).
    const WEBHOOK_TIMESTAMP_TOLERANCE_SECS: i64 = 300;

    /// Verify a Stripe webhook signature over the raw request body.
    ///
    /// Fails closed: when no webhook secret is configured, every request is
    /// rejected rather than waved through.
    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<bool> {
        let secret = match &self.webhook_secret {
            Some(s) => s,
            None => {
                tracing::error!("Stripe webhook received but no webhook secret is configured");
                return Ok(false);
            }
        };

        // Stripe signature format: t=timestamp,v1=signature
        let mut timestamp = None;
        let mut sig_v1 = None;

        for part in signature.split(',') {
            if let Some(t) = part.strip_prefix("t=") {
                timestamp = Some(t);
            } else if let Some(s) = part.strip_prefix("v1=") {
                sig_v1 = Some(s);
            }
        }

        let timestamp_str =
            timestamp.ok_or_else(|| AppError::BadRequest("Invalid signature format".into()))?;
        let sig_v1 =
            sig_v1.ok_or_else(|| AppError::BadRequest("Invalid signature format".into()))?;

        // Parse and validate the timestamp to prevent replay attacks.
        let timestamp: i64 = timestamp_str
            .parse()
            .map_err(|_| AppError::BadRequest("Invalid timestamp in signature".into()))?;

        let now = chrono::Utc::now().timestamp();
        let age = now - timestamp;

        if age > Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS {
            tracing::warn!(
                "Stripe webhook rejected: timestamp too old (age={}s, max={}s)",
                age,
                Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS
            );
            return Ok(false);
        }

        // Also reject timestamps from the future (clock skew tolerance: 60 seconds)
        if age < -60 {
            tracing::warn!(
                "Stripe webhook rejected: timestamp in the future (age={}s)",
                age
            );
            return Ok(false);
        }

        let signed_payload = format!("{}.{}", timestamp_str, String::from_utf8_lossy(payload));

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| AppError::Internal("Invalid webhook secret".into()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        // Constant-time comparison. Length is not secret (always 64 hex chars
        // for SHA-256), so the length check alone is fine to short-circuit.
        let expected_bytes = expected.as_bytes();
        let provided_bytes = sig_v1.as_bytes();

        if expected_bytes.len() != provided_bytes.len() {
            return Ok(false);
        }

        Ok(expected_bytes.ct_eq(provided_bytes).into())
    }
}

// ============ Webhook event envelope ============

/// The event types the reconciler acts on. Everything else parses to
/// `Unrecognized` and is acknowledged without processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripeEventKind {
    CheckoutSessionCompleted,
    InvoicePaymentSucceeded,
    InvoicePaymentFailed,
    SubscriptionUpdated,
    SubscriptionDeleted,
    DisputeCreated,
    Unrecognized,
}

impl From<&str> for StripeEventKind {
    fn from(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "invoice.payment_succeeded" => Self::InvoicePaymentSucceeded,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            "customer.subscription.updated" => Self::SubscriptionUpdated,
            "customer.subscription.deleted" => Self::SubscriptionDeleted,
            "charge.dispute.created" => Self::DisputeCreated,
            _ => Self::Unrecognized,
        }
    }
}

/// Generic Stripe webhook event. The envelope carries the type tag; the
/// object is parsed per-type afterwards.
#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

impl StripeEvent {
    pub fn kind(&self) -> StripeEventKind {
        StripeEventKind::from(self.event_type.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

// ============ checkout.session.completed ============

#[derive(Debug, Deserialize)]
pub struct CheckoutSessionObject {
    pub customer: Option<String>,
    pub subscription: Option<String>,
    #[serde(default)]
    pub metadata: CheckoutMetadata,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckoutMetadata {
    pub user_id: Option<String>,
    pub plan_id: Option<String>,
}

// ============ invoice.payment_succeeded / invoice.payment_failed ============

#[derive(Debug, Deserialize)]
pub struct InvoiceObject {
    pub customer: Option<String>,
    pub subscription: Option<String>,
}

// ============ customer.subscription.updated / .deleted ============

#[derive(Debug, Deserialize)]
pub struct SubscriptionObject {
    pub customer: Option<String>,
    pub status: Option<String>,
}

// ============ charge.dispute.created ============

#[derive(Debug, Deserialize)]
pub struct DisputeObject {
    pub charge: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_secret(secret: &str) -> StripeClient {
        StripeClient::new(&StripeConfig {
            secret_key: "sk_test_x".into(),
            webhook_secret: Some(secret.into()),
        })
    }

    fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> String {
        let signed = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed.as_bytes());
        format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn valid_signature_accepted() {
        let client = client_with_secret("whsec_test");
        let payload = br#"{"type":"invoice.payment_succeeded"}"#;
        let sig = sign("whsec_test", chrono::Utc::now().timestamp(), payload);
        assert!(client.verify_webhook_signature(payload, &sig).unwrap());
    }

    #[test]
    fn wrong_secret_rejected() {
        let client = client_with_secret("whsec_test");
        let payload = b"{}";
        let sig = sign("whsec_other", chrono::Utc::now().timestamp(), payload);
        assert!(!client.verify_webhook_signature(payload, &sig).unwrap());
    }

    #[test]
    fn tampered_payload_rejected() {
        let client = client_with_secret("whsec_test");
        let sig = sign("whsec_test", chrono::Utc::now().timestamp(), b"original");
        assert!(!client.verify_webhook_signature(b"tampered", &sig).unwrap());
    }

    #[test]
    fn stale_timestamp_rejected() {
        let client = client_with_secret("whsec_test");
        let payload = b"{}";
        let sig = sign("whsec_test", chrono::Utc::now().timestamp() - 600, payload);
        assert!(!client.verify_webhook_signature(payload, &sig).unwrap());
    }

    #[test]
    fn missing_secret_fails_closed() {
        let client = StripeClient::new(&StripeConfig {
            secret_key: "sk_test_x".into(),
            webhook_secret: None,
        });
        let payload = b"{}";
        let sig = sign("whsec_test", chrono::Utc::now().timestamp(), payload);
        assert!(!client.verify_webhook_signature(payload, &sig).unwrap());
    }

    #[test]
    fn event_kinds_parse_from_type_tags() {
        assert_eq!(
            StripeEventKind::from("checkout.session.completed"),
            StripeEventKind::CheckoutSessionCompleted
        );
        assert_eq!(
            StripeEventKind::from("customer.subscription.deleted"),
            StripeEventKind::SubscriptionDeleted
        );
        assert_eq!(
            StripeEventKind::from("payment_method.attached"),
            StripeEventKind::Unrecognized
        );
    }

    #[test]
    fn malformed_header_is_error() {
        let client = client_with_secret("whsec_test");
        assert!(client
            .verify_webhook_signature(b"{}", "not-a-stripe-signature")
            .is_err());
    }
}
