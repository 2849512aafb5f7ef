use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{AppError, Result};

/// Subscription lifecycle state, driven by the webhook reconciler (and the
/// canceller's immediate-revert path).
///
/// `customer.subscription.updated` events store the provider-reported status
/// verbatim, so unrecognized vocabulary passes through via `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionStatus {
    None,
    Active,
    PastDue,
    Canceled,
    Other(String),
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SubscriptionStatus::None => "none",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Other(s) => s,
        }
    }
}

impl From<&str> for SubscriptionStatus {
    fn from(s: &str) -> Self {
        match s {
            "none" => SubscriptionStatus::None,
            "active" => SubscriptionStatus::Active,
            "past_due" => SubscriptionStatus::PastDue,
            "canceled" => SubscriptionStatus::Canceled,
            other => SubscriptionStatus::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SubscriptionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SubscriptionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(SubscriptionStatus::from(s.as_str()))
    }
}

/// One merchant account. `plan_id` always points at a plan row (the free
/// plan by default); subscription-derived fields are written only by the
/// webhook reconciler and the canceller's immediate-revert path.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub store_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone: String,
    pub plan_id: String,
    pub subscription_status: SubscriptionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_expires_at: Option<i64>,
    /// Opaque Stripe customer reference, created lazily on first checkout.
    #[serde(skip_serializing)]
    pub stripe_customer_id: Option<String>,
    /// Opaque Stripe subscription reference, cleared on cancellation.
    #[serde(skip_serializing)]
    pub stripe_subscription_id: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token_expires_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

pub const MAX_STORE_NAME_LENGTH: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Basic email format validation.
///
/// Intentionally permissive - exactly one @, non-empty local part, and a
/// domain containing a dot. Not meant to be RFC 5322 compliant.
pub fn validate_email_format(email: &str) -> Result<()> {
    let email = email.trim();

    if email.is_empty() || email.len() > 254 {
        return Err(AppError::BadRequest("Invalid email format".into()));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(AppError::BadRequest("Invalid email format".into()));
    }

    let (local, domain) = (parts[0], parts[1]);
    if local.is_empty() || local.contains(' ') {
        return Err(AppError::BadRequest("Invalid email format".into()));
    }
    if domain.is_empty()
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(AppError::BadRequest("Invalid email format".into()));
    }

    Ok(())
}

/// Store names: 2-50 chars, letters (including accented), digits and spaces.
pub fn validate_store_name(name: &str) -> Result<()> {
    let len = name.chars().count();
    if !(2..=MAX_STORE_NAME_LENGTH).contains(&len) {
        return Err(AppError::BadRequest(
            "Store name must be between 2 and 50 characters".into(),
        ));
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == ' ') {
        return Err(AppError::BadRequest(
            "Store name may only contain letters, numbers and spaces".into(),
        ));
    }
    Ok(())
}

/// Strip non-digits from a phone number and require 10-11 digits.
pub fn normalize_phone(phone: &str) -> Result<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if !(10..=11).contains(&digits.len()) {
        return Err(AppError::BadRequest("Invalid phone number".into()));
    }
    Ok(digits)
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(
            "Password must be at least 6 characters".into(),
        ));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AppError::BadRequest("Password too long".into()));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub store_name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub store_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrips_known_values() {
        for s in ["none", "active", "past_due", "canceled"] {
            assert_eq!(SubscriptionStatus::from(s).as_str(), s);
        }
    }

    #[test]
    fn status_passes_unknown_vocabulary_through() {
        let status = SubscriptionStatus::from("incomplete_expired");
        assert_eq!(status, SubscriptionStatus::Other("incomplete_expired".into()));
        assert_eq!(status.as_str(), "incomplete_expired");
    }

    #[test]
    fn email_validation() {
        assert!(validate_email_format("shop@example.com").is_ok());
        assert!(validate_email_format("no-at-sign").is_err());
        assert!(validate_email_format("two@@example.com").is_err());
        assert!(validate_email_format("a@domain").is_err());
        assert!(validate_email_format("a@.com").is_err());
    }

    #[test]
    fn phone_normalization() {
        assert_eq!(normalize_phone("(11) 98765-4321").unwrap(), "11987654321");
        assert!(normalize_phone("12345").is_err());
    }

    #[test]
    fn store_name_validation() {
        assert!(validate_store_name("Loja da Maria").is_ok());
        assert!(validate_store_name("X").is_err());
        assert!(validate_store_name("bad<script>").is_err());
    }
}
