//! Session token issuance and verification, plus the `AuthUser` extractor
//! used by every authenticated handler.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header::AUTHORIZATION, request::Parts};
use jwt_simple::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::models::User;

/// Session token lifetime in hours.
const SESSION_TOKEN_HOURS: u64 = 24 * 7;

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    user_id: String,
}

/// Issue a signed session token for a user.
pub fn issue_token(key: &HS256Key, user_id: &str) -> Result<String> {
    let claims = Claims::with_custom_claims(
        SessionClaims {
            user_id: user_id.to_string(),
        },
        Duration::from_hours(SESSION_TOKEN_HOURS),
    );
    key.authenticate(claims)
        .map_err(|e| AppError::Internal(format!("Failed to sign session token: {}", e)))
}

/// Verify a session token and return the user id it was issued for.
pub fn verify_token(key: &HS256Key, token: &str) -> Result<String> {
    let claims = key
        .verify_token::<SessionClaims>(token, None)
        .map_err(|_| AppError::Unauthorized)?;
    Ok(claims.custom.user_id)
}

/// Extractor for the authenticated user.
///
/// Reads the `Authorization: Bearer <token>` header, verifies the session
/// token, and loads the user row. Rejects with 401 on any failure.
pub struct AuthUser(pub User);

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let state = AppState::from_ref(state);

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized)?;

        let user_id = verify_token(&state.jwt_key, token)?;

        let conn = state.db.get()?;
        let user = queries::get_user_by_id(&conn, &user_id)?.ok_or(AppError::Unauthorized)?;

        Ok(AuthUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_and_verify_roundtrip() {
        let key = HS256Key::from_bytes(b"test-secret");
        let token = issue_token(&key, "user-123").unwrap();
        assert_eq!(verify_token(&key, &token).unwrap(), "user-123");
    }

    #[test]
    fn wrong_key_is_rejected() {
        let key = HS256Key::from_bytes(b"test-secret");
        let other = HS256Key::from_bytes(b"other-secret");
        let token = issue_token(&key, "user-123").unwrap();
        assert!(verify_token(&other, &token).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        let key = HS256Key::from_bytes(b"test-secret");
        assert!(verify_token(&key, "not.a.token").is_err());
    }
}
