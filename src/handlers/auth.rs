use axum::extract::State;
use serde::Serialize;
use serde_json::json;

use crate::auth::issue_token;
use crate::crypto::{generate_reset_token, hash_password, verify_password};
use crate::db::{queries, AppState};
use crate::email::reset_password_email;
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::models::{
    normalize_phone, validate_email_format, validate_password, validate_store_name,
    ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest, User,
};

/// Reset tokens are valid for one hour.
const RESET_TOKEN_TTL_SECS: i64 = 3600;

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Register a new store account. New accounts always start on the free plan
/// with no subscription.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>> {
    validate_store_name(&input.store_name)?;
    validate_email_format(&input.email)?;
    validate_password(&input.password)?;
    let phone = normalize_phone(&input.phone)?;
    let email = input.email.trim().to_lowercase();

    let conn = state.db.get()?;

    if queries::get_user_by_email(&conn, &email)?.is_some() {
        return Err(AppError::Conflict("Email already registered".into()));
    }
    if queries::get_user_by_store_name(&conn, &input.store_name)?.is_some() {
        return Err(AppError::Conflict("Store name already taken".into()));
    }

    let free_plan = queries::get_free_plan(&conn)?;
    let password_hash = hash_password(&input.password)?;

    let user = queries::create_user(
        &conn,
        &queries::NewUser {
            store_name: &input.store_name,
            email: &email,
            password_hash: &password_hash,
            phone: &phone,
            plan_id: &free_plan.id,
        },
    )?;

    tracing::info!(user_id = %user.id, "New store registered: {}", user.store_name);

    let token = issue_token(&state.jwt_key, &user.id)?;
    Ok(Json(AuthResponse { token, user }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let email = input.email.trim().to_lowercase();
    let conn = state.db.get()?;

    // Same error for unknown email and wrong password.
    let user = queries::get_user_by_email(&conn, &email)?
        .filter(|u| verify_password(&input.password, &u.password_hash))
        .ok_or(AppError::Unauthorized)?;

    let token = issue_token(&state.jwt_key, &user.id)?;
    Ok(Json(AuthResponse { token, user }))
}

/// Start a password reset. Always responds identically whether or not the
/// email is registered, so the endpoint cannot be used to probe accounts.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(input): Json<ForgotPasswordRequest>,
) -> Result<Json<serde_json::Value>> {
    let email = input.email.trim().to_lowercase();

    let user = {
        let conn = state.db.get()?;
        queries::get_user_by_email(&conn, &email)?
    };

    if let Some(user) = user {
        let token = generate_reset_token();
        let expires_at = chrono::Utc::now().timestamp() + RESET_TOKEN_TTL_SECS;

        {
            let conn = state.db.get()?;
            queries::set_reset_token(&conn, &user.id, &token, expires_at)?;
        }

        let reset_link = format!("{}/reset-password?token={}", state.frontend_url, token);
        let body = reset_password_email(&reset_link);

        // Deliver in the background so response timing doesn't leak whether
        // the account exists.
        let email_service = state.email.clone();
        tokio::spawn(async move {
            if let Err(e) = email_service.send(&user.email, "Reset your password", &body).await {
                tracing::error!("Failed to send reset email: {}", e);
            }
        });
    } else {
        tracing::debug!("Password reset requested for unknown email");
    }

    Ok(Json(json!({
        "message": "If that email is registered, a reset link has been sent"
    })))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(input): Json<ResetPasswordRequest>,
) -> Result<Json<serde_json::Value>> {
    validate_password(&input.new_password)?;

    let conn = state.db.get()?;
    let user = queries::get_user_by_reset_token(&conn, &input.token)?
        .ok_or_else(|| AppError::BadRequest("Invalid or expired reset token".into()))?;

    let password_hash = hash_password(&input.new_password)?;
    queries::update_user_password(&conn, &user.id, &password_hash)?;

    tracing::info!(user_id = %user.id, "Password reset completed");

    Ok(Json(json!({ "message": "Password updated" })))
}
