use axum::extract::State;
use serde_json::json;

use crate::auth::AuthUser;
use crate::crypto::{hash_password, verify_password};
use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::models::{
    normalize_phone, validate_password, validate_store_name, ChangePasswordRequest,
    UpdateProfileRequest, User,
};

pub async fn get_me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(input): Json<UpdateProfileRequest>,
) -> Result<Json<User>> {
    let conn = state.db.get()?;

    let store_name = match input.store_name.as_deref() {
        Some(name) => {
            validate_store_name(name)?;
            if name != user.store_name
                && queries::get_user_by_store_name(&conn, name)?.is_some()
            {
                return Err(AppError::Conflict("Store name already taken".into()));
            }
            Some(name)
        }
        None => None,
    };

    let phone = input.phone.as_deref().map(normalize_phone).transpose()?;

    queries::update_user_profile(&conn, &user.id, store_name, phone.as_deref())?;

    let updated = queries::get_user_by_id(&conn, &user.id)?.ok_or(AppError::Unauthorized)?;
    Ok(Json(updated))
}

pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(input): Json<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>> {
    if !verify_password(&input.current_password, &user.password_hash) {
        return Err(AppError::BadRequest("Current password is incorrect".into()));
    }
    validate_password(&input.new_password)?;

    let conn = state.db.get()?;
    let password_hash = hash_password(&input.new_password)?;
    queries::update_user_password(&conn, &user.id, &password_hash)?;

    Ok(Json(json!({ "message": "Password updated" })))
}
