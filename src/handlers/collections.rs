use axum::extract::State;
use serde_json::json;

use crate::auth::AuthUser;
use crate::db::{queries, AppState};
use crate::entitlements::{can_create, ResourceKind};
use crate::error::{AppError, OptionExt, Result};
use crate::extractors::{Json, Path};
use crate::models::{Collection, CreateCollection, UpdateCollection};

pub async fn create_collection(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(input): Json<CreateCollection>,
) -> Result<Json<Collection>> {
    input.validate()?;

    let conn = state.db.get()?;

    let entitlement = can_create(&conn, &user, ResourceKind::Collection)?;
    if !entitlement.allowed {
        return Err(AppError::Forbidden(
            entitlement.denial_message(ResourceKind::Collection),
        ));
    }

    let collection = queries::create_collection(&conn, &user.id, &input)?;
    Ok(Json(collection))
}

pub async fn list_collections(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Collection>>> {
    let conn = state.db.get()?;
    Ok(Json(queries::list_collections_by_owner(&conn, &user.id)?))
}

pub async fn get_collection(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Collection>> {
    let conn = state.db.get()?;
    let collection = queries::get_collection_owned(&conn, &id, &user.id)?
        .or_not_found("Collection not found")?;
    Ok(Json(collection))
}

pub async fn update_collection(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(input): Json<UpdateCollection>,
) -> Result<Json<Collection>> {
    input.validate()?;

    let conn = state.db.get()?;
    if !queries::update_collection(&conn, &id, &user.id, &input)? {
        queries::get_collection_owned(&conn, &id, &user.id)?
            .or_not_found("Collection not found")?;
    }

    let collection = queries::get_collection_owned(&conn, &id, &user.id)?
        .or_not_found("Collection not found")?;
    Ok(Json(collection))
}

pub async fn delete_collection(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    if !queries::delete_collection(&conn, &id, &user.id)? {
        return Err(AppError::NotFound("Collection not found".into()));
    }
    Ok(Json(json!({ "deleted": true })))
}
