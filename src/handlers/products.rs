use axum::extract::State;
use serde_json::json;

use crate::auth::AuthUser;
use crate::db::{queries, AppState};
use crate::entitlements::{can_create, ResourceKind};
use crate::error::{AppError, OptionExt, Result};
use crate::extractors::{Json, Path};
use crate::models::{CreateProduct, Product, UpdateProduct};

pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(input): Json<CreateProduct>,
) -> Result<Json<Product>> {
    input.validate()?;

    let conn = state.db.get()?;

    // Quota check runs against a live count, so deleting a product
    // immediately frees a slot.
    let entitlement = can_create(&conn, &user, ResourceKind::Product)?;
    if !entitlement.allowed {
        return Err(AppError::Forbidden(
            entitlement.denial_message(ResourceKind::Product),
        ));
    }

    // A target collection must belong to the caller.
    if let Some(ref collection_id) = input.collection_id {
        queries::get_collection_owned(&conn, collection_id, &user.id)?
            .or_not_found("Collection not found")?;
    }

    let product = queries::create_product(&conn, &user.id, &input)?;
    Ok(Json(product))
}

pub async fn list_products(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Product>>> {
    let conn = state.db.get()?;
    Ok(Json(queries::list_products_by_owner(&conn, &user.id)?))
}

pub async fn get_product(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Product>> {
    let conn = state.db.get()?;
    let product =
        queries::get_product_owned(&conn, &id, &user.id)?.or_not_found("Product not found")?;
    Ok(Json(product))
}

pub async fn update_product(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(input): Json<UpdateProduct>,
) -> Result<Json<Product>> {
    input.validate()?;

    let conn = state.db.get()?;

    if let Some(ref collection_id) = input.collection_id {
        queries::get_collection_owned(&conn, collection_id, &user.id)?
            .or_not_found("Collection not found")?;
    }

    if !queries::update_product(&conn, &id, &user.id, &input)? {
        // Nothing matched: either the product doesn't exist or the input
        // carried no fields. Distinguish for the caller.
        queries::get_product_owned(&conn, &id, &user.id)?.or_not_found("Product not found")?;
    }

    let product =
        queries::get_product_owned(&conn, &id, &user.id)?.or_not_found("Product not found")?;
    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    if !queries::delete_product(&conn, &id, &user.id)? {
        return Err(AppError::NotFound("Product not found".into()));
    }
    Ok(Json(json!({ "deleted": true })))
}
