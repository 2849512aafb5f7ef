use axum::extract::State;
use serde::Serialize;

use crate::db::{queries, AppState};
use crate::error::{AppError, OptionExt, Result};
use crate::extractors::{Json, Path};
use crate::models::{CreateOrder, Order, OrderItem};

#[derive(Serialize)]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Place an order against a shared catalog. Public - the share token in the
/// path scopes the order; every item must belong to that catalog's store.
pub async fn create_order(
    State(state): State<AppState>,
    Path(share_token): Path<String>,
    Json(mut input): Json<CreateOrder>,
) -> Result<Json<OrderResponse>> {
    input.validate()?;

    let mut conn = state.db.get()?;

    let collection = queries::get_collection_by_share_token(&conn, &share_token)?
        .or_not_found("Catalog not found")?;

    for item in &input.items {
        let product = queries::get_product_by_id(&conn, &item.product_id)?
            .or_not_found("Product not found")?;
        if product.owner_id != collection.owner_id {
            return Err(AppError::BadRequest(
                "Product does not belong to this catalog".into(),
            ));
        }
    }

    // The order is recorded against the catalog it was placed from, not
    // whatever collection_id the client claims.
    input.collection_id = Some(collection.id.clone());

    let order = queries::create_order(&mut conn, &input)?;
    let items = queries::list_order_items(&conn, &order.id)?;

    tracing::info!(
        order_id = %order.id,
        total_cents = order.total_cents,
        "Order placed via catalog {}",
        collection.id
    );

    Ok(Json(OrderResponse { order, items }))
}

/// Fetch an order by the token handed back at placement. Public - the token
/// is an unguessable uuid, so possession is the authorization.
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_token): Path<String>,
) -> Result<Json<OrderResponse>> {
    let conn = state.db.get()?;

    let order = queries::get_order_by_token(&conn, &order_token)?.or_not_found("Order not found")?;
    let items = queries::list_order_items(&conn, &order.id)?;

    Ok(Json(OrderResponse { order, items }))
}
