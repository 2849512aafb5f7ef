//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const PLAN_COLS: &str = "id, name, display_name, description, price_cents, stripe_price_id, \
     max_products, max_collections, features, is_active, created_at, updated_at";

pub const USER_COLS: &str = "id, store_name, email, password_hash, phone, plan_id, \
     subscription_status, plan_expires_at, stripe_customer_id, stripe_subscription_id, \
     reset_token, reset_token_expires_at, created_at, updated_at";

pub const COLLECTION_COLS: &str =
    "id, owner_id, name, description, share_token, created_at, updated_at";

pub const PRODUCT_COLS: &str =
    "id, owner_id, collection_id, name, description, price_cents, image_url, created_at, updated_at";

pub const ORDER_COLS: &str =
    "id, order_token, collection_id, customer_name, customer_phone, total_cents, created_at";

pub const ORDER_ITEM_COLS: &str = "id, order_id, product_id, quantity, size, price_cents";

// ============ FromRow implementations ============

impl FromRow for Plan {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Plan {
            id: row.get(0)?,
            name: row.get(1)?,
            display_name: row.get(2)?,
            description: row.get(3)?,
            price_cents: row.get(4)?,
            stripe_price_id: row.get(5)?,
            max_products: row.get(6)?,
            max_collections: row.get(7)?,
            features: row.get(8)?,
            is_active: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

impl FromRow for User {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let status: String = row.get(6)?;
        Ok(User {
            id: row.get(0)?,
            store_name: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            phone: row.get(4)?,
            plan_id: row.get(5)?,
            subscription_status: SubscriptionStatus::from(status.as_str()),
            plan_expires_at: row.get(7)?,
            stripe_customer_id: row.get(8)?,
            stripe_subscription_id: row.get(9)?,
            reset_token: row.get(10)?,
            reset_token_expires_at: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }
}

impl FromRow for Collection {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Collection {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            share_token: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

impl FromRow for Product {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Product {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            collection_id: row.get(2)?,
            name: row.get(3)?,
            description: row.get(4)?,
            price_cents: row.get(5)?,
            image_url: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

impl FromRow for Order {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Order {
            id: row.get(0)?,
            order_token: row.get(1)?,
            collection_id: row.get(2)?,
            customer_name: row.get(3)?,
            customer_phone: row.get(4)?,
            total_cents: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

impl FromRow for OrderItem {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(OrderItem {
            id: row.get(0)?,
            order_id: row.get(1)?,
            product_id: row.get(2)?,
            quantity: row.get(3)?,
            size: row.get(4)?,
            price_cents: row.get(5)?,
        })
    }
}
