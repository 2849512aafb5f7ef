use chrono::Utc;
use rusqlite::{params, Connection, ToSql};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::*;

use super::from_row::{
    query_all, query_one, COLLECTION_COLS, ORDER_COLS, ORDER_ITEM_COLS, PLAN_COLS, PRODUCT_COLS,
    USER_COLS,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

/// Plan expiry horizon applied on checkout completion and invoice renewal.
/// Always recomputed from the current time, never extended additively.
pub fn plan_expiry_from_now() -> i64 {
    (Utc::now() + chrono::Months::new(1)).timestamp()
}

// ============ Plans ============

/// Reconcile the stored plan catalog with the recognized seed set.
///
/// The seed names are authoritative: stored plans with unrecognized names are
/// deleted; recognized plans are created if absent or have their mutable
/// fields overwritten in place, preserving the row id and any user
/// foreign keys pointing at it. Idempotent; run at every process start.
pub fn seed_plans(conn: &Connection, seeds: &[PlanSeed]) -> Result<()> {
    let placeholders = vec!["?"; seeds.len()].join(", ");
    let names: Vec<&dyn ToSql> = seeds.iter().map(|s| &s.name as &dyn ToSql).collect();
    let deleted = conn.execute(
        &format!("DELETE FROM plans WHERE name NOT IN ({})", placeholders),
        names.as_slice(),
    )?;
    if deleted > 0 {
        tracing::info!("Removed {} plan(s) no longer in the catalog", deleted);
    }

    let ts = now();
    for seed in seeds {
        let existing = get_plan_by_name(conn, seed.name)?;
        match existing {
            Some(plan) => {
                conn.execute(
                    "UPDATE plans SET display_name = ?1, description = ?2, price_cents = ?3,
                            stripe_price_id = ?4, max_products = ?5, max_collections = ?6,
                            features = ?7, is_active = ?8, updated_at = ?9
                     WHERE id = ?10",
                    params![
                        seed.display_name,
                        seed.description,
                        seed.price_cents,
                        seed.stripe_price_id,
                        seed.max_products,
                        seed.max_collections,
                        seed.features,
                        seed.is_active,
                        ts,
                        plan.id,
                    ],
                )?;
                tracing::debug!("Updated plan: {}", seed.name);
            }
            None => {
                conn.execute(
                    "INSERT INTO plans (id, name, display_name, description, price_cents,
                            stripe_price_id, max_products, max_collections, features, is_active,
                            created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    params![
                        gen_id(),
                        seed.name,
                        seed.display_name,
                        seed.description,
                        seed.price_cents,
                        seed.stripe_price_id,
                        seed.max_products,
                        seed.max_collections,
                        seed.features,
                        seed.is_active,
                        ts,
                        ts,
                    ],
                )?;
                tracing::info!("Seeded plan: {}", seed.name);
            }
        }
    }

    Ok(())
}

pub fn list_active_plans(conn: &Connection) -> Result<Vec<Plan>> {
    query_all(
        conn,
        &format!("SELECT {PLAN_COLS} FROM plans WHERE is_active = 1 ORDER BY price_cents ASC"),
        &[],
    )
}

pub fn get_plan_by_name(conn: &Connection, name: &str) -> Result<Option<Plan>> {
    query_one(
        conn,
        &format!("SELECT {PLAN_COLS} FROM plans WHERE name = ?1"),
        &[&name],
    )
}

pub fn get_plan_by_id(conn: &Connection, id: &str) -> Result<Option<Plan>> {
    query_one(
        conn,
        &format!("SELECT {PLAN_COLS} FROM plans WHERE id = ?1"),
        &[&id],
    )
}

/// Look up the free plan, which seeding guarantees to exist.
pub fn get_free_plan(conn: &Connection) -> Result<Plan> {
    get_plan_by_name(conn, FREE_PLAN_NAME)?
        .ok_or_else(|| AppError::Internal("Free plan missing - was the catalog seeded?".into()))
}

// ============ Users ============

pub struct NewUser<'a> {
    pub store_name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub phone: &'a str,
    pub plan_id: &'a str,
}

pub fn create_user(conn: &Connection, input: &NewUser) -> Result<User> {
    let id = gen_id();
    let ts = now();

    conn.execute(
        "INSERT INTO users (id, store_name, email, password_hash, phone, plan_id,
                subscription_status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'none', ?7, ?8)",
        params![id, input.store_name, input.email, input.password_hash, input.phone, input.plan_id, ts, ts],
    )?;

    Ok(User {
        id,
        store_name: input.store_name.to_string(),
        email: input.email.to_string(),
        password_hash: input.password_hash.to_string(),
        phone: input.phone.to_string(),
        plan_id: input.plan_id.to_string(),
        subscription_status: SubscriptionStatus::None,
        plan_expires_at: None,
        stripe_customer_id: None,
        stripe_subscription_id: None,
        reset_token: None,
        reset_token_expires_at: None,
        created_at: ts,
        updated_at: ts,
    })
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {USER_COLS} FROM users WHERE id = ?1"),
        &[&id],
    )
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {USER_COLS} FROM users WHERE email = ?1"),
        &[&email],
    )
}

pub fn get_user_by_store_name(conn: &Connection, store_name: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {USER_COLS} FROM users WHERE store_name = ?1"),
        &[&store_name],
    )
}

pub fn get_user_by_stripe_customer(conn: &Connection, customer_id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {USER_COLS} FROM users WHERE stripe_customer_id = ?1"),
        &[&customer_id],
    )
}

pub fn get_user_by_reset_token(conn: &Connection, token: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!(
            "SELECT {USER_COLS} FROM users WHERE reset_token = ?1 AND reset_token_expires_at > ?2"
        ),
        &[&token, &now()],
    )
}

pub fn update_user_profile(
    conn: &Connection,
    user_id: &str,
    store_name: Option<&str>,
    phone: Option<&str>,
) -> Result<()> {
    if let Some(name) = store_name {
        conn.execute(
            "UPDATE users SET store_name = ?1, updated_at = ?2 WHERE id = ?3",
            params![name, now(), user_id],
        )?;
    }
    if let Some(phone) = phone {
        conn.execute(
            "UPDATE users SET phone = ?1, updated_at = ?2 WHERE id = ?3",
            params![phone, now(), user_id],
        )?;
    }
    Ok(())
}

pub fn update_user_password(conn: &Connection, user_id: &str, password_hash: &str) -> Result<()> {
    conn.execute(
        "UPDATE users SET password_hash = ?1, reset_token = NULL,
                reset_token_expires_at = NULL, updated_at = ?2
         WHERE id = ?3",
        params![password_hash, now(), user_id],
    )?;
    Ok(())
}

pub fn set_reset_token(
    conn: &Connection,
    user_id: &str,
    token: &str,
    expires_at: i64,
) -> Result<()> {
    conn.execute(
        "UPDATE users SET reset_token = ?1, reset_token_expires_at = ?2, updated_at = ?3
         WHERE id = ?4",
        params![token, expires_at, now(), user_id],
    )?;
    Ok(())
}

/// Persist a lazily created Stripe customer reference.
pub fn set_stripe_customer_id(conn: &Connection, user_id: &str, customer_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE users SET stripe_customer_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![customer_id, now(), user_id],
    )?;
    Ok(())
}

/// Repoint a user at a plan without touching subscription state.
/// Used by the entitlement evaluator's self-heal path.
pub fn set_user_plan(conn: &Connection, user_id: &str, plan_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE users SET plan_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![plan_id, now(), user_id],
    )?;
    Ok(())
}

// ============ Subscription reconciliation writes ============
//
// These are the only writers of subscription-derived fields. Each is a
// field-scoped single-row UPDATE so concurrent events touching disjoint
// fields do not clobber each other; same-field races are last-write-wins.

/// Apply a completed checkout: store both Stripe references, repoint the
/// plan, activate, and set the expiry horizon. Returns false when no such
/// user exists.
pub fn apply_checkout_to_user(
    conn: &Connection,
    user_id: &str,
    customer_id: &str,
    subscription_id: Option<&str>,
    plan_id: &str,
    expires_at: i64,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE users SET stripe_customer_id = ?1, stripe_subscription_id = ?2, plan_id = ?3,
                subscription_status = 'active', plan_expires_at = ?4, updated_at = ?5
         WHERE id = ?6",
        params![customer_id, subscription_id, plan_id, expires_at, now(), user_id],
    )?;
    Ok(affected > 0)
}

/// Renew on successful invoice payment: reactivate and recompute the expiry
/// from the current time. Returns false when the customer is unknown.
pub fn activate_subscription_by_customer(
    conn: &Connection,
    customer_id: &str,
    expires_at: i64,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE users SET subscription_status = 'active', plan_expires_at = ?1, updated_at = ?2
         WHERE stripe_customer_id = ?3",
        params![expires_at, now(), customer_id],
    )?;
    Ok(affected > 0)
}

/// Store a provider-reported status verbatim (also used for past_due on
/// payment failure). Does not touch plan_id or the expiry - the grace
/// period runs until a deletion event arrives.
pub fn set_subscription_status_by_customer(
    conn: &Connection,
    customer_id: &str,
    status: &SubscriptionStatus,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE users SET subscription_status = ?1, updated_at = ?2
         WHERE stripe_customer_id = ?3",
        params![status.as_str(), now(), customer_id],
    )?;
    Ok(affected > 0)
}

/// Revert a user to the free plan after a subscription deletion or dispute:
/// clear the subscription reference and expiry, mark canceled. Idempotent -
/// reverting an already-free user rewrites the same values.
pub fn revert_to_free_by_customer(
    conn: &Connection,
    customer_id: &str,
    free_plan_id: &str,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE users SET plan_id = ?1, stripe_subscription_id = NULL,
                subscription_status = 'canceled', plan_expires_at = NULL, updated_at = ?2
         WHERE stripe_customer_id = ?3",
        params![free_plan_id, now(), customer_id],
    )?;
    Ok(affected > 0)
}

/// Synchronous revert used by the canceller when there is no live external
/// subscription: back to free with status 'none'.
pub fn revert_to_free_immediately(
    conn: &Connection,
    user_id: &str,
    free_plan_id: &str,
) -> Result<()> {
    conn.execute(
        "UPDATE users SET plan_id = ?1, stripe_subscription_id = NULL,
                subscription_status = 'none', plan_expires_at = NULL, updated_at = ?2
         WHERE id = ?3",
        params![free_plan_id, now(), user_id],
    )?;
    Ok(())
}

// ============ Collections ============

pub fn create_collection(
    conn: &Connection,
    owner_id: &str,
    input: &CreateCollection,
) -> Result<Collection> {
    let id = gen_id();
    let share_token = gen_id();
    let ts = now();

    conn.execute(
        "INSERT INTO collections (id, owner_id, name, description, share_token, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![id, owner_id, input.name, input.description, share_token, ts, ts],
    )?;

    Ok(Collection {
        id,
        owner_id: owner_id.to_string(),
        name: input.name.clone(),
        description: input.description.clone(),
        share_token,
        created_at: ts,
        updated_at: ts,
    })
}

pub fn list_collections_by_owner(conn: &Connection, owner_id: &str) -> Result<Vec<Collection>> {
    query_all(
        conn,
        &format!(
            "SELECT {COLLECTION_COLS} FROM collections WHERE owner_id = ?1 ORDER BY created_at DESC"
        ),
        &[&owner_id],
    )
}

pub fn get_collection_owned(
    conn: &Connection,
    id: &str,
    owner_id: &str,
) -> Result<Option<Collection>> {
    query_one(
        conn,
        &format!("SELECT {COLLECTION_COLS} FROM collections WHERE id = ?1 AND owner_id = ?2"),
        &[&id, &owner_id],
    )
}

pub fn get_collection_by_share_token(conn: &Connection, token: &str) -> Result<Option<Collection>> {
    query_one(
        conn,
        &format!("SELECT {COLLECTION_COLS} FROM collections WHERE share_token = ?1"),
        &[&token],
    )
}

pub fn update_collection(
    conn: &Connection,
    id: &str,
    owner_id: &str,
    input: &UpdateCollection,
) -> Result<bool> {
    let mut affected = 0;
    if let Some(ref name) = input.name {
        affected += conn.execute(
            "UPDATE collections SET name = ?1, updated_at = ?2 WHERE id = ?3 AND owner_id = ?4",
            params![name, now(), id, owner_id],
        )?;
    }
    if let Some(ref description) = input.description {
        affected += conn.execute(
            "UPDATE collections SET description = ?1, updated_at = ?2 WHERE id = ?3 AND owner_id = ?4",
            params![description, now(), id, owner_id],
        )?;
    }
    Ok(affected > 0)
}

pub fn delete_collection(conn: &Connection, id: &str, owner_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM collections WHERE id = ?1 AND owner_id = ?2",
        params![id, owner_id],
    )?;
    Ok(affected > 0)
}

/// Live collection count for entitlement checks. Always recomputed.
pub fn count_collections_by_owner(conn: &Connection, owner_id: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM collections WHERE owner_id = ?1",
        params![owner_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

// ============ Products ============

pub fn create_product(conn: &Connection, owner_id: &str, input: &CreateProduct) -> Result<Product> {
    let id = gen_id();
    let ts = now();

    conn.execute(
        "INSERT INTO products (id, owner_id, collection_id, name, description, price_cents,
                image_url, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            owner_id,
            input.collection_id,
            input.name,
            input.description,
            input.price_cents,
            input.image_url,
            ts,
            ts
        ],
    )?;

    Ok(Product {
        id,
        owner_id: owner_id.to_string(),
        collection_id: input.collection_id.clone(),
        name: input.name.clone(),
        description: input.description.clone(),
        price_cents: input.price_cents,
        image_url: input.image_url.clone(),
        created_at: ts,
        updated_at: ts,
    })
}

pub fn list_products_by_owner(conn: &Connection, owner_id: &str) -> Result<Vec<Product>> {
    query_all(
        conn,
        &format!(
            "SELECT {PRODUCT_COLS} FROM products WHERE owner_id = ?1 ORDER BY created_at DESC"
        ),
        &[&owner_id],
    )
}

pub fn list_products_by_collection(conn: &Connection, collection_id: &str) -> Result<Vec<Product>> {
    query_all(
        conn,
        &format!(
            "SELECT {PRODUCT_COLS} FROM products WHERE collection_id = ?1 ORDER BY created_at DESC"
        ),
        &[&collection_id],
    )
}

pub fn get_product_by_id(conn: &Connection, id: &str) -> Result<Option<Product>> {
    query_one(
        conn,
        &format!("SELECT {PRODUCT_COLS} FROM products WHERE id = ?1"),
        &[&id],
    )
}

pub fn get_product_owned(conn: &Connection, id: &str, owner_id: &str) -> Result<Option<Product>> {
    query_one(
        conn,
        &format!("SELECT {PRODUCT_COLS} FROM products WHERE id = ?1 AND owner_id = ?2"),
        &[&id, &owner_id],
    )
}

pub fn update_product(
    conn: &Connection,
    id: &str,
    owner_id: &str,
    input: &UpdateProduct,
) -> Result<bool> {
    let ts = now();
    let mut affected = 0;
    if let Some(ref name) = input.name {
        affected += conn.execute(
            "UPDATE products SET name = ?1, updated_at = ?2 WHERE id = ?3 AND owner_id = ?4",
            params![name, ts, id, owner_id],
        )?;
    }
    if let Some(ref description) = input.description {
        affected += conn.execute(
            "UPDATE products SET description = ?1, updated_at = ?2 WHERE id = ?3 AND owner_id = ?4",
            params![description, ts, id, owner_id],
        )?;
    }
    if let Some(price) = input.price_cents {
        affected += conn.execute(
            "UPDATE products SET price_cents = ?1, updated_at = ?2 WHERE id = ?3 AND owner_id = ?4",
            params![price, ts, id, owner_id],
        )?;
    }
    if let Some(ref collection_id) = input.collection_id {
        affected += conn.execute(
            "UPDATE products SET collection_id = ?1, updated_at = ?2 WHERE id = ?3 AND owner_id = ?4",
            params![collection_id, ts, id, owner_id],
        )?;
    }
    if let Some(ref image_url) = input.image_url {
        affected += conn.execute(
            "UPDATE products SET image_url = ?1, updated_at = ?2 WHERE id = ?3 AND owner_id = ?4",
            params![image_url, ts, id, owner_id],
        )?;
    }
    Ok(affected > 0)
}

pub fn delete_product(conn: &Connection, id: &str, owner_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM products WHERE id = ?1 AND owner_id = ?2",
        params![id, owner_id],
    )?;
    Ok(affected > 0)
}

/// Live product count for entitlement checks. Always recomputed.
pub fn count_products_by_owner(conn: &Connection, owner_id: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM products WHERE owner_id = ?1",
        params![owner_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

// ============ Orders ============

/// Create an order with its items atomically, snapshotting product prices.
/// An unknown product id fails the whole order.
pub fn create_order(conn: &mut Connection, input: &CreateOrder) -> Result<Order> {
    let tx = conn.transaction()?;

    let order_id = gen_id();
    let order_token = gen_id();
    let ts = now();
    let mut total_cents: i64 = 0;

    let mut items = Vec::with_capacity(input.items.len());
    for item in &input.items {
        let product: Product = query_one(
            &tx,
            &format!("SELECT {PRODUCT_COLS} FROM products WHERE id = ?1"),
            &[&item.product_id],
        )?
        .ok_or_else(|| AppError::NotFound(format!("Product not found: {}", item.product_id)))?;

        total_cents += product.price_cents * item.quantity;
        items.push((item, product.price_cents));
    }

    tx.execute(
        "INSERT INTO orders (id, order_token, collection_id, customer_name, customer_phone,
                total_cents, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            order_id,
            order_token,
            input.collection_id,
            input.customer_name,
            input.customer_phone,
            total_cents,
            ts
        ],
    )?;

    for (item, price_cents) in items {
        tx.execute(
            "INSERT INTO order_items (id, order_id, product_id, quantity, size, price_cents)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![gen_id(), order_id, item.product_id, item.quantity, item.size, price_cents],
        )?;
    }

    tx.commit()?;

    Ok(Order {
        id: order_id,
        order_token,
        collection_id: input.collection_id.clone(),
        customer_name: input.customer_name.clone(),
        customer_phone: input.customer_phone.clone(),
        total_cents,
        created_at: ts,
    })
}

/// Look an order up by its public token, the handle given to the customer.
pub fn get_order_by_token(conn: &Connection, order_token: &str) -> Result<Option<Order>> {
    query_one(
        conn,
        &format!("SELECT {ORDER_COLS} FROM orders WHERE order_token = ?1"),
        &[&order_token],
    )
}

pub fn list_order_items(conn: &Connection, order_id: &str) -> Result<Vec<OrderItem>> {
    query_all(
        conn,
        &format!("SELECT {ORDER_ITEM_COLS} FROM order_items WHERE order_id = ?1"),
        &[&order_id],
    )
}
