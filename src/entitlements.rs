//! Plan entitlement evaluation.
//!
//! Answers "may this user create one more X right now?" by comparing a live
//! resource count against the user's plan limit. Counts are always recomputed
//! from the database, never cached, so deletions immediately free capacity.

use rusqlite::Connection;

use crate::db::queries;
use crate::error::Result;
use crate::models::{Plan, User, UNLIMITED};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Product,
    Collection,
}

impl ResourceKind {
    pub fn noun(self) -> &'static str {
        match self {
            ResourceKind::Product => "products",
            ResourceKind::Collection => "collections",
        }
    }
}

/// Outcome of an entitlement check, with enough context for an error message.
#[derive(Debug)]
pub struct Entitlement {
    pub allowed: bool,
    pub current_count: i64,
    pub limit: i64,
    pub plan_name: String,
}

/// Resolve the user's plan, falling back to the free plan when the stored
/// plan_id is dangling. The fallback is persisted so subsequent requests see
/// a consistent assignment.
pub fn resolve_plan(conn: &Connection, user: &User) -> Result<Plan> {
    if let Some(plan) = queries::get_plan_by_id(conn, &user.plan_id)? {
        return Ok(plan);
    }

    tracing::warn!(
        user_id = %user.id,
        plan_id = %user.plan_id,
        "User references a missing plan; reassigning to free"
    );
    let free = queries::get_free_plan(conn)?;
    queries::set_user_plan(conn, &user.id, &free.id)?;
    Ok(free)
}

/// Check whether `user` may create one more resource of `kind`.
///
/// The limit is strict: a user at exactly their limit is denied. A limit of
/// -1 means unlimited. The count is taken either way, so `current_count` is
/// always the live usage.
pub fn can_create(conn: &Connection, user: &User, kind: ResourceKind) -> Result<Entitlement> {
    let plan = resolve_plan(conn, user)?;

    let limit = match kind {
        ResourceKind::Product => plan.max_products,
        ResourceKind::Collection => plan.max_collections,
    };

    let current_count = match kind {
        ResourceKind::Product => queries::count_products_by_owner(conn, &user.id)?,
        ResourceKind::Collection => queries::count_collections_by_owner(conn, &user.id)?,
    };

    Ok(Entitlement {
        allowed: limit == UNLIMITED || current_count < limit,
        current_count,
        limit,
        plan_name: plan.name,
    })
}

impl Entitlement {
    /// Human-readable denial message for the 403 response body.
    pub fn denial_message(&self, kind: ResourceKind) -> String {
        format!(
            "Plan '{}' allows at most {} {} (you have {}). Upgrade to add more.",
            self.plan_name,
            self.limit,
            kind.noun(),
            self.current_count
        )
    }
}
