use axum::extract::State;

use crate::auth::AuthUser;
use crate::db::{queries, AppState};
use crate::entitlements::{can_create, resolve_plan, ResourceKind};
use crate::error::Result;
use crate::extractors::Json;
use crate::models::{Plan, PlanInfo};

/// List subscribable tiers, cheapest first.
pub async fn list_plans(State(state): State<AppState>) -> Result<Json<Vec<Plan>>> {
    let conn = state.db.get()?;
    Ok(Json(queries::list_active_plans(&conn)?))
}

/// The caller's current plan plus live usage against its quotas.
pub async fn my_plan(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<PlanInfo>> {
    let conn = state.db.get()?;

    let plan = resolve_plan(&conn, &user)?;
    let product_count = queries::count_products_by_owner(&conn, &user.id)?;
    let collection_count = queries::count_collections_by_owner(&conn, &user.id)?;
    let can_create_product = can_create(&conn, &user, ResourceKind::Product)?.allowed;
    let can_create_collection = can_create(&conn, &user, ResourceKind::Collection)?.allowed;

    Ok(Json(PlanInfo {
        plan,
        product_count,
        collection_count,
        can_create_product,
        can_create_collection,
        subscription_status: user.subscription_status,
        plan_expires_at: user.plan_expires_at,
    }))
}
