use serde::{Deserialize, Serialize};

/// Quota sentinel meaning "no limit".
pub const UNLIMITED: i64 = -1;

/// Name of the universal fallback plan. Always present, never deactivated.
pub const FREE_PLAN_NAME: &str = "free";

/// A subscription tier: price, quotas, and the Stripe price reference used
/// to start a checkout. Rows are seed-managed; users never mutate them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    /// Stable identity key (e.g. "free", "basic") used for lookups and seeding.
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub price_cents: i64,
    /// Stripe price reference. None means the plan cannot be subscribed to
    /// (the free tier).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_price_id: Option<String>,
    /// Max products a store may hold, or -1 for unlimited.
    pub max_products: i64,
    /// Max collections a store may hold, or -1 for unlimited.
    pub max_collections: i64,
    /// Marketing feature list, JSON-encoded array of strings.
    pub features: String,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Plan {
    pub fn is_subscribable(&self) -> bool {
        self.stripe_price_id.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// Seed definition for one plan tier. The recognized set of seed names is
/// authoritative: seeding deletes stored plans with unrecognized names and
/// overwrites the mutable fields of recognized ones in place.
#[derive(Debug, Clone)]
pub struct PlanSeed {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub price_cents: i64,
    pub stripe_price_id: Option<String>,
    pub max_products: i64,
    pub max_collections: i64,
    pub features: &'static str,
    pub is_active: bool,
}

/// The built-in plan catalog. Stripe price references come from the
/// environment so test and live deployments can point at different prices.
pub fn default_plans() -> Vec<PlanSeed> {
    let price = |var: &str| std::env::var(var).ok().filter(|v| !v.is_empty());

    vec![
        PlanSeed {
            name: FREE_PLAN_NAME,
            display_name: "Free",
            description: "Perfect for getting started",
            price_cents: 0,
            stripe_price_id: None,
            max_products: 10,
            max_collections: 2,
            features: r#"["Up to 10 products", "Up to 2 catalogs", "Shareable link", "Email support"]"#,
            is_active: true,
        },
        PlanSeed {
            name: "basic",
            display_name: "Basic",
            description: "For small businesses",
            price_cents: 4990,
            stripe_price_id: price("STRIPE_PRICE_BASIC"),
            max_products: 30,
            max_collections: 3,
            features: r#"["Up to 30 products", "Up to 3 catalogs", "Shareable link", "Email support"]"#,
            is_active: true,
        },
        PlanSeed {
            name: "plus",
            display_name: "Plus",
            description: "For growing businesses",
            price_cents: 8990,
            stripe_price_id: price("STRIPE_PRICE_PLUS"),
            max_products: 50,
            max_collections: 5,
            features: r#"["Up to 50 products", "Up to 5 catalogs", "Shareable link", "Priority support"]"#,
            is_active: true,
        },
        PlanSeed {
            name: "pro",
            display_name: "Professional",
            description: "For established businesses",
            price_cents: 12990,
            stripe_price_id: price("STRIPE_PRICE_PRO"),
            max_products: 100,
            max_collections: 10,
            features: r#"["Up to 100 products", "Up to 10 catalogs", "Shareable link", "24/7 support"]"#,
            is_active: true,
        },
        PlanSeed {
            name: "enterprise",
            display_name: "Enterprise",
            description: "For large operations",
            price_cents: 29900,
            stripe_price_id: price("STRIPE_PRICE_ENTERPRISE"),
            max_products: UNLIMITED,
            max_collections: UNLIMITED,
            features: r#"["Unlimited products", "Unlimited catalogs", "Shareable link", "Dedicated support"]"#,
            is_active: true,
        },
    ]
}

/// The current plan plus live usage, returned by `GET /me/plan`.
#[derive(Debug, Serialize)]
pub struct PlanInfo {
    pub plan: Plan,
    pub product_count: i64,
    pub collection_count: i64,
    pub can_create_product: bool,
    pub can_create_collection: bool,
    pub subscription_status: crate::models::SubscriptionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_expires_at: Option<i64>,
}
