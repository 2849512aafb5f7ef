use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: String,
    /// Public handle shared with the customer.
    pub order_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub total_cents: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub quantity: i64,
    pub size: Option<String>,
    /// Price snapshot at order time, in cents.
    pub price_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderItem {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub size: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrder {
    #[serde(default)]
    pub collection_id: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub items: Vec<CreateOrderItem>,
}

impl CreateOrder {
    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(AppError::BadRequest(
                "An order must contain at least one item".into(),
            ));
        }
        if self.items.iter().any(|i| i.quantity <= 0) {
            return Err(AppError::BadRequest(
                "Item quantities must be positive".into(),
            ));
        }
        Ok(())
    }
}
