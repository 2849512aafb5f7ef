use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// A shareable product collection (a "catalog"). The share token is the
/// public handle used in catalog links.
#[derive(Debug, Clone, Serialize)]
pub struct Collection {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub share_token: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateCollection {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CreateCollection {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("Collection name is required".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateCollection {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl UpdateCollection {
    pub fn validate(&self) -> Result<()> {
        if let Some(ref name) = self.name {
            if name.trim().is_empty() {
                return Err(AppError::BadRequest("Collection name is required".into()));
            }
        }
        Ok(())
    }
}
