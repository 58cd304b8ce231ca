use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use crate::models::generate_id;

/// A URL tracked by one owner. `target_price` stays `None` until the first
/// successful observation derives it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct TrackedTarget {
    pub id: String,
    pub owner_id: String,
    pub url: String,
    pub target_price: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTarget {
    pub owner_id: String,
    pub url: String,
    pub target_price: Option<f64>,
}

impl TrackedTarget {
    pub fn new(new_target: NewTarget) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            owner_id: new_target.owner_id,
            url: new_target.url,
            target_price: new_target.target_price,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_threshold(&self) -> bool {
        self.target_price.is_some()
    }
}
