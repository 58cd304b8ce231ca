use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One append-only ledger row. The latest row by `observed_at` is the
/// target's current price.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct PriceObservation {
    pub id: i64,
    pub target_id: String,
    pub price: f64,
    pub observed_at: DateTime<Utc>,
}
