//! Target records and the append-only price ledger.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::models::{NewTarget, PriceObservation, TrackedTarget};
use crate::utils::error::PersistenceError;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub type StoreResult<T> = std::result::Result<T, PersistenceError>;

#[async_trait]
pub trait TargetStore: Send + Sync {
    async fn lookup_target(&self, target_id: &str) -> StoreResult<Option<TrackedTarget>>;

    /// Sets the threshold only if it is still unset. Returns whether the write applied.
    async fn set_initial_threshold(&self, target_id: &str, threshold: f64) -> StoreResult<bool>;

    async fn insert_target(&self, new_target: NewTarget) -> StoreResult<TrackedTarget>;

    /// Removes the target and its ledger rows. Returns whether it existed.
    async fn delete_target(&self, target_id: &str) -> StoreResult<bool>;

    async fn list_targets(&self) -> StoreResult<Vec<TrackedTarget>>;
}

#[async_trait]
pub trait PriceLedger: Send + Sync {
    async fn append(&self, target_id: &str, price: f64) -> StoreResult<PriceObservation>;

    /// Most recent observation, i.e. the target's current price.
    async fn latest(&self, target_id: &str) -> StoreResult<Option<PriceObservation>>;

    /// Newest first, at most `limit` rows.
    async fn history(&self, target_id: &str, limit: usize) -> StoreResult<Vec<PriceObservation>>;
}
