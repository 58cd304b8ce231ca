use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{PriceLedger, StoreResult, TargetStore};
use crate::models::{NewTarget, PriceObservation, TrackedTarget};
use crate::utils::error::PersistenceError;

/// In-process store for tests and throwaway runs. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    targets: RwLock<HashMap<String, TrackedTarget>>,
    observations: RwLock<Vec<PriceObservation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TargetStore for MemoryStore {
    async fn lookup_target(&self, target_id: &str) -> StoreResult<Option<TrackedTarget>> {
        Ok(self.targets.read().await.get(target_id).cloned())
    }

    async fn set_initial_threshold(&self, target_id: &str, threshold: f64) -> StoreResult<bool> {
        let mut targets = self.targets.write().await;
        match targets.get_mut(target_id) {
            Some(target) if target.target_price.is_none() => {
                target.target_price = Some(threshold);
                target.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_target(&self, new_target: NewTarget) -> StoreResult<TrackedTarget> {
        let mut targets = self.targets.write().await;
        if targets
            .values()
            .any(|t| t.owner_id == new_target.owner_id && t.url == new_target.url)
        {
            return Err(PersistenceError::Duplicate {
                owner_id: new_target.owner_id,
                url: new_target.url,
            });
        }

        let target = TrackedTarget::new(new_target);
        targets.insert(target.id.clone(), target.clone());
        Ok(target)
    }

    async fn delete_target(&self, target_id: &str) -> StoreResult<bool> {
        let removed = self.targets.write().await.remove(target_id).is_some();
        if removed {
            self.observations.write().await.retain(|o| o.target_id != target_id);
        }
        Ok(removed)
    }

    async fn list_targets(&self) -> StoreResult<Vec<TrackedTarget>> {
        let mut targets: Vec<_> = self.targets.read().await.values().cloned().collect();
        targets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(targets)
    }
}

#[async_trait]
impl PriceLedger for MemoryStore {
    async fn append(&self, target_id: &str, price: f64) -> StoreResult<PriceObservation> {
        if !self.targets.read().await.contains_key(target_id) {
            return Err(PersistenceError::NotFound {
                resource: format!("target {}", target_id),
            });
        }

        let mut observations = self.observations.write().await;
        let observation = PriceObservation {
            id: observations.last().map_or(1, |o| o.id + 1),
            target_id: target_id.to_string(),
            price,
            observed_at: Utc::now(),
        };
        observations.push(observation.clone());
        Ok(observation)
    }

    async fn latest(&self, target_id: &str) -> StoreResult<Option<PriceObservation>> {
        Ok(self.history(target_id, 1).await?.into_iter().next())
    }

    async fn history(&self, target_id: &str, limit: usize) -> StoreResult<Vec<PriceObservation>> {
        let observations = self.observations.read().await;
        let mut rows: Vec<_> = observations
            .iter()
            .filter(|o| o.target_id == target_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.observed_at.cmp(&a.observed_at).then_with(|| b.id.cmp(&a.id)));
        rows.truncate(limit);
        Ok(rows)
    }
}
