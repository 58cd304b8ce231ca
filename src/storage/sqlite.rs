use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use super::{PriceLedger, StoreResult, TargetStore};
use crate::config::DatabaseConfig;
use crate::models::{NewTarget, PriceObservation, TrackedTarget};
use crate::utils::error::PersistenceError;

const TARGET_COLUMNS: &str = "id, owner_id, url, target_price, created_at, updated_at";
const OBSERVATION_COLUMNS: &str = "id, target_id, price, observed_at";

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens the pool, creating the database file if needed, and applies migrations.
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = config.url.contains(":memory:");
        if let Some(parent) = database_path(&config.url).filter(|_| !in_memory).and_then(|p| p.parent()) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    PersistenceError::Unavailable(format!("Cannot create {}: {}", parent.display(), e))
                })?;
            }
        }

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout));
        if in_memory {
            // Each connection to :memory: is its own database; never recycle it.
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| PersistenceError::Unavailable(format!("Migration failed: {}", e)))?;
        tracing::debug!("Database schema is up to date");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// File path part of a `sqlite:` URL, without the query string.
fn database_path(url: &str) -> Option<&Path> {
    let rest = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    (!path.is_empty()).then(|| Path::new(path))
}

#[async_trait]
impl TargetStore for SqliteStore {
    async fn lookup_target(&self, target_id: &str) -> StoreResult<Option<TrackedTarget>> {
        let target = sqlx::query_as::<_, TrackedTarget>(&format!(
            "SELECT {TARGET_COLUMNS} FROM tracked_targets WHERE id = ?"
        ))
        .bind(target_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(target)
    }

    async fn set_initial_threshold(&self, target_id: &str, threshold: f64) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE tracked_targets SET target_price = ?, updated_at = ? WHERE id = ? AND target_price IS NULL",
        )
        .bind(threshold)
        .bind(Utc::now())
        .bind(target_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_target(&self, new_target: NewTarget) -> StoreResult<TrackedTarget> {
        let target = TrackedTarget::new(new_target);
        let result = sqlx::query(&format!(
            "INSERT INTO tracked_targets ({TARGET_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)"
        ))
        .bind(&target.id)
        .bind(&target.owner_id)
        .bind(&target.url)
        .bind(target.target_price)
        .bind(target.created_at)
        .bind(target.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(target),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(PersistenceError::Duplicate {
                owner_id: target.owner_id,
                url: target.url,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_target(&self, target_id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tracked_targets WHERE id = ?")
            .bind(target_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_targets(&self) -> StoreResult<Vec<TrackedTarget>> {
        let targets = sqlx::query_as::<_, TrackedTarget>(&format!(
            "SELECT {TARGET_COLUMNS} FROM tracked_targets ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(targets)
    }
}

#[async_trait]
impl PriceLedger for SqliteStore {
    async fn append(&self, target_id: &str, price: f64) -> StoreResult<PriceObservation> {
        let observed_at = Utc::now();
        let result = sqlx::query("INSERT INTO price_observations (target_id, price, observed_at) VALUES (?, ?, ?)")
            .bind(target_id)
            .bind(price)
            .bind(observed_at)
            .execute(&self.pool)
            .await?;

        Ok(PriceObservation {
            id: result.last_insert_rowid(),
            target_id: target_id.to_string(),
            price,
            observed_at,
        })
    }

    async fn latest(&self, target_id: &str) -> StoreResult<Option<PriceObservation>> {
        Ok(self.history(target_id, 1).await?.into_iter().next())
    }

    async fn history(&self, target_id: &str, limit: usize) -> StoreResult<Vec<PriceObservation>> {
        let rows = sqlx::query_as::<_, PriceObservation>(&format!(
            "SELECT {OBSERVATION_COLUMNS} FROM price_observations WHERE target_id = ? \
             ORDER BY observed_at DESC, id DESC LIMIT ?"
        ))
        .bind(target_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
