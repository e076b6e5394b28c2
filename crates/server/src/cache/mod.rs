//! Read-through cache for the list-all view.
//!
//! The full ordered list of meal plans is stored as a JSON snapshot under a
//! single fixed key. Reads try the snapshot first and fall back to the store;
//! every successful write drops the snapshot before it is acknowledged.
//!
//! # Failure policy
//!
//! The cache is fail-closed. A backend error on read, or a snapshot that does
//! not decode, is surfaced to the caller instead of being papered over with a
//! store read. Only the "no value" case triggers the fallback.
//!
//! # Backends
//!
//! - [`memory::MokaSnapshotCache`] - process-local `moka` cache, no TTL
//! - [`redis::RedisSnapshotCache`] - shared Redis via `ConnectionManager`

pub mod memory;
pub mod redis;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use mealplan_core::MealPlan;

pub use memory::MokaSnapshotCache;
pub use self::redis::RedisSnapshotCache;

/// Key under which the list-all snapshot is stored.
pub const ALL_MEAL_PLANS_KEY: &str = "mealplans";

/// Errors raised by a snapshot cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cached snapshot could not be decoded: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Key-value store for serialized snapshots.
///
/// `get` must return `Ok(None)` when the key holds no value; any `Err` is
/// treated as a hard failure by [`ReadThroughCache`].
#[async_trait]
pub trait SnapshotCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key` with no expiry.
    async fn set(&self, key: &str, value: String) -> Result<(), CacheError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    async fn health_check(&self) -> Result<(), CacheError>;

    fn backend_name(&self) -> &'static str;
}

/// Read-through wrapper around a [`SnapshotCache`].
///
/// A generation counter is bumped on every invalidation. A reader only
/// repopulates the snapshot if no invalidation happened between its cache
/// miss and the end of its store read, so a slow reader can never overwrite
/// the cache with data older than a write that has already been acknowledged.
#[derive(Clone)]
pub struct ReadThroughCache {
    inner: Arc<ReadThroughCacheInner>,
}

struct ReadThroughCacheInner {
    backend: Arc<dyn SnapshotCache>,
    generation: Mutex<u64>,
}

impl ReadThroughCache {
    #[must_use]
    pub fn new(backend: Arc<dyn SnapshotCache>) -> Self {
        Self {
            inner: Arc::new(ReadThroughCacheInner {
                backend,
                generation: Mutex::new(0),
            }),
        }
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn SnapshotCache> {
        &self.inner.backend
    }

    /// Return the list-all view, loading it with `load` on a cache miss.
    ///
    /// A failure to write the freshly loaded snapshot back is logged and
    /// otherwise ignored; the loaded data is still returned.
    ///
    /// # Errors
    ///
    /// Returns the cache error (converted into `E`) if the backend read fails
    /// or the cached snapshot cannot be decoded, and whatever `load` returns.
    pub async fn get_or_load<F, Fut, E>(&self, load: F) -> Result<Vec<MealPlan>, E>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Vec<MealPlan>, E>> + Send,
        E: From<CacheError>,
    {
        let observed = *self.inner.generation.lock().await;

        match self.inner.backend.get(ALL_MEAL_PLANS_KEY).await {
            Ok(Some(raw)) => {
                debug!(key = ALL_MEAL_PLANS_KEY, "cache hit");
                return serde_json::from_str(&raw).map_err(|e| {
                    error!(key = ALL_MEAL_PLANS_KEY, error = %e, "cached snapshot is corrupt");
                    E::from(CacheError::from(e))
                });
            }
            Ok(None) => debug!(key = ALL_MEAL_PLANS_KEY, "cache miss"),
            Err(e) => {
                error!(key = ALL_MEAL_PLANS_KEY, error = %e, "cache read failed");
                return Err(e.into());
            }
        }

        let plans = load().await?;

        match serde_json::to_string(&plans) {
            Ok(raw) => {
                let generation = self.inner.generation.lock().await;
                if *generation == observed {
                    if let Err(e) = self.inner.backend.set(ALL_MEAL_PLANS_KEY, raw).await {
                        warn!(key = ALL_MEAL_PLANS_KEY, error = %e, "failed to populate cache");
                    }
                } else {
                    debug!(
                        key = ALL_MEAL_PLANS_KEY,
                        "skipping populate, snapshot was invalidated during load"
                    );
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize snapshot"),
        }

        Ok(plans)
    }

    /// Drop the list-all snapshot.
    ///
    /// The generation is bumped even if the backend delete fails, so no
    /// in-flight reader will repopulate with pre-write data.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the delete fails.
    pub async fn invalidate(&self) -> Result<(), CacheError> {
        let mut generation = self.inner.generation.lock().await;
        *generation = generation.wrapping_add(1);

        self.inner
            .backend
            .delete(ALL_MEAL_PLANS_KEY)
            .await
            .inspect_err(|e| {
                error!(key = ALL_MEAL_PLANS_KEY, error = %e, "cache invalidation failed");
            })?;

        debug!(key = ALL_MEAL_PLANS_KEY, "cache invalidated");
        Ok(())
    }
}
