//! Process-local snapshot cache backed by `moka`.

use async_trait::async_trait;
use moka::future::Cache;

use super::{CacheError, SnapshotCache};

/// In-memory snapshot cache. Entries never expire; they are only removed by
/// explicit deletes.
#[derive(Clone)]
pub struct MokaSnapshotCache {
    cache: Cache<String, String>,
}

impl MokaSnapshotCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().max_capacity(64).build(),
        }
    }
}

impl Default for MokaSnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotCache for MokaSnapshotCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.cache.get(&key.to_owned()).await)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.cache.insert(key.to_owned(), value).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.cache.invalidate(&key.to_owned()).await;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_absent_key_is_none() {
        let cache = MokaSnapshotCache::new();
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_delete() {
        let cache = MokaSnapshotCache::new();
        cache.set("k", "[]".to_owned()).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("[]"));

        cache.delete("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);

        // Deleting again is fine.
        cache.delete("k").await.unwrap();
    }
}
