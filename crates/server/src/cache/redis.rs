//! Shared snapshot cache backed by Redis.
//!
//! Uses a `ConnectionManager`, which reconnects transparently; a command that
//! fails while the server is unreachable surfaces as [`CacheError::Redis`].

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use secrecy::{ExposeSecret, SecretString};

use super::{CacheError, SnapshotCache};

/// Snapshot cache stored in Redis with no expiry.
#[derive(Clone)]
pub struct RedisSnapshotCache {
    conn: ConnectionManager,
}

impl RedisSnapshotCache {
    /// Connect to the Redis server at `redis_url`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Redis` if the URL is invalid or the initial
    /// connection fails.
    pub async fn connect(redis_url: &SecretString) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url.expose_secret())?;
        let conn = ConnectionManager::new(client).await?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl SnapshotCache for RedisSnapshotCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: bool = conn.exists(super::ALL_MEAL_PLANS_KEY).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    //! These tests need a Redis server at `TEST_REDIS_URL`.

    use super::*;

    async fn test_cache() -> RedisSnapshotCache {
        let url = std::env::var("TEST_REDIS_URL").unwrap();
        RedisSnapshotCache::connect(&SecretString::from(url))
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore = "Requires Redis at TEST_REDIS_URL"]
    async fn test_missing_key_is_none() {
        let cache = test_cache().await;
        let key = format!("mealplan-test-{}", uuid::Uuid::new_v4());
        assert_eq!(cache.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore = "Requires Redis at TEST_REDIS_URL"]
    async fn test_set_get_delete() {
        let cache = test_cache().await;
        let key = format!("mealplan-test-{}", uuid::Uuid::new_v4());

        cache.set(&key, "[]".to_owned()).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("[]"));

        cache.delete(&key).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), None);
    }
}
