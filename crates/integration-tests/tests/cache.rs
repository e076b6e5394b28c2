//! End-to-end tests for the list cache: invalidation on writes and
//! fail-closed behaviour when the backend is down.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::json;

use mealplan_server::cache::{ALL_MEAL_PLANS_KEY, CacheError, MokaSnapshotCache, SnapshotCache};
use mealplan_integration_tests::TestApp;

/// Backend that refuses every operation.
struct DownCache;

#[async_trait]
impl SnapshotCache for DownCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Backend("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: String) -> Result<(), CacheError> {
        Err(CacheError::Backend("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Backend("connection refused".to_string()))
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        Err(CacheError::Backend("connection refused".to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "down"
    }
}

#[tokio::test]
async fn test_list_populates_snapshot_and_writes_clear_it() {
    let cache = Arc::new(MokaSnapshotCache::new());
    let app = TestApp::with_cache(cache.clone()).await;
    let token = app.sign_in().await;

    assert!(cache.get(ALL_MEAL_PLANS_KEY).await.unwrap().is_none());

    let res = app.get("/mealplans").await;
    assert_eq!(res.body, json!([]));
    assert_eq!(
        cache.get(ALL_MEAL_PLANS_KEY).await.unwrap().as_deref(),
        Some("[]")
    );

    let res = app
        .post("/mealplans", &json!({ "customer": "Mia" }), Some(&token))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(cache.get(ALL_MEAL_PLANS_KEY).await.unwrap().is_none());

    let res = app.get("/mealplans").await;
    assert_eq!(res.body.as_array().unwrap().len(), 1);
    assert!(cache.get(ALL_MEAL_PLANS_KEY).await.unwrap().is_some());
}

#[tokio::test]
async fn test_list_serves_snapshot_without_store() {
    let cache = Arc::new(MokaSnapshotCache::new());
    let app = TestApp::with_cache(cache.clone()).await;

    cache
        .set(ALL_MEAL_PLANS_KEY, "[]".to_string())
        .await
        .unwrap();
    let res = app.get("/mealplans").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, json!([]));
}

#[tokio::test]
async fn test_corrupt_snapshot_is_500() {
    let cache = Arc::new(MokaSnapshotCache::new());
    let app = TestApp::with_cache(cache.clone()).await;

    cache
        .set(ALL_MEAL_PLANS_KEY, "{oops".to_string())
        .await
        .unwrap();
    let res = app.get("/mealplans").await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.error(), Some("internal server error"));
}

#[tokio::test]
async fn test_cache_outage_fails_closed() {
    let app = TestApp::with_cache(Arc::new(DownCache)).await;
    let token = app.sign_in().await;

    let res = app.get("/mealplans").await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.error(), Some("internal server error"));

    // The write is durable even though invalidation failed.
    let res = app
        .post("/mealplans", &json!({ "customer": "Ned" }), Some(&token))
        .await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.store.len().await, 1);

    // Reads that bypass the cache keep working.
    let res = app.get("/mealplans/search?tag=anything").await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app.get("/health/ready").await;
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
}
