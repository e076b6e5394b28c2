//! Meal plan gateway.
//!
//! Owns the injected [`MealPlanStore`] and the [`ReadThroughCache`]. Every
//! successful write invalidates the list-all snapshot before returning, so the
//! next list reflects the write.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use thiserror::Error;
use tracing::{error, info, instrument};

use mealplan_core::{MealPlan, MealPlanId, MealPlanPatch, NewMealPlan, ValidationError};

use crate::cache::{CacheError, ReadThroughCache};
use crate::store::{MealPlanStore, StoreError};

/// Stored timestamps keep microsecond precision on every backend.
const TIMESTAMP_DIGITS: u16 = 6;

/// Errors returned by [`MealPlanService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("tag query parameter is required")]
    MissingTag,

    #[error("meal plan not found")]
    NotFound,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

/// CRUD and search over meal plans.
#[derive(Clone)]
pub struct MealPlanService {
    store: Arc<dyn MealPlanStore>,
    cache: ReadThroughCache,
}

impl MealPlanService {
    #[must_use]
    pub fn new(store: Arc<dyn MealPlanStore>, cache: ReadThroughCache) -> Self {
        Self { store, cache }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn MealPlanStore> {
        &self.store
    }

    #[must_use]
    pub const fn cache(&self) -> &ReadThroughCache {
        &self.cache
    }

    /// Validate and persist a new meal plan with a fresh id and creation time.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for a rejected payload, and
    /// `Store`/`Cache` errors from the write or its invalidation.
    #[instrument(skip_all)]
    pub async fn create(&self, new: NewMealPlan) -> Result<MealPlan, ServiceError> {
        let mut plan = new.into_meal_plan(MealPlanId::generate(), now())?;
        plan.delivery_monday = truncate(plan.delivery_monday);
        plan.delivery_tuesday = truncate(plan.delivery_tuesday);

        let stored = self.store.insert(plan).await?;
        self.invalidate_after_write("create", stored.id).await?;

        info!(id = %stored.id, "meal plan created");
        Ok(stored)
    }

    /// All meal plans, ordered by creation time then id.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Cache` if the cache read fails or holds an
    /// undecodable snapshot; the store is not consulted in that case.
    pub async fn list(&self) -> Result<Vec<MealPlan>, ServiceError> {
        let store = Arc::clone(&self.store);
        self.cache
            .get_or_load(move || async move { Ok::<_, ServiceError>(store.list_all().await?) })
            .await
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if no meal plan has this id.
    pub async fn get(&self, id: MealPlanId) -> Result<MealPlan, ServiceError> {
        self.store.get(id).await?.ok_or(ServiceError::NotFound)
    }

    /// Apply a partial update. The patch is validated before the store is
    /// touched; an unknown id writes nothing and invalidates nothing.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for an empty or invalid patch and
    /// `ServiceError::NotFound` for an unknown id.
    #[instrument(skip_all, fields(id = %id))]
    pub async fn update(
        &self,
        id: MealPlanId,
        patch: MealPlanPatch,
    ) -> Result<MealPlan, ServiceError> {
        let mut patch = patch.validate()?;
        patch.delivery_monday = patch.delivery_monday.map(truncate);
        patch.delivery_tuesday = patch.delivery_tuesday.map(truncate);

        let updated = self
            .store
            .update(id, patch)
            .await?
            .ok_or(ServiceError::NotFound)?;
        self.invalidate_after_write("update", id).await?;

        info!("meal plan updated");
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if no meal plan has this id.
    #[instrument(skip_all, fields(id = %id))]
    pub async fn delete(&self, id: MealPlanId) -> Result<(), ServiceError> {
        if !self.store.delete(id).await? {
            return Err(ServiceError::NotFound);
        }
        self.invalidate_after_write("delete", id).await?;

        info!("meal plan deleted");
        Ok(())
    }

    /// Meal plans with a tag equal to `tag`, ignoring case. Always reads the
    /// store.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::MissingTag` for a blank tag.
    pub async fn search_by_tag(&self, tag: &str) -> Result<Vec<MealPlan>, ServiceError> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(ServiceError::MissingTag);
        }
        Ok(self.store.find_by_tag(tag).await?)
    }

    async fn invalidate_after_write(
        &self,
        op: &'static str,
        id: MealPlanId,
    ) -> Result<(), ServiceError> {
        self.cache.invalidate().await.map_err(|e| {
            error!(
                op,
                id = %id,
                error = %e,
                "write persisted but list cache was not invalidated"
            );
            ServiceError::Cache(e)
        })
    }
}

fn now() -> DateTime<Utc> {
    truncate(Utc::now())
}

fn truncate(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(TIMESTAMP_DIGITS)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::cache::tests::FailingCache;
    use crate::cache::{ALL_MEAL_PLANS_KEY, MokaSnapshotCache, SnapshotCache};
    use crate::store::InMemoryStore;

    struct Harness {
        service: MealPlanService,
        store: InMemoryStore,
        snapshots: Arc<MokaSnapshotCache>,
    }

    fn harness() -> Harness {
        let store = InMemoryStore::new();
        let snapshots = Arc::new(MokaSnapshotCache::new());
        let service = MealPlanService::new(
            Arc::new(store.clone()),
            ReadThroughCache::new(snapshots.clone()),
        );
        Harness {
            service,
            store,
            snapshots,
        }
    }

    fn new_plan(customer: &str, tags: &[&str]) -> NewMealPlan {
        serde_json::from_value(json!({ "customer": customer, "tags": tags })).unwrap()
    }

    async fn is_cached(h: &Harness) -> bool {
        h.snapshots.get(ALL_MEAL_PLANS_KEY).await.unwrap().is_some()
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let h = harness();
        let created = h.service.create(new_plan("Ana", &["vegan"])).await.unwrap();

        let fetched = h.service.get(created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.customer, "Ana");
        assert_eq!(fetched.created_at.timestamp_subsec_nanos() % 1_000, 0);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_customer() {
        let h = harness();
        let err = h.service.create(new_plan("  ", &[])).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::MissingCustomer)
        ));
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_writes_invalidate_list() {
        let h = harness();
        assert!(h.service.list().await.unwrap().is_empty());
        assert!(is_cached(&h).await);

        let created = h.service.create(new_plan("Ana", &[])).await.unwrap();
        assert!(!is_cached(&h).await);
        assert_eq!(h.service.list().await.unwrap(), vec![created.clone()]);

        let patch = MealPlanPatch {
            diet: Some("keto".to_string()),
            ..MealPlanPatch::default()
        };
        h.service.update(created.id, patch).await.unwrap();
        assert!(!is_cached(&h).await);
        assert_eq!(h.service.list().await.unwrap().first().unwrap().diet, "keto");

        h.service.delete(created.id).await.unwrap();
        assert!(!is_cached(&h).await);
        assert!(h.service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_touches_nothing() {
        let h = harness();
        h.service.list().await.unwrap();
        assert!(is_cached(&h).await);

        let patch = MealPlanPatch {
            diet: Some("keto".to_string()),
            ..MealPlanPatch::default()
        };
        let err = h
            .service
            .update(MealPlanId::generate(), patch)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::NotFound));
        assert!(h.store.is_empty().await);
        assert!(is_cached(&h).await);
    }

    #[tokio::test]
    async fn test_update_preserves_identity_fields() {
        let h = harness();
        let created = h.service.create(new_plan("Ana", &["vegan"])).await.unwrap();

        let patch = MealPlanPatch {
            customer: Some("Bea".to_string()),
            ..MealPlanPatch::default()
        };
        let updated = h.service.update(created.id, patch).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.customer, "Bea");
        assert_eq!(updated.tags, created.tags);
    }

    #[tokio::test]
    async fn test_empty_patch_is_rejected() {
        let h = harness();
        let created = h.service.create(new_plan("Ana", &[])).await.unwrap();

        let err = h
            .service
            .update(created.id, MealPlanPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::EmptyPatch)
        ));
    }

    #[tokio::test]
    async fn test_delete_unknown_is_not_found() {
        let h = harness();
        let err = h.service.delete(MealPlanId::generate()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound));
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let h = harness();
        let vegan = h.service.create(new_plan("Ana", &["vegan"])).await.unwrap();
        h.service.create(new_plan("Ben", &["keto"])).await.unwrap();

        let found = h.service.search_by_tag("VEGAN").await.unwrap();
        assert_eq!(found, vec![vegan]);
        assert!(h.service.search_by_tag("paleo").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_rejects_blank_tag() {
        let h = harness();
        let err = h.service.search_by_tag("   ").await.unwrap_err();
        assert!(matches!(err, ServiceError::MissingTag));
    }

    #[tokio::test]
    async fn test_cache_failure_is_surfaced_but_write_persists() {
        let store = InMemoryStore::new();
        let service = MealPlanService::new(
            Arc::new(store.clone()),
            ReadThroughCache::new(Arc::new(FailingCache)),
        );

        let err = service.create(new_plan("Ana", &[])).await.unwrap_err();
        assert!(matches!(err, ServiceError::Cache(_)));
        assert_eq!(store.len().await, 1);

        let err = service.list().await.unwrap_err();
        assert!(matches!(err, ServiceError::Cache(_)));
    }
}
