//! In-memory implementation of the store contracts.
//!
//! # Purpose
//! Implements [`MealPlanStore`] and [`UserStore`] with `HashMap`s guarded by
//! `tokio::sync::RwLock`. It exists for local development (`MEALPLAN_STORE=memory`)
//! and for tests that need an isolated store with no external dependencies.
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - **Single-process consistency**: updates and deletes take the write lock,
//!   so each operation on a key is atomic with respect to every other.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use mealplan_core::{MealPlan, MealPlanId, MealPlanPatch, Username};

use super::{MealPlanStore, StoreError, StoreResult, UserStore};
use crate::models::user::User;

/// Process-local store. Cloning shares the same underlying maps.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    plans: Arc<RwLock<HashMap<MealPlanId, MealPlan>>>,
    users: Arc<RwLock<HashMap<Username, (User, String)>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored meal plans.
    pub async fn len(&self) -> usize {
        self.plans.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.plans.read().await.is_empty()
    }
}

fn sorted(mut plans: Vec<MealPlan>) -> Vec<MealPlan> {
    plans.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    plans
}

#[async_trait]
impl MealPlanStore for InMemoryStore {
    async fn insert(&self, plan: MealPlan) -> StoreResult<MealPlan> {
        let mut plans = self.plans.write().await;
        if plans.contains_key(&plan.id) {
            return Err(StoreError::Conflict(
                "meal plan id already exists".to_owned(),
            ));
        }
        plans.insert(plan.id, plan.clone());
        Ok(plan)
    }

    async fn list_all(&self) -> StoreResult<Vec<MealPlan>> {
        let plans = self.plans.read().await;
        Ok(sorted(plans.values().cloned().collect()))
    }

    async fn get(&self, id: MealPlanId) -> StoreResult<Option<MealPlan>> {
        Ok(self.plans.read().await.get(&id).cloned())
    }

    async fn update(
        &self,
        id: MealPlanId,
        patch: MealPlanPatch,
    ) -> StoreResult<Option<MealPlan>> {
        let mut plans = self.plans.write().await;
        let Some(plan) = plans.get_mut(&id) else {
            return Ok(None);
        };
        plan.apply(patch);
        Ok(Some(plan.clone()))
    }

    async fn delete(&self, id: MealPlanId) -> StoreResult<bool> {
        Ok(self.plans.write().await.remove(&id).is_some())
    }

    async fn find_by_tag(&self, tag: &str) -> StoreResult<Vec<MealPlan>> {
        let plans = self.plans.read().await;
        Ok(sorted(
            plans.values().filter(|p| p.has_tag(tag)).cloned().collect(),
        ))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, username: &Username, password_hash: &str) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.contains_key(username) {
            return Err(StoreError::Conflict("username already exists".to_owned()));
        }
        let user = User {
            username: username.clone(),
            created_at: Utc::now(),
        };
        users.insert(
            username.clone(),
            (user.clone(), password_hash.to_owned()),
        );
        Ok(user)
    }

    async fn get_password_hash(
        &self,
        username: &Username,
    ) -> StoreResult<Option<(User, String)>> {
        Ok(self.users.read().await.get(username).cloned())
    }
}
