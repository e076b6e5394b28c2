//! Persistence contracts for meal plans and user credentials.
//!
//! # Backends
//!
//! - [`postgres::PostgresStore`] - durable, `PostgreSQL` via sqlx (default)
//! - [`memory::InMemoryStore`] - process-local maps, for development and tests
//!
//! Both backends implement per-key atomic updates and deletes, so concurrent
//! writers never race on a shared index. The store is constructed once at
//! startup and injected into the services that need it.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use mealplan_core::{MealPlan, MealPlanId, MealPlanPatch, Username};

use crate::models::user::User;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Constraint violation (e.g., duplicate key).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable collection of meal plan records keyed by [`MealPlanId`].
#[async_trait]
pub trait MealPlanStore: Send + Sync {
    /// Persist a fully-formed record. Fails with `Conflict` on a duplicate id.
    async fn insert(&self, plan: MealPlan) -> StoreResult<MealPlan>;

    /// Every record, ordered by `created_at` then `id`.
    async fn list_all(&self) -> StoreResult<Vec<MealPlan>>;

    async fn get(&self, id: MealPlanId) -> StoreResult<Option<MealPlan>>;

    /// Apply a validated patch atomically. Returns `None` if `id` is unknown,
    /// in which case nothing is written.
    async fn update(&self, id: MealPlanId, patch: MealPlanPatch)
    -> StoreResult<Option<MealPlan>>;

    /// Returns `true` if a record was removed.
    async fn delete(&self, id: MealPlanId) -> StoreResult<bool>;

    /// Records with a tag equal to `tag`, ignoring case.
    async fn find_by_tag(&self, tag: &str) -> StoreResult<Vec<MealPlan>>;

    async fn health_check(&self) -> StoreResult<()>;

    fn backend_name(&self) -> &'static str;
}

/// Account collection consulted by sign-in.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create an account. Fails with `Conflict` if the username is taken.
    async fn create_user(&self, username: &Username, password_hash: &str) -> StoreResult<User>;

    /// Look up an account together with its password hash.
    async fn get_password_hash(&self, username: &Username)
    -> StoreResult<Option<(User, String)>>;
}
