//! Application state shared across handlers.

use std::sync::Arc;

use crate::cache::{ReadThroughCache, SnapshotCache};
use crate::config::ServerConfig;
use crate::services::auth::TokenIssuer;
use crate::services::{AuthService, MealPlanService};
use crate::store::{MealPlanStore, UserStore};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Backends are chosen once at startup and
/// injected here; handlers only see the services.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    meal_plans: MealPlanService,
    auth: AuthService,
}

impl AppState {
    /// Wire the services from the chosen backends.
    #[must_use]
    pub fn new(
        config: &ServerConfig,
        store: Arc<dyn MealPlanStore>,
        users: Arc<dyn UserStore>,
        cache_backend: Arc<dyn SnapshotCache>,
    ) -> Self {
        let cache = ReadThroughCache::new(cache_backend);
        let meal_plans = MealPlanService::new(store, cache);

        let tokens = TokenIssuer::new(
            &config.jwt_secret,
            config.access_token_ttl,
            config.refresh_token_ttl,
        );
        let auth = AuthService::new(users, tokens);

        Self {
            inner: Arc::new(AppStateInner {
                meal_plans,
                auth,
            }),
        }
    }

    #[must_use]
    pub fn meal_plans(&self) -> &MealPlanService {
        &self.inner.meal_plans
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    /// The raw snapshot cache, for readiness checks.
    #[must_use]
    pub fn cache_backend(&self) -> &Arc<dyn SnapshotCache> {
        self.inner.meal_plans.cache().backend()
    }
}
