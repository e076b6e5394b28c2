//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health               - Liveness
//! GET    /health/ready         - Readiness (store + cache)
//!
//! # Meal plans
//! GET    /mealplans            - List all (cached)
//! POST   /mealplans            - Create (auth)
//! GET    /mealplans/search     - Tag search, ?tag=X
//! GET    /mealplans/{id}       - Get one
//! PUT    /mealplans/{id}       - Partial update (auth)
//! DELETE /mealplans/{id}       - Delete (auth)
//!
//! # Auth
//! POST   /signin               - Username/password to token pair
//! POST   /refresh              - Refresh token to new access token
//! POST   /signout              - Revoke the current session (bearer, repeatable)
//! ```

pub mod auth;
pub mod health;
pub mod meal_plans;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};

use crate::middleware::{auth_rate_limiter, require_auth};
use crate::state::AppState;

/// Create the API router.
///
/// Each path has a single method router so an unsupported method gets 405
/// before authentication runs; `require_auth` wraps only the mutating
/// handlers. `/signout` checks its own token (see [`auth::sign_out`]).
///
/// With `rate_limit_credentials`, `/signin` and `/refresh` are limited per
/// client IP.
pub fn routes(state: &AppState, rate_limit_credentials: bool) -> Router<AppState> {
    let auth_layer = from_fn_with_state(state.clone(), require_auth);

    let api = Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route(
            "/mealplans",
            get(meal_plans::list)
                .merge(post(meal_plans::create).route_layer(auth_layer.clone())),
        )
        .route("/mealplans/search", get(meal_plans::search))
        .route(
            "/mealplans/{id}",
            get(meal_plans::get).merge(
                put(meal_plans::update)
                    .delete(meal_plans::delete)
                    .route_layer(auth_layer),
            ),
        )
        .route("/signout", post(auth::sign_out));

    let mut credentials = Router::new()
        .route("/signin", post(auth::sign_in))
        .route("/refresh", post(auth::refresh));
    if rate_limit_credentials {
        credentials = credentials.layer(auth_rate_limiter());
    }

    api.merge(credentials)
}
