//! Business logic services.
//!
//! # Services
//!
//! - [`meal_plans`] - CRUD and tag search over meal plans, with the list-all
//!   view served through the read-through cache
//! - [`auth`] - Sign-in, token refresh, sign-out and account registration

pub mod auth;
pub mod meal_plans;

pub use auth::{AuthError, AuthService};
pub use meal_plans::{MealPlanService, ServiceError};
