//! Domain models for the server.
//!
//! Meal plan types live in `mealplan-core`; this module holds the types that
//! only the server needs (accounts and authenticated identities).

pub mod session;
pub mod user;

pub use session::AuthenticatedUser;
pub use user::User;
