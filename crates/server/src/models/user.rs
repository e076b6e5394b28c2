//! User domain types.

use chrono::{DateTime, Utc};

use mealplan_core::Username;

/// An account that may sign in and modify meal plans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique login name.
    pub username: Username,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}
