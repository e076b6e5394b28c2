//! Request-scoped authentication types.

use serde::{Deserialize, Serialize};

use mealplan_core::{SessionId, Username};

/// Identity attached to a request that passed the auth gate.
///
/// Inserted into request extensions by
/// [`require_auth`](crate::middleware::require_auth) and read back with the
/// [`CurrentUser`](crate::middleware::CurrentUser) extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Account the access token was issued to.
    pub username: Username,
    /// Sign-in session the token belongs to.
    pub session_id: SessionId,
}
