//! Authentication error types.

use thiserror::Error;

use super::token::TokenError;
use crate::store::StoreError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown user or wrong password. The two are indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Token rejected (bad signature, expired, wrong type) or could not be
    /// issued.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The session the token belongs to has been signed out.
    #[error("session has been signed out")]
    SessionRevoked,

    /// Invalid username format.
    #[error("invalid username: {0}")]
    InvalidUsername(#[from] mealplan_core::UsernameError),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Whether this error means the caller is not authenticated, as opposed
    /// to bad input or a server-side failure.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        match self {
            Self::InvalidCredentials | Self::SessionRevoked => true,
            Self::Token(e) => e.is_rejection(),
            _ => false,
        }
    }
}
