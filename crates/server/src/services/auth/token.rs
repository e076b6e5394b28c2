//! JWT issuance and verification.
//!
//! Tokens are HS256-signed with the configured secret. Both token types carry
//! the same subject and session id and differ only in `typ` and lifetime:
//!
//! | `typ` | Default lifetime | Accepted by |
//! |---|---|---|
//! | `access` | 10 minutes | `require_auth` |
//! | `refresh` | 24 hours | `POST /refresh` |

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use mealplan_core::{SessionId, Username};

/// Errors from token issuance or verification.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("expected {expected} token, got {found}")]
    WrongType {
        expected: TokenType,
        found: TokenType,
    },

    #[error("failed to encode token: {0}")]
    Encoding(String),
}

impl TokenError {
    /// Whether this is a verification failure rather than a local encoding
    /// fault.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        !matches!(self, Self::Encoding(_))
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Invalid(err.to_string()),
        }
    }
}

/// Kind of token, carried in the `typ` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Access => f.write_str("access"),
            Self::Refresh => f.write_str("refresh"),
        }
    }
}

/// JWT claims for both token types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username the token was issued to.
    pub sub: String,
    /// Sign-in session.
    pub sid: SessionId,
    pub typ: TokenType,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
    /// Issue time, seconds since the Unix epoch.
    pub iat: i64,
    /// Unique token id.
    pub jti: Uuid,
}

/// A signed token and when it stops being accepted.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies access and refresh tokens.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: &SecretString, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        let key = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            access_ttl,
            refresh_ttl,
        }
    }

    #[must_use]
    pub const fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Sign a token of type `typ` for `username` in session `sid`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if signing fails.
    pub fn issue(
        &self,
        username: &Username,
        sid: SessionId,
        typ: TokenType,
    ) -> Result<IssuedToken, TokenError> {
        let ttl = match typ {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let ttl = TimeDelta::from_std(ttl).map_err(|e| TokenError::Encoding(e.to_string()))?;
        let issued_at = Utc::now();
        let expires_at = issued_at + ttl;

        let claims = Claims {
            sub: username.as_str().to_owned(),
            sid,
            typ,
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify signature, expiry and type, returning the claims.
    ///
    /// Revocation is not checked here; that is the caller's job.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired` for an expired token,
    /// `TokenError::WrongType` when `typ` does not match `expected`, and
    /// `TokenError::Invalid` for anything malformed or wrongly signed.
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding, &validation)?.claims;
        if claims.typ != expected {
            return Err(TokenError::WrongType {
                expected,
                found: claims.typ,
            });
        }
        Ok(claims)
    }
}
