//! Authentication service.
//!
//! Password sign-in backed by Argon2id hashes in the [`UserStore`], and
//! stateless JWT sessions. A session is identified by the `sid` shared by its
//! access and refresh tokens; signing out revokes the `sid`, which kills both.
//!
//! Revoked session ids are held in a `moka` cache for the refresh token
//! lifetime. Past that point every token of the session has expired anyway.
//! The cache has no size bound: a size-bounded moka cache may refuse new
//! entries, and a refused revocation would leave the session usable.

mod error;
pub mod token;

pub use error::AuthError;
pub use token::{Claims, IssuedToken, TokenError, TokenIssuer, TokenType};

use std::sync::{Arc, LazyLock};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use moka::future::Cache;
use tracing::{info, instrument, warn};

use mealplan_core::{SessionId, Username};

use crate::models::{AuthenticatedUser, User};
use crate::store::{StoreError, UserStore};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash checked when the username is unknown, so a miss costs the same
/// Argon2 work as a wrong password.
static DUMMY_PASSWORD_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("no such account, constant-time filler").ok());

/// Token pair returned by a successful sign-in.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub session_id: SessionId,
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Sign-in, refresh, sign-out and registration.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenIssuer>,
    revoked: Cache<SessionId, ()>,
}

impl AuthService {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, tokens: TokenIssuer) -> Self {
        let revoked = Cache::builder()
            .time_to_live(tokens.refresh_ttl())
            .build();

        Self {
            users,
            tokens: Arc::new(tokens),
            revoked,
        }
    }

    /// Verify credentials and open a new session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown user or a wrong
    /// password.
    #[instrument(skip_all, fields(username = %username))]
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<SignedIn, AuthError> {
        let username = Username::parse(username).map_err(|_| AuthError::InvalidCredentials)?;

        let Some((user, password_hash)) = self.users.get_password_hash(&username).await? else {
            verify_dummy_password(password);
            warn!("sign-in rejected");
            return Err(AuthError::InvalidCredentials);
        };

        if let Err(e) = verify_password(password, &password_hash) {
            warn!("sign-in rejected");
            return Err(e);
        }

        let session_id = SessionId::generate();
        let access = self
            .tokens
            .issue(&user.username, session_id, TokenType::Access)?;
        let refresh = self
            .tokens
            .issue(&user.username, session_id, TokenType::Refresh)?;

        info!(session_id = %session_id, "signed in");
        Ok(SignedIn {
            session_id,
            access,
            refresh,
        })
    }

    /// Issue a new access token for the session a refresh token belongs to.
    /// The password is not checked again.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` for an expired, malformed or wrongly typed
    /// token, and `AuthError::SessionRevoked` after sign-out.
    pub async fn refresh(&self, refresh_token: &str) -> Result<IssuedToken, AuthError> {
        let (username, session_id) = self.verify(refresh_token, TokenType::Refresh).await?;
        let access = self
            .tokens
            .issue(&username, session_id, TokenType::Access)?;

        info!(session_id = %session_id, "access token refreshed");
        Ok(access)
    }

    /// Validate an access token and return the identity it carries.
    ///
    /// # Errors
    ///
    /// Same as [`refresh`](Self::refresh), but for access tokens.
    pub async fn authenticate(&self, access_token: &str) -> Result<AuthenticatedUser, AuthError> {
        let (username, session_id) = self.verify(access_token, TokenType::Access).await?;
        Ok(AuthenticatedUser {
            username,
            session_id,
        })
    }

    /// Revoke a session. Signing out twice is not an error.
    pub async fn sign_out(&self, session_id: SessionId) {
        self.revoked.insert(session_id, ()).await;
        info!(session_id = %session_id, "signed out");
    }

    /// Revoke the session an access token belongs to.
    ///
    /// The token only has to be validly signed, unexpired and of type access;
    /// a token whose session is already revoked is accepted, so repeating a
    /// sign-out succeeds.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` for an expired, malformed or wrongly typed
    /// token.
    pub async fn sign_out_token(&self, access_token: &str) -> Result<SessionId, AuthError> {
        let claims = self.tokens.verify(access_token, TokenType::Access)?;
        self.sign_out(claims.sid).await;
        Ok(claims.sid)
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUsername`, `AuthError::WeakPassword`, or
    /// `AuthError::UserAlreadyExists`.
    pub async fn register_user(&self, username: &str, password: &str) -> Result<User, AuthError> {
        register_user(self.users.as_ref(), username, password).await
    }

    async fn verify(
        &self,
        token: &str,
        expected: TokenType,
    ) -> Result<(Username, SessionId), AuthError> {
        let claims = self.tokens.verify(token, expected)?;
        if self.revoked.contains_key(&claims.sid) {
            return Err(AuthError::SessionRevoked);
        }

        let username = Username::parse(&claims.sub)
            .map_err(|e| TokenError::Invalid(format!("bad subject: {e}")))?;
        Ok((username, claims.sid))
    }
}

/// Create an account directly against a [`UserStore`].
///
/// Used by the service and by the `mp-cli user create` command, which has no
/// token issuer.
///
/// # Errors
///
/// Returns `AuthError::InvalidUsername`, `AuthError::WeakPassword`, or
/// `AuthError::UserAlreadyExists`.
pub async fn register_user(
    users: &dyn UserStore,
    username: &str,
    password: &str,
) -> Result<User, AuthError> {
    let username = Username::parse(username)?;
    validate_password(password)?;
    let password_hash = hash_password(password)?;

    let user = users
        .create_user(&username, &password_hash)
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Store(other),
        })?;
    info!(username = %user.username, "user registered");
    Ok(user)
}

/// Validate password strength.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Run a verification against [`DUMMY_PASSWORD_HASH`] and discard the result.
fn verify_dummy_password(password: &str) {
    if let Some(hash) = DUMMY_PASSWORD_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
