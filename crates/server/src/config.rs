//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MEALPLAN_JWT_SECRET` - HS256 signing secret (min 32 chars, high entropy)
//! - `MEALPLAN_DATABASE_URL` - `PostgreSQL` connection string, falls back to
//!   `DATABASE_URL` (only when `MEALPLAN_STORE=postgres`)
//!
//! ## Optional
//! - `MEALPLAN_HOST` - Bind address (default: 127.0.0.1)
//! - `MEALPLAN_PORT` - Listen port (default: 8080)
//! - `MEALPLAN_STORE` - `postgres` or `memory` (default: postgres)
//! - `MEALPLAN_CACHE` - `memory` or `redis` (default: memory)
//! - `MEALPLAN_REDIS_URL` - Redis address (default: `redis://127.0.0.1:6379`)
//! - `MEALPLAN_ACCESS_TOKEN_TTL_SECS` - Access token lifetime (default: 600)
//! - `MEALPLAN_REFRESH_TOKEN_TTL_SECS` - Refresh token lifetime (default: 86400)
//! - `MEALPLAN_TLS_CERT` / `MEALPLAN_TLS_KEY` - PEM file paths, both or neither
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text

use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Longest accepted token lifetime (30 days).
const MAX_TOKEN_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Which [`MealPlanStore`](crate::store::MealPlanStore) backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend '{other}' (expected postgres or memory)")),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Postgres => f.write_str("postgres"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

/// Which [`SnapshotCache`](crate::cache::SnapshotCache) backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
    Redis,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "moka" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(format!("unknown cache backend '{other}' (expected memory or redis)")),
        }
    }
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Redis => f.write_str("redis"),
        }
    }
}

/// TLS certificate and key locations.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// PEM-encoded certificate chain file
    pub cert_path: PathBuf,
    /// PEM-encoded private key file
    pub key_path: PathBuf,
}

impl TlsConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let cert = get_optional_env("MEALPLAN_TLS_CERT");
        let key = get_optional_env("MEALPLAN_TLS_KEY");

        match (cert, key) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "MEALPLAN_TLS_*".to_string(),
                "Both MEALPLAN_TLS_CERT and MEALPLAN_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Store backend
    pub store: StoreBackend,
    /// `PostgreSQL` connection URL (contains password). Set when `store` is
    /// `Postgres`.
    pub database_url: Option<SecretString>,
    /// Cache backend
    pub cache: CacheBackend,
    /// Redis connection URL (may contain password)
    pub redis_url: SecretString,
    /// HS256 token signing secret
    pub jwt_secret: SecretString,
    /// Access token lifetime
    pub access_token_ttl: Duration,
    /// Refresh token lifetime, always longer than `access_token_ttl`
    pub refresh_token_ttl: Duration,
    /// HTTPS settings; plain HTTP when `None`
    pub tls: Option<TlsConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. production, staging)
    pub sentry_environment: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default::<IpAddr>("MEALPLAN_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("MEALPLAN_PORT", "8080")?;

        let store = parse_env_or_default::<StoreBackend>("MEALPLAN_STORE", "postgres")?;
        let database_url = match store {
            StoreBackend::Postgres => Some(get_database_url("MEALPLAN_DATABASE_URL")?),
            StoreBackend::Memory => None,
        };

        let cache = parse_env_or_default::<CacheBackend>("MEALPLAN_CACHE", "memory")?;
        let redis_url = SecretString::from(get_env_or_default(
            "MEALPLAN_REDIS_URL",
            "redis://127.0.0.1:6379",
        ));

        let jwt_secret = get_validated_secret("MEALPLAN_JWT_SECRET")?;
        validate_jwt_secret(&jwt_secret, "MEALPLAN_JWT_SECRET")?;

        let access_token_ttl = parse_ttl("MEALPLAN_ACCESS_TOKEN_TTL_SECS", "600")?;
        let refresh_token_ttl = parse_ttl("MEALPLAN_REFRESH_TOKEN_TTL_SECS", "86400")?;
        validate_ttls(access_token_ttl, refresh_token_ttl)?;

        Ok(Self {
            host,
            port,
            store,
            database_url,
            cache,
            redis_url,
            jwt_secret,
            access_token_ttl,
            refresh_token_ttl,
            tls: TlsConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a token lifetime in whole seconds.
fn parse_ttl(key: &str, default: &str) -> Result<Duration, ConfigError> {
    let secs = parse_env_or_default::<u64>(key, default)?;
    if secs == 0 || secs > MAX_TOKEN_TTL_SECS {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 1 and {MAX_TOKEN_TTL_SECS} seconds"),
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// The refresh token must outlive the access token it renews.
fn validate_ttls(access: Duration, refresh: Duration) -> Result<(), ConfigError> {
    if refresh <= access {
        return Err(ConfigError::InvalidEnvVar(
            "MEALPLAN_REFRESH_TOKEN_TTL_SECS".to_string(),
            format!(
                "must be greater than the access token lifetime ({}s)",
                access.as_secs()
            ),
        ));
    }
    Ok(())
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_jwt_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Shannon entropy of `s` in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    let mut total = 0_u32;
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = f64::from(total);
    counts
        .into_values()
        .map(|count| {
            let p = f64::from(count) / total;
            -p * p.log2()
        })
        .sum()
}

/// Reject placeholder values and secrets too predictable to sign tokens with.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let insecure = |reason: String| ConfigError::InsecureSecret(var_name.to_string(), reason);

    let lower = secret.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(**p)) {
        return Err(insecure(format!("looks like a placeholder ('{pattern}')")));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(insecure(format!(
            "entropy {entropy:.2} bits/char is below {MIN_ENTROPY_BITS_PER_CHAR:.1}; \
             generate the secret randomly, e.g. `openssl rand -base64 48`"
        )));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
