//! Subcommand implementations.

pub mod migrate;
pub mod user;

use secrecy::SecretString;
use thiserror::Error;

use mealplan_server::services::AuthError;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed to apply.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Account could not be created.
    #[error("{0}")]
    Auth(#[from] AuthError),
}

/// Read the database URL, preferring `MEALPLAN_DATABASE_URL` over
/// `DATABASE_URL`.
fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("MEALPLAN_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("MEALPLAN_DATABASE_URL"))
}
