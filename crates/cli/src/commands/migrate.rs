//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! mp-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `MEALPLAN_DATABASE_URL` - `PostgreSQL` connection string, falls back to
//!   `DATABASE_URL`
//!
//! Migration files live in `crates/server/migrations/` and are embedded in
//! the server crate at compile time.

use mealplan_server::store::postgres::{MIGRATOR, create_pool};

use super::{CommandError, database_url};

/// Apply all pending migrations.
pub async fn run() -> Result<(), CommandError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = create_pool(&database_url).await?;

    tracing::info!("Running migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
