//! Account management commands.
//!
//! The HTTP API has no registration endpoint; accounts are created here.
//!
//! # Usage
//!
//! ```bash
//! mp-cli user create -u chef -p 'a long password'
//! ```

use mealplan_server::services::auth::register_user;
use mealplan_server::store::PostgresStore;
use mealplan_server::store::postgres::create_pool;

use super::{CommandError, database_url};

/// Create a new account with an Argon2id password hash.
pub async fn create(username: &str, password: &str) -> Result<(), CommandError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = create_pool(&database_url).await?;
    let store = PostgresStore::new(pool);

    let user = register_user(&store, username, password).await?;

    tracing::info!(
        "User created successfully! Username: {}, Created: {}",
        user.username,
        user.created_at
    );
    Ok(())
}
