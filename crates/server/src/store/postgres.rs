//! `PostgreSQL` store backend.
//!
//! # Tables
//!
//! - `meal_plan` - meal plan records, label sets as `TEXT[]`
//! - `app_user` - accounts with Argon2id password hashes
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p mealplan-cli -- migrate
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use mealplan_core::{MealPlan, MealPlanId, MealPlanPatch, Username};

use super::{MealPlanStore, StoreError, StoreResult, UserStore};
use crate::models::user::User;

/// Embedded schema migrations for the server database.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const MEAL_PLAN_COLUMNS: &str = "id, customer, diet, contact_number, allergies, \
     avoided_ingredients, delivery_monday, delivery_tuesday, tags, created_at";

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[derive(sqlx::FromRow)]
struct MealPlanRow {
    id: MealPlanId,
    customer: String,
    diet: String,
    contact_number: String,
    allergies: Vec<String>,
    avoided_ingredients: Vec<String>,
    delivery_monday: DateTime<Utc>,
    delivery_tuesday: DateTime<Utc>,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
}

impl From<MealPlanRow> for MealPlan {
    fn from(r: MealPlanRow) -> Self {
        Self {
            id: r.id,
            customer: r.customer,
            diet: r.diet,
            contact_number: r.contact_number,
            allergies: r.allergies,
            avoided_ingredients: r.avoided_ingredients,
            delivery_monday: r.delivery_monday,
            delivery_tuesday: r.delivery_tuesday,
            tags: r.tags,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

/// Map a unique-violation into `Conflict`, everything else into `Database`.
fn conflict_or_database(e: sqlx::Error, what: &str) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return StoreError::Conflict(format!("{what} already exists"));
    }
    StoreError::Database(e)
}

/// Store backed by a shared `PgPool`.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MealPlanStore for PostgresStore {
    async fn insert(&self, plan: MealPlan) -> StoreResult<MealPlan> {
        let row: MealPlanRow = sqlx::query_as(&format!(
            r"
            INSERT INTO meal_plan ({MEAL_PLAN_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {MEAL_PLAN_COLUMNS}
            "
        ))
        .bind(plan.id)
        .bind(&plan.customer)
        .bind(&plan.diet)
        .bind(&plan.contact_number)
        .bind(&plan.allergies)
        .bind(&plan.avoided_ingredients)
        .bind(plan.delivery_monday)
        .bind(plan.delivery_tuesday)
        .bind(&plan.tags)
        .bind(plan.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "meal plan id"))?;

        Ok(row.into())
    }

    async fn list_all(&self) -> StoreResult<Vec<MealPlan>> {
        let rows: Vec<MealPlanRow> = sqlx::query_as(&format!(
            "SELECT {MEAL_PLAN_COLUMNS} FROM meal_plan ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MealPlan::from).collect())
    }

    async fn get(&self, id: MealPlanId) -> StoreResult<Option<MealPlan>> {
        let row: Option<MealPlanRow> = sqlx::query_as(&format!(
            "SELECT {MEAL_PLAN_COLUMNS} FROM meal_plan WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(MealPlan::from))
    }

    async fn update(
        &self,
        id: MealPlanId,
        patch: MealPlanPatch,
    ) -> StoreResult<Option<MealPlan>> {
        // Single statement so the read-modify-write is atomic per row.
        let row: Option<MealPlanRow> = sqlx::query_as(&format!(
            r"
            UPDATE meal_plan SET
                customer            = COALESCE($2, customer),
                diet                = COALESCE($3, diet),
                contact_number      = COALESCE($4, contact_number),
                allergies           = COALESCE($5, allergies),
                avoided_ingredients = COALESCE($6, avoided_ingredients),
                delivery_monday     = COALESCE($7, delivery_monday),
                delivery_tuesday    = COALESCE($8, delivery_tuesday),
                tags                = COALESCE($9, tags)
            WHERE id = $1
            RETURNING {MEAL_PLAN_COLUMNS}
            "
        ))
        .bind(id)
        .bind(patch.customer)
        .bind(patch.diet)
        .bind(patch.contact_number)
        .bind(patch.allergies)
        .bind(patch.avoided_ingredients)
        .bind(patch.delivery_monday)
        .bind(patch.delivery_tuesday)
        .bind(patch.tags)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(MealPlan::from))
    }

    async fn delete(&self, id: MealPlanId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM meal_plan WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_tag(&self, tag: &str) -> StoreResult<Vec<MealPlan>> {
        // Folded with `MealPlan::has_tag`, as in the in-memory backend.
        // Postgres `lower()` differs from `str::to_lowercase` for final sigma
        // and dotted capital I.
        let rows: Vec<MealPlanRow> = sqlx::query_as(&format!(
            r"
            SELECT {MEAL_PLAN_COLUMNS}
            FROM meal_plan
            WHERE cardinality(tags) > 0
            ORDER BY created_at ASC, id ASC
            "
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(MealPlan::from)
            .filter(|plan| plan.has_tag(tag))
            .collect())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn create_user(&self, username: &Username, password_hash: &str) -> StoreResult<User> {
        let row: UserRow = sqlx::query_as(
            r"
            INSERT INTO app_user (username, password_hash)
            VALUES ($1, $2)
            RETURNING username, password_hash, created_at
            ",
        )
        .bind(username.as_str())
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "username"))?;

        user_from_row(row).map(|(user, _)| user)
    }

    async fn get_password_hash(
        &self,
        username: &Username,
    ) -> StoreResult<Option<(User, String)>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT username, password_hash, created_at FROM app_user WHERE username = $1",
        )
        .bind(username.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(user_from_row).transpose()
    }
}

fn user_from_row(r: UserRow) -> StoreResult<(User, String)> {
    let username = Username::parse(&r.username)
        .map_err(|e| StoreError::DataCorruption(format!("invalid username in database: {e}")))?;

    Ok((
        User {
            username,
            created_at: r.created_at,
        },
        r.password_hash,
    ))
}
