//! Meal plan route handlers.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use mealplan_core::{MealPlan, MealPlanId, MealPlanPatch, NewMealPlan};

use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::services::ServiceError;
use crate::state::AppState;

/// Body for responses that only confirm an action.
#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub tag: Option<String>,
}

/// A path segment that is not a UUID cannot name a meal plan.
fn parse_id(raw: &str) -> Result<MealPlanId> {
    raw.parse().map_err(|_| {
        debug!(id = raw, "path id is not a uuid");
        AppError::from(ServiceError::NotFound)
    })
}

/// `GET /mealplans`
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<MealPlan>>> {
    Ok(Json(state.meal_plans().list().await?))
}

/// `POST /mealplans`
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: std::result::Result<Json<NewMealPlan>, JsonRejection>,
) -> Result<Json<MealPlan>> {
    let Json(new) = payload?;
    let created = state.meal_plans().create(new).await?;

    debug!(id = %created.id, username = %user.username, "created by");
    Ok(Json(created))
}

/// `GET /mealplans/search?tag=X`
pub async fn search(
    State(state): State<AppState>,
    params: std::result::Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<MealPlan>>> {
    let Query(params) = params?;
    let tag = params.tag.unwrap_or_default();
    Ok(Json(state.meal_plans().search_by_tag(&tag).await?))
}

/// `GET /mealplans/{id}`
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<MealPlan>> {
    let id = parse_id(&id)?;
    Ok(Json(state.meal_plans().get(id).await?))
}

/// `PUT /mealplans/{id}`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CurrentUser(user): CurrentUser,
    payload: std::result::Result<Json<MealPlanPatch>, JsonRejection>,
) -> Result<Json<MealPlan>> {
    let id = parse_id(&id)?;
    let Json(patch) = payload?;
    let updated = state.meal_plans().update(id, patch).await?;

    debug!(id = %id, username = %user.username, "updated by");
    Ok(Json(updated))
}

/// `DELETE /mealplans/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MessageBody>> {
    let id = parse_id(&id)?;
    state.meal_plans().delete(id).await?;

    debug!(id = %id, username = %user.username, "deleted by");
    Ok(Json(MessageBody {
        message: "meal plan deleted".to_string(),
    }))
}
