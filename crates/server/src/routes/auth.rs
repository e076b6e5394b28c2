//! Sign-in, refresh and sign-out handlers.

use axum::{Json, extract::State, extract::rejection::JsonRejection, http::HeaderMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::meal_plans::MessageBody;
use crate::error::{AppError, Result};
use crate::middleware::bearer_token;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// `POST /signin`
pub async fn sign_in(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Json<SignInResponse>> {
    let Json(req) = payload?;
    let signed_in = state.auth().sign_in(&req.username, &req.password).await?;

    Ok(Json(SignInResponse {
        access_token: signed_in.access.token,
        access_expires_at: signed_in.access.expires_at,
        refresh_token: signed_in.refresh.token,
        refresh_expires_at: signed_in.refresh.expires_at,
    }))
}

/// `POST /refresh`
pub async fn refresh(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>> {
    let Json(req) = payload?;
    let access = state.auth().refresh(&req.refresh_token).await?;

    Ok(Json(RefreshResponse {
        access_token: access.token,
        expires_at: access.expires_at,
    }))
}

/// `POST /signout`
///
/// Not behind `require_auth`: an access token whose session is already
/// revoked is still accepted here, so signing out twice returns 200.
pub async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessageBody>> {
    let token = bearer_token(&headers).ok_or_else(AppError::invalid_token)?;
    state.auth().sign_out_token(token).await?;

    Ok(Json(MessageBody {
        message: "signed out".to_string(),
    }))
}
