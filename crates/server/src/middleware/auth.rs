//! Bearer token gate for mutating routes.
//!
//! [`require_auth`] is applied with `axum::middleware::from_fn_with_state` to
//! the routes that change data. Handlers behind it read the caller with the
//! [`CurrentUser`] extractor.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::error::AppError;
use crate::models::AuthenticatedUser;
use crate::state::AppState;

/// Extract the token from an `Authorization: Bearer <token>` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Reject the request with 401 unless it carries a valid access token.
///
/// On success the [`AuthenticatedUser`] is inserted into the request
/// extensions and tagged on the Sentry scope.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()).map(str::to_owned) else {
        debug!("request without bearer token");
        return AppError::invalid_token().into_response();
    };

    let user = match state.auth().authenticate(&token).await {
        Ok(user) => user,
        Err(e) => {
            debug!(error = %e, "bearer token rejected");
            return AppError::invalid_token().into_response();
        }
    };

    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            username: Some(user.username.to_string()),
            ..Default::default()
        }));
    });

    request.extensions_mut().insert(user);
    next.run(request).await
}

/// Extractor for the caller identity set by [`require_auth`].
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(CurrentUser(user): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct CurrentUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(Self)
            .ok_or_else(AppError::invalid_token)
    }
}
