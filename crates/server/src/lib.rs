//! Meal plan service library.
//!
//! CRUD and tag search over meal plan records, a read-through cache for the
//! list-all view, and JWT sessions guarding every write. The binary in
//! `main.rs` wires real backends; tests build the same router over in-memory
//! ones.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use axum::{Router, http::Request, response::Response};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use state::AppState;

/// Build the full application router with its middleware stack.
///
/// `rate_limit_credentials` enables per-IP limits on `/signin` and
/// `/refresh`; it needs the peer address, so the server must be run with
/// `into_make_service_with_connect_info::<SocketAddr>()` or behind a proxy
/// that sets `X-Forwarded-For`.
pub fn app(state: AppState, rate_limit_credentials: bool) -> Router {
    Router::new()
        .merge(routes::routes(&state, rate_limit_credentials))
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &Response<_>, latency: std::time::Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
