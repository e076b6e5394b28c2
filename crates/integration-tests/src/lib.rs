//! Harness for end-to-end tests of the meal plan HTTP API.
//!
//! Builds the real router over in-memory backends and drives it with
//! `tower::ServiceExt::oneshot`, so no listener or database is needed.
//!
//! ```rust,ignore
//! let app = TestApp::new().await;
//! let token = app.sign_in().await;
//! let res = app.post("/mealplans", &json!({"customer": "Ana"}), Some(&token)).await;
//! assert_eq!(res.status, StatusCode::OK);
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use mealplan_server::cache::{MokaSnapshotCache, SnapshotCache};
use mealplan_server::config::{CacheBackend, ServerConfig, StoreBackend};
use mealplan_server::state::AppState;
use mealplan_server::store::InMemoryStore;

/// Account seeded into every [`TestApp`].
pub const TEST_USERNAME: &str = "chef";
pub const TEST_PASSWORD: &str = "correct horse battery";

const TEST_JWT_SECRET: &str = "vR8#kP2!qW5@zN9$tL3^mB7&hX1*jC4(";
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Configuration for an in-memory server.
#[must_use]
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: [127, 0, 0, 1].into(),
        port: 0,
        store: StoreBackend::Memory,
        database_url: None,
        cache: CacheBackend::Memory,
        redis_url: SecretString::from("redis://127.0.0.1:6379"),
        jwt_secret: SecretString::from(TEST_JWT_SECRET),
        access_token_ttl: Duration::from_secs(600),
        refresh_token_ttl: Duration::from_secs(86_400),
        tls: None,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// Decoded response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    /// The `error` field of an error body.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }
}

/// The full application over in-memory backends.
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    router: Router,
}

impl TestApp {
    /// App with a `moka` list cache and one seeded account.
    pub async fn new() -> Self {
        Self::with_cache(Arc::new(MokaSnapshotCache::new())).await
    }

    /// App over the given cache backend, with one seeded account.
    ///
    /// # Panics
    ///
    /// Panics if the seed account cannot be created.
    pub async fn with_cache(cache: Arc<dyn SnapshotCache>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let state = AppState::new(&test_config(), store.clone(), store.clone(), cache);

        if let Err(e) = state
            .auth()
            .register_user(TEST_USERNAME, TEST_PASSWORD)
            .await
        {
            panic!("failed to seed test account: {e}");
        }

        let router = mealplan_server::app(state.clone(), false);
        Self {
            state,
            store,
            router,
        }
    }

    /// Send a request and decode the JSON body (`Value::Null` when empty or
    /// not JSON).
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<String>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match builder.body(body.map_or_else(Body::empty, Body::from)) {
            Ok(request) => request,
            Err(e) => panic!("invalid test request: {e}"),
        };

        let response = match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(e) => match e {},
        };

        let status = response.status();
        let bytes = match axum::body::to_bytes(response.into_body(), MAX_BODY_BYTES).await {
            Ok(bytes) => bytes,
            Err(e) => panic!("failed to read response body: {e}"),
        };
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None, None).await
    }

    pub async fn post(&self, uri: &str, body: &Value, token: Option<&str>) -> TestResponse {
        self.request(Method::POST, uri, Some(body.to_string()), token)
            .await
    }

    pub async fn put(&self, uri: &str, body: &Value, token: Option<&str>) -> TestResponse {
        self.request(Method::PUT, uri, Some(body.to_string()), token)
            .await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, uri, None, token).await
    }

    /// Sign in as the seeded account and return the full response body.
    ///
    /// # Panics
    ///
    /// Panics if sign-in is rejected.
    pub async fn sign_in_tokens(&self) -> Value {
        let res = self
            .post(
                "/signin",
                &serde_json::json!({ "username": TEST_USERNAME, "password": TEST_PASSWORD }),
                None,
            )
            .await;
        assert_eq!(res.status, StatusCode::OK, "sign-in failed: {:?}", res.body);
        res.body
    }

    /// Sign in as the seeded account and return the access token.
    ///
    /// # Panics
    ///
    /// Panics if sign-in is rejected.
    pub async fn sign_in(&self) -> String {
        let body = self.sign_in_tokens().await;
        match body["accessToken"].as_str() {
            Some(token) => token.to_owned(),
            None => panic!("sign-in response has no access token: {body}"),
        }
    }
}
