//! Meal plan server binary.
//!
//! Serves the meal plan API on port 8080 by default.
//!
//! # Backends
//!
//! - Store: `PostgreSQL` (default) or in-memory, via `MEALPLAN_STORE`
//! - List cache: in-process `moka` (default) or Redis, via `MEALPLAN_CACHE`
//!
//! Migrations are NOT run on startup. Run them explicitly via:
//! `cargo run -p mealplan-cli -- migrate`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::Arc;

use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mealplan_server::cache::{MokaSnapshotCache, RedisSnapshotCache, SnapshotCache};
use mealplan_server::config::{CacheBackend, ServerConfig, StoreBackend};
use mealplan_server::state::AppState;
use mealplan_server::store::{InMemoryStore, MealPlanStore, PostgresStore, UserStore, postgres};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ServerConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mealplan_server=info,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

/// Build the store selected by `MEALPLAN_STORE`. The returned pair shares one
/// backend instance.
async fn build_store(config: &ServerConfig) -> (Arc<dyn MealPlanStore>, Arc<dyn UserStore>) {
    match config.store {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_ref()
                .expect("database URL is required for the postgres store");
            let pool = postgres::create_pool(url)
                .await
                .expect("Failed to create database pool");
            tracing::info!("Database pool created");

            let store = Arc::new(PostgresStore::new(pool));
            let plans: Arc<dyn MealPlanStore> = store.clone();
            let users: Arc<dyn UserStore> = store;
            (plans, users)
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store, data will not survive a restart");
            let store = Arc::new(InMemoryStore::new());
            let plans: Arc<dyn MealPlanStore> = store.clone();
            let users: Arc<dyn UserStore> = store;
            (plans, users)
        }
    }
}

async fn build_cache(config: &ServerConfig) -> Arc<dyn SnapshotCache> {
    match config.cache {
        CacheBackend::Memory => Arc::new(MokaSnapshotCache::new()),
        CacheBackend::Redis => {
            let cache = RedisSnapshotCache::connect(&config.redis_url)
                .await
                .expect("Failed to connect to Redis");
            tracing::info!("Redis cache connected");
            Arc::new(cache)
        }
    }
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load configuration from environment (needed for Sentry init)
    let config = ServerConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    let (store, users) = build_store(&config).await;
    let cache = build_cache(&config).await;
    tracing::info!(
        store = store.backend_name(),
        cache = cache.backend_name(),
        "backends ready"
    );

    let state = AppState::new(&config, store, users, cache);
    let app = mealplan_server::app(state, true);

    let addr = config.socket_addr();

    if let Some(tls_config) = &config.tls {
        let rustls_config = RustlsConfig::from_pem_file(&tls_config.cert_path, &tls_config.key_path)
            .await
            .expect("Failed to load TLS certificates");

        tracing::info!("mealplan-server listening on https://{}", addr);

        let handle = Handle::new();
        let shutdown_handle = handle.clone();

        // Spawn task to handle graceful shutdown
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown_handle.graceful_shutdown(Some(std::time::Duration::from_secs(30)));
        });

        axum_server::bind_rustls(addr, rustls_config)
            .handle(handle)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .expect("Server error");
    } else {
        tracing::info!("mealplan-server listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .expect("Failed to bind to address");

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
