//! Media Widget Server
//!
//! HTTP server for the category-filtered media listing widget.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mw_api::AppState;
use mw_core::config::AppConfig;
use mw_core::{MemoryWidgetSettings, WidgetSettings};
use mw_db::{Database, PgAssetRegistrar, PgMediaStore, PgWidgetSettings, PoolConfig};
use mw_media::{
    build_deriver, AssetRegistrar, LocalStorage, MediaStore, MemoryAssetRegistrar,
    MemoryMediaStore, Storage, ThumbnailDeriver,
};

mod health;
mod metrics;

use health::{HealthChecker, HealthConfig, HealthState};
use metrics::Metrics;

/// Collaborators selected at startup
struct Collaborators {
    store: Arc<dyn MediaStore>,
    registrar: Arc<dyn AssetRegistrar>,
    settings: Arc<dyn WidgetSettings>,
}

impl Collaborators {
    fn in_memory() -> Self {
        Self {
            store: Arc::new(MemoryMediaStore::new()),
            registrar: Arc::new(MemoryAssetRegistrar::new()),
            settings: Arc::new(MemoryWidgetSettings::new()),
        }
    }

    fn postgres(db: &Database) -> Self {
        Self {
            store: Arc::new(PgMediaStore::new(db.pool().clone())),
            registrar: Arc::new(PgAssetRegistrar::new(db.pool().clone())),
            settings: Arc::new(PgWidgetSettings::new(db.pool().clone())),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging
    init_tracing();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        "Starting media widget server"
    );

    let db = connect_database(&config).await;
    let collaborators = match db {
        Some(ref db) => Collaborators::postgres(db),
        None => Collaborators::in_memory(),
    };

    let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(&config.storage.local_path));
    let deriver = build_deriver(
        &config.thumbnails,
        storage.clone(),
        collaborators.registrar.clone(),
    )
    .await;

    // Initialize components
    let metrics = Arc::new(Metrics::new());
    let mut health_checker =
        HealthChecker::new(HealthConfig::default(), storage.clone(), deriver.clone());
    if let Some(ref db) = db {
        health_checker = health_checker.with_database(db.clone());
    }
    let health_state = Arc::new(HealthState {
        health: Arc::new(health_checker),
    });

    let api_state = build_api_state(&config, collaborators, deriver);

    // Build router
    let app = build_router(api_state, health_state, metrics);

    // Start server
    let addr = config.server_addr();
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if let Some(db) = db {
        db.close().await;
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Connect and bootstrap the schema; `None` runs the server in memory
async fn connect_database(config: &AppConfig) -> Option<Database> {
    let Some(pool_config) = PoolConfig::from_app(&config.database) else {
        warn!("DATABASE_URL not set. Running with in-memory collaborators.");
        return None;
    };

    let db = match Database::connect(&pool_config).await {
        Ok(db) => db,
        Err(e) => {
            warn!(
                "Failed to connect to database: {}. Running with in-memory collaborators.",
                e
            );
            return None;
        }
    };

    if let Err(e) = db.ensure_schema().await {
        warn!(
            "Failed to prepare database schema: {}. Running with in-memory collaborators.",
            e
        );
        db.close().await;
        return None;
    }

    info!("Connected to database");
    Some(db)
}

fn build_api_state(
    config: &AppConfig,
    collaborators: Collaborators,
    deriver: Arc<dyn ThumbnailDeriver>,
) -> AppState {
    AppState::new(
        config,
        collaborators.settings,
        collaborators.store,
        deriver,
    )
}

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,mw_server=debug,mw_api=debug,tower_http=debug".into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

/// Build the application router
fn build_router(api_state: AppState, health_state: Arc<HealthState>, metrics: Arc<Metrics>) -> Router {
    // Health check routes (no auth required)
    let health_routes = Router::new()
        .route("/health", get(health::readiness))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(health_state);

    // Metrics routes
    let metrics_routes = Router::new()
        .route("/metrics", get(metrics::prometheus_metrics))
        .route("/metrics.json", get(metrics::json_metrics))
        .with_state(metrics.clone());

    // Main router
    Router::new()
        .merge(health_routes)
        .merge(metrics_routes)
        .merge(mw_api::router(api_state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .layer(middleware::from_fn_with_state(
            metrics,
            metrics::metrics_middleware,
        ))
}

/// Graceful shutdown signal handler
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
