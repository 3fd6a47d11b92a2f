use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    middleware,
    routing::get,
    Router,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::cache::TtlCache;
use crate::config::Config;
use crate::enrich::Enricher;
use crate::health::HealthChecker;
use crate::providers::{CatalogClient, RatingsClient, StreamingClient};

pub mod request_id;
pub mod routes;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub enricher: Arc<Enricher>,
    pub health: Arc<HealthChecker>,
}

impl AppContext {
    /// Wire the real upstream clients from config: one cache handle and one
    /// rate limiter per upstream, constructed here and nowhere else.
    pub fn from_config(config: Config) -> Self {
        let ttl = config.cache.ttl();
        let capacity = config.cache.capacity;

        let catalog = Arc::new(CatalogClient::new(
            &config.catalog,
            TtlCache::new(ttl, capacity),
            TtlCache::new(ttl, capacity),
        ));
        let ratings = Arc::new(RatingsClient::new(
            &config.ratings,
            TtlCache::new(ttl, capacity),
        ));
        let streaming = Arc::new(StreamingClient::new(
            &config.streaming,
            TtlCache::new(ttl, capacity),
        ));

        let enricher = Arc::new(Enricher::new(
            catalog.clone(),
            ratings.clone(),
            streaming.clone(),
        ));
        let health = Arc::new(HealthChecker::new(
            catalog,
            ratings,
            streaming,
            std::time::Duration::from_secs(config.health.probe_timeout_secs),
            std::time::Duration::from_secs(config.health.cache_ttl_secs),
        ));

        Self {
            config: Arc::new(config),
            enricher,
            health,
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(routes::health))
        .nest("/api", routes::api_routes())
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Start the HTTP server
pub async fn start_server(ctx: AppContext) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", ctx.config.server.host, ctx.config.server.port)
        .parse()
        .context("Invalid server address")?;

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
