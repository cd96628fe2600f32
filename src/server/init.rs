//! Server initialization and main run loop
//!
//! Contains the main `run()` function that starts all server components.

use super::config::AppConfig;
use super::loader::load_config;
use crate::middleware::auth::AuthStore;
use anyhow::{Context, Result};
use axum::{routing::get, Extension, Router};
use nixora_canvas::{
    ComponentLibrary, DocumentStore, OriginPolicy, PreviewSessionManager, PreviewState,
    SqliteDocumentStore, TemplateRegistry,
};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

/// Shared services handed to handlers as request extensions
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub store: Arc<dyn DocumentStore>,
    pub library: Arc<ComponentLibrary>,
    pub templates: Arc<TemplateRegistry>,
    pub sessions: Arc<PreviewSessionManager>,
    pub preview: Arc<PreviewState>,
    pub auth: Arc<AuthStore>,
}

impl AppState {
    /// Wire every service over an existing pool
    pub async fn new(config: &AppConfig, pool: SqlitePool) -> Result<Self> {
        let store = SqliteDocumentStore::new(pool.clone())
            .with_publish_base_url(config.publish.base_url.clone());
        store
            .init()
            .await
            .context("Failed to initialize document store")?;

        let library = Arc::new(ComponentLibrary::builtin());
        let sessions = Arc::new(
            PreviewSessionManager::new(library.clone())
                .with_max_idle_secs(config.preview.max_idle_secs)
                .with_max_sessions_per_user(config.preview.max_sessions_per_user),
        );

        let origins = &config.preview.origins;
        let policy = if origins.allow_any {
            warn!("Preview accepts connections from any origin");
            OriginPolicy::permissive()
        } else {
            OriginPolicy::new(origins.allowed_hosts.clone())
        }
        .with_max_message_size(config.preview.max_message_size);

        let auth = AuthStore::from_config(&config.server.auth);
        if auth.is_enabled() {
            info!(tokens = auth.token_count(), "API authentication enabled");
        } else {
            warn!("API authentication disabled, requests run as the anonymous user");
        }

        Ok(Self {
            pool,
            store: Arc::new(store),
            library,
            templates: Arc::new(TemplateRegistry::builtin()),
            preview: Arc::new(PreviewState::new(sessions.clone(), policy)),
            sessions,
            auth: Arc::new(auth),
        })
    }
}

/// Build the main router with all endpoints
pub fn build_router(state: &AppState) -> Router {
    Router::new()
        // Health endpoints (/health public for LB, /health/detailed requires auth)
        .merge(crate::api::health_routes())
        // API routes (auth applied per-handler via RequireAuth extractor)
        .merge(crate::api::api_router())
        // WebSocket routes (origin allow-list instead of tokens)
        .merge(crate::websocket::websocket_router())
        .route("/", get(|| async { "Nixora page builder" }))
        // Layers (applied to all routes)
        .layer(Extension(state.pool.clone()))
        .layer(Extension(state.store.clone()))
        .layer(Extension(state.library.clone()))
        .layer(Extension(state.templates.clone()))
        .layer(Extension(state.sessions.clone()))
        .layer(Extension(state.preview.clone()))
        .layer(Extension(state.auth.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Run the server
pub async fn run() -> Result<()> {
    info!("Starting Nixora v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    info!("Configuration loaded");

    let pool = SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.url))?;
    info!("Database connected");

    let state = AppState::new(&config, pool).await?;
    let shutdown = CancellationToken::new();

    // Idle preview session cleanup
    let cleanup_handle = {
        let sessions = state.sessions.clone();
        let cancel = shutdown.clone();
        let interval = Duration::from_secs(config.preview.cleanup_interval_secs);
        tokio::spawn(async move { sessions.run_cleanup(interval, cancel).await })
    };

    let app = build_router(&state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("HTTP server error")?;

    shutdown.cancel();
    if let Err(e) = cleanup_handle.await {
        warn!("Session cleanup task error: {}", e);
    }
    state.pool.close().await;

    info!("Nixora shutdown complete");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM, then cancel background work
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
        _ = cancel.cancelled() => {}
    }

    cancel.cancel();
}
