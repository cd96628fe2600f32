//! Health check endpoints
//!
//! Provides:
//! - `/health` - simple "healthy" + version (for load balancers)
//! - `/health/detailed` - database reachability and preview session count

use axum::extract::Extension;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use nixora_canvas::PreviewSessionManager;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Instant;

use crate::middleware::auth::RequireAuth;

/// Simple health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Detailed health response
#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: ComponentHealth,
    pub preview_sessions: usize,
}

/// Individual component health status
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Simple health check (for load balancers)
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn check_database(pool: &SqlitePool) -> ComponentHealth {
    let started = Instant::now();
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => ComponentHealth {
            status: "healthy",
            latency_ms: Some(started.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => ComponentHealth {
            status: "unhealthy",
            latency_ms: None,
            error: Some(e.to_string()),
        },
    }
}

/// Detailed health check (requires authentication)
async fn detailed_health_check(
    RequireAuth(_auth): RequireAuth,
    Extension(pool): Extension<SqlitePool>,
    Extension(sessions): Extension<Arc<PreviewSessionManager>>,
) -> Json<DetailedHealthResponse> {
    let database = check_database(&pool).await;
    let status = if database.status == "healthy" {
        "healthy"
    } else {
        "degraded"
    };

    Json(DetailedHealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        database,
        preview_sessions: sessions.session_count().await,
    })
}

/// Create health routes
pub fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(detailed_health_check))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{auth, sessions};
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn test_health_check() {
        let Json(response) = health_check().await;
        assert_eq!(response.status, "healthy");
    }

    #[tokio::test]
    async fn test_detailed_health_check() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let Json(response) =
            detailed_health_check(auth("alice"), Extension(pool.clone()), Extension(sessions()))
                .await;
        assert_eq!(response.status, "healthy");
        assert_eq!(response.preview_sessions, 0);

        pool.close().await;
        let Json(response) =
            detailed_health_check(auth("alice"), Extension(pool), Extension(sessions())).await;
        assert_eq!(response.status, "degraded");
        assert!(response.database.error.is_some());
    }
}
