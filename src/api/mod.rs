//! Web API module for Nixora
//!
//! Provides REST API endpoints for:
//! - Health checks
//! - The component library
//! - Document CRUD and publishing
//! - Preview sessions (builder-side edits)
//! - Published pages

pub mod components;
pub mod documents;
pub mod health;
pub mod pages;
pub mod response;
pub mod sessions;

use axum::Router;

pub use components::components_routes;
pub use documents::documents_routes;
pub use health::health_routes;
pub use pages::pages_routes;
pub use sessions::sessions_routes;

/// Create the API router with all endpoints
pub fn api_router() -> Router {
    Router::new()
        .merge(components_routes())
        .merge(documents_routes())
        .merge(sessions_routes())
        .merge(pages_routes())
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::middleware::auth::{AuthContext, RequireAuth};
    use nixora_canvas::{
        ComponentLibrary, DocumentStore, PreviewSessionManager, SqliteDocumentStore,
    };
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;

    pub fn auth(user_id: &str) -> RequireAuth {
        RequireAuth(AuthContext {
            user_id: user_id.to_string(),
        })
    }

    pub async fn store() -> Arc<dyn DocumentStore> {
        // A single connection keeps every query on the same in-memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteDocumentStore::new(pool).with_publish_base_url("https://pages.test/");
        store.init().await.unwrap();
        Arc::new(store)
    }

    pub fn sessions() -> Arc<PreviewSessionManager> {
        Arc::new(PreviewSessionManager::new(Arc::new(
            ComponentLibrary::builtin(),
        )))
    }
}
