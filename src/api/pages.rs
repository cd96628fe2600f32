//! Published pages
//!
//! GET /p/:id - Render a published document as a standalone HTML page (public)

use axum::{
    extract::Path,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Extension, Router,
};
use nixora_canvas::{DocumentStore, Error as CanvasError, TemplateRegistry};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

const NOT_FOUND_PAGE: &str =
    "<!DOCTYPE html><html><head><title>Not found</title></head><body><h1>Page not found</h1></body></html>";

async fn published_page(
    Extension(store): Extension<Arc<dyn DocumentStore>>,
    Extension(templates): Extension<Arc<TemplateRegistry>>,
    Path(id): Path<Uuid>,
) -> Response {
    match store.read_published(id).await {
        Ok(document) => {
            debug!(document_id = %id, components = document.components.len(), "Serving page");
            Html(templates.render_page(&document.title, &document.components)).into_response()
        }
        Err(CanvasError::DocumentNotFound(_)) => {
            (StatusCode::NOT_FOUND, Html(NOT_FOUND_PAGE)).into_response()
        }
        Err(e) => {
            error!(document_id = %id, error = %e, "Failed to load published page");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

/// Create published page routes
pub fn pages_routes() -> Router {
    Router::new().route("/p/:id", get(published_page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::store;
    use nixora_canvas::{ComponentInstance, NewDocument, Schema};
    use serde_json::json;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn page_document(store: &Arc<dyn DocumentStore>) -> Uuid {
        let mut props = nixora_canvas::Props::new();
        props.insert("headline".into(), json!("Ship faster"));
        let components =
            Schema::from_instances(vec![ComponentInstance::new("hero-1", "hero").with_props(props)]);
        store
            .create(
                "alice",
                NewDocument {
                    title: "Launch".into(),
                    description: None,
                    components,
                },
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_unpublished_page_is_not_found() {
        let store = store().await;
        let id = page_document(&store).await;

        let response = published_page(
            Extension(store),
            Extension(Arc::new(TemplateRegistry::builtin())),
            Path(id),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_published_page_renders() {
        let store = store().await;
        let id = page_document(&store).await;
        store.set_published(id, "alice", true).await.unwrap();

        let response = published_page(
            Extension(store),
            Extension(Arc::new(TemplateRegistry::builtin())),
            Path(id),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let html = body_text(response).await;
        assert!(html.contains("<title>Launch</title>"));
        assert!(html.contains("Ship faster"));
    }
}
