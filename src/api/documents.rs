//! Document API endpoints
//!
//! POST   /api/v1/documents               - Create a document
//! GET    /api/v1/documents               - List the caller's documents
//! GET    /api/v1/documents/:id           - Read a document
//! PATCH  /api/v1/documents/:id           - Update title, description or components
//! DELETE /api/v1/documents/:id           - Delete a document
//! POST   /api/v1/documents/:id/publish   - Publish
//! POST   /api/v1/documents/:id/unpublish - Unpublish

use axum::{
    extract::Path,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use nixora_canvas::{CanvasDocument, DocumentPatch, DocumentStore, NewDocument};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::response::{ok, ApiError, ApiResponse, ApiResult};
use crate::middleware::auth::RequireAuth;

type Store = Extension<Arc<dyn DocumentStore>>;

fn require_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::bad_request("title must not be empty"));
    }
    Ok(())
}

async fn create_document(
    RequireAuth(auth): RequireAuth,
    Extension(store): Store,
    Json(document): Json<NewDocument>,
) -> Result<(StatusCode, Json<ApiResponse<CanvasDocument>>), ApiError> {
    require_title(&document.title)?;
    let created = store.create(&auth.user_id, document).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

async fn list_documents(
    RequireAuth(auth): RequireAuth,
    Extension(store): Store,
) -> ApiResult<Vec<CanvasDocument>> {
    ok(store.list(&auth.user_id).await?)
}

async fn get_document(
    RequireAuth(auth): RequireAuth,
    Extension(store): Store,
    Path(id): Path<Uuid>,
) -> ApiResult<CanvasDocument> {
    ok(store.read(id, &auth.user_id).await?)
}

async fn update_document(
    RequireAuth(auth): RequireAuth,
    Extension(store): Store,
    Path(id): Path<Uuid>,
    Json(patch): Json<DocumentPatch>,
) -> ApiResult<CanvasDocument> {
    if let Some(title) = &patch.title {
        require_title(title)?;
    }
    ok(store.update(id, &auth.user_id, patch).await?)
}

async fn delete_document(
    RequireAuth(auth): RequireAuth,
    Extension(store): Store,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    store.delete(id, &auth.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn publish_document(
    RequireAuth(auth): RequireAuth,
    Extension(store): Store,
    Path(id): Path<Uuid>,
) -> ApiResult<CanvasDocument> {
    let document = store.set_published(id, &auth.user_id, true).await?;
    info!(
        document_id = %id,
        url = document.publish_url.as_deref().unwrap_or_default(),
        "Document published"
    );
    ok(document)
}

async fn unpublish_document(
    RequireAuth(auth): RequireAuth,
    Extension(store): Store,
    Path(id): Path<Uuid>,
) -> ApiResult<CanvasDocument> {
    ok(store.set_published(id, &auth.user_id, false).await?)
}

/// Create document routes
pub fn documents_routes() -> Router {
    Router::new()
        .route("/api/v1/documents", post(create_document).get(list_documents))
        .route(
            "/api/v1/documents/:id",
            get(get_document)
                .patch(update_document)
                .delete(delete_document),
        )
        .route("/api/v1/documents/:id/publish", post(publish_document))
        .route("/api/v1/documents/:id/unpublish", post(unpublish_document))
}
