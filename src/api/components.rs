//! Component library API endpoints
//!
//! GET /api/v1/components - List droppable component types with their defaults

use axum::{routing::get, Extension, Json, Router};
use nixora_canvas::{ComponentDefinition, ComponentLibrary};
use std::sync::Arc;

use super::response::{ok, ApiResult};
use crate::middleware::auth::RequireAuth;

/// List the component library (requires authentication)
async fn list_components(
    RequireAuth(_auth): RequireAuth,
    Extension(library): Extension<Arc<ComponentLibrary>>,
) -> ApiResult<Vec<ComponentDefinition>> {
    ok(library.definitions().to_vec())
}

/// Create component library routes
pub fn components_routes() -> Router {
    Router::new().route("/api/v1/components", get(list_components))
}
