//! Preview WebSocket handler
//!
//! Wraps the nixora-canvas WebSocket handler for integration with the
//! Extension-based router. A preview surface connects here after the builder
//! has opened a session.

use axum::{
    extract::{Extension, Path, WebSocketUpgrade},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use nixora_canvas::PreviewState;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Preview WebSocket upgrade handler
///
/// # Path Parameters
/// - `session_id`: Session UUID returned by `POST /api/v1/documents/:id/session`
pub async fn preview_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Extension(state): Extension<Arc<PreviewState>>,
) -> Response {
    let Some(session_uuid) = parse_session_id(&session_id) else {
        debug!(session_id = %session_id, "Malformed preview session id");
        return (axum::http::StatusCode::BAD_REQUEST, "invalid session id").into_response();
    };

    nixora_canvas::preview_ws_handler(
        ws,
        Path(session_uuid),
        headers,
        axum::extract::State(state),
    )
    .await
}

fn parse_session_id(raw: &str) -> Option<Uuid> {
    raw.parse::<Uuid>().ok()
}
