//! WebSocket Handler
//!
//! Carries the preview protocol between a preview surface in the browser and
//! the `HostOrchestrator` of a session. Frames are the JSON envelopes of
//! [`crate::protocol`], one per text message.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::{self, HostMessage};
use crate::security::OriginPolicy;
use crate::session::PreviewSessionManager;

/// Shared state for the preview WebSocket handler
pub struct PreviewState {
    /// Session manager
    pub sessions: Arc<PreviewSessionManager>,
    /// Origin allow-list and frame limits
    pub origins: OriginPolicy,
}

impl PreviewState {
    /// Create a new preview state
    #[must_use]
    pub fn new(sessions: Arc<PreviewSessionManager>, origins: OriginPolicy) -> Self {
        Self { sessions, origins }
    }
}

/// WebSocket upgrade handler
pub async fn preview_ws_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<Uuid>,
    headers: HeaderMap,
    State(state): State<Arc<PreviewState>>,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());

    if let Err(e) = state.origins.check_origin(origin) {
        warn!(session_id = %session_id, error = %e, "Preview connection rejected");
        return (StatusCode::FORBIDDEN, e.to_string()).into_response();
    }

    if state.sessions.get_session(session_id).await.is_none() {
        return (StatusCode::NOT_FOUND, format!("session not found: {session_id}")).into_response();
    }

    info!(session_id = %session_id, "Preview WebSocket upgrade requested");
    ws.on_upgrade(move |socket| handle_socket(socket, session_id, state))
}

/// Handle a preview surface connection
async fn handle_socket(socket: WebSocket, session_id: Uuid, state: Arc<PreviewState>) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<HostMessage>();

    let Some(connection_id) = state
        .sessions
        .update_session(session_id, |session| {
            session.attach_surface(Box::new(outbound_tx))
        })
        .await
    else {
        warn!(session_id = %session_id, "Session vanished before upgrade completed");
        let _ = sender.send(Message::Close(None)).await;
        return;
    };

    info!(
        session_id = %session_id,
        connection_id = %connection_id,
        "Preview surface connected"
    );

    // Snapshots from the orchestrator, in send order
    let forward_handle = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let text = match protocol::encode(&message) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Failed to encode snapshot");
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Err(e) = state.origins.check_frame(&text) {
                    warn!(session_id = %session_id, error = %e, "Dropping preview frame");
                    continue;
                }
                debug!(session_id = %session_id, bytes = text.len(), "Preview frame");
                let handled = state
                    .sessions
                    .update_session(session_id, |session| session.host.handle_raw(&text))
                    .await;
                if handled.is_none() {
                    info!(session_id = %session_id, "Session closed, dropping connection");
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Preview surface closed connection");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Preview WebSocket error");
                break;
            }
            _ => {}
        }
    }

    state
        .sessions
        .update_session(session_id, |session| session.detach_surface(connection_id))
        .await;
    forward_handle.abort();
    info!(connection_id = %connection_id, "Preview surface disconnected");
}
