//! WebSocket module for Nixora
//!
//! Provides real-time communication endpoints:
//! - /api/v1/preview/ws/:session_id - Live preview surface connection

pub mod preview;

pub use preview::preview_handler;

use axum::{routing::get, Router};

/// Create the WebSocket router
pub fn websocket_router() -> Router {
    Router::new().route("/api/v1/preview/ws/:session_id", get(preview_handler))
}
