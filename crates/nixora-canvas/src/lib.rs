//! Nixora Canvas - Host/Preview Synchronization
//!
//! This crate provides the page-builder canvas for Nixora:
//! - Schema: Ordered component instances and selection
//! - Protocol: Envelopes exchanged between the builder host and the preview surface
//! - Reorder: Drag gesture resolution and list reordering
//! - Host: Authoritative orchestrator with the readiness handshake
//! - Surface: Preview-side reconciler with optimistic gestures
//! - Library: Catalog of droppable components
//! - Renderer: Component templates and published page HTML
//! - Session: Preview sessions binding a document to an orchestrator
//! - Store: Document persistence with SQLite
//! - WebSocket: Preview transport with origin allow-listing
//! - Error: Error types for canvas operations
//!
//! ## Protocol
//!
//! The host owns the only mutable copy of the schema. The preview surface
//! announces `preview:ready` once per mount; the host answers with a full
//! `builder:update-components` snapshot and keeps pushing snapshots after
//! every change. Selections and completed drags travel back as
//! `preview:component-selected` and `preview:components-reordered`, and the
//! host reconciles them by instance id.
//!
//! ## Usage
//!
//! ```ignore
//! use nixora_canvas::{
//!     ComponentLibrary, OriginPolicy, PreviewSessionManager, PreviewState,
//!     preview_ws_handler,
//! };
//! use axum::{Router, routing::get};
//! use std::sync::Arc;
//!
//! let library = Arc::new(ComponentLibrary::builtin());
//! let sessions = Arc::new(PreviewSessionManager::new(library));
//! let state = Arc::new(PreviewState::new(sessions, OriginPolicy::default()));
//!
//! let app: Router<()> = Router::new()
//!     .route("/api/v1/preview/ws/:session_id", get(preview_ws_handler))
//!     .with_state(state);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod channel;
pub mod error;
pub mod host;
pub mod library;
pub mod protocol;
pub mod renderer;
pub mod reorder;
pub mod schema;
pub mod security;
pub mod session;
pub mod store;
pub mod surface;
pub mod websocket;

// Re-export main types
pub use channel::{pair, HostEndpoint, Outbound, SurfaceEndpoint};
pub use error::{Error, Result};
pub use host::HostOrchestrator;
pub use library::{ComponentDefinition, ComponentLibrary, SettingField};
pub use protocol::{
    ConnectionState, Envelope, HostMessage, SurfaceMessage, PROTOCOL_VERSION,
};
pub use renderer::{RenderedComponent, Template, TemplateRegistry};
pub use reorder::{Direction, DragGesture, DropSide, DropTarget, Extent};
pub use schema::{ComponentInstance, Props, Schema, Selection, StoredComponent};
pub use security::OriginPolicy;
pub use session::{PreviewSession, PreviewSessionManager, SessionInfo};
pub use store::{CanvasDocument, DocumentPatch, DocumentStore, NewDocument, SqliteDocumentStore};
pub use surface::{RenderedCanvas, RenderedItem, SurfaceReconciler};
pub use websocket::{preview_ws_handler, PreviewState};
