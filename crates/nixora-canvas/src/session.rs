//! Preview Session Management
//!
//! A preview session binds one user's open document to a `HostOrchestrator`
//! and, while a preview surface is connected, to that surface's link.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::channel::Outbound;
use crate::error::{Error, Result};
use crate::host::HostOrchestrator;
use crate::library::ComponentLibrary;
use crate::protocol::{ConnectionState, HostMessage};
use crate::schema::Schema;
use crate::store::{CanvasDocument, DocumentPatch, DocumentStore};

/// An open document in the builder
#[derive(Debug)]
pub struct PreviewSession {
    /// Unique session identifier
    pub id: Uuid,

    /// User who owns this session
    pub user_id: String,

    /// Document being edited
    pub document_id: Uuid,

    /// Document title at open time
    pub title: String,

    /// Authoritative editor state
    pub host: HostOrchestrator,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// When the session was last accessed
    pub last_accessed_at: DateTime<Utc>,

    /// Last successful save
    pub saved_at: Option<DateTime<Utc>>,

    /// Currently attached surface connection
    pub connection_id: Option<Uuid>,
}

impl PreviewSession {
    /// Open a session over a document
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        document: &CanvasDocument,
        library: Arc<ComponentLibrary>,
    ) -> Self {
        let now = Utc::now();
        let mut host = HostOrchestrator::new(library);
        host.load(document.components.clone());
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            document_id: document.id,
            title: document.title.clone(),
            host,
            created_at: now,
            last_accessed_at: now,
            saved_at: None,
            connection_id: None,
        }
    }

    /// Attach a surface connection, superseding any previous one
    pub fn attach_surface(&mut self, link: Box<dyn Outbound<HostMessage>>) -> Uuid {
        let connection_id = Uuid::new_v4();
        if let Some(previous) = self.connection_id.replace(connection_id) {
            info!(session_id = %self.id, previous = %previous, "Surface connection superseded");
        }
        self.host.attach(link);
        connection_id
    }

    /// Detach `connection_id` if it is still the attached connection
    pub fn detach_surface(&mut self, connection_id: Uuid) -> bool {
        if self.connection_id != Some(connection_id) {
            return false;
        }
        self.connection_id = None;
        self.host.detach();
        true
    }

    /// Update last accessed timestamp
    pub fn touch(&mut self) {
        self.last_accessed_at = Utc::now();
    }

    /// Check if session is expired (not accessed for given duration)
    #[must_use]
    pub fn is_expired(&self, max_idle_secs: i64) -> bool {
        let idle_duration = Utc::now() - self.last_accessed_at;
        idle_duration.num_seconds() > max_idle_secs
    }

    /// Serializable view of the session
    #[must_use]
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            user_id: self.user_id.clone(),
            document_id: self.document_id,
            title: self.title.clone(),
            connection: self.host.connection_state(),
            schema: self.host.schema().clone(),
            selected_instance_id: self.host.selection().to_wire(),
            created_at: self.created_at,
            last_accessed_at: self.last_accessed_at,
            saved_at: self.saved_at,
        }
    }
}

/// Snapshot of a session for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// Session ID
    pub id: Uuid,
    /// Owner
    pub user_id: String,
    /// Document being edited
    pub document_id: Uuid,
    /// Document title
    pub title: String,
    /// Preview surface handshake state
    pub connection: ConnectionState,
    /// Current authoritative schema
    pub schema: Schema,
    /// Current selection
    pub selected_instance_id: Option<String>,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// When the session was last accessed
    pub last_accessed_at: DateTime<Utc>,
    /// Last successful save
    pub saved_at: Option<DateTime<Utc>>,
}

/// Session manager for open preview sessions
pub struct PreviewSessionManager {
    /// Active sessions by ID
    sessions: Arc<RwLock<HashMap<Uuid, PreviewSession>>>,

    /// Sessions by user ID, oldest first
    user_sessions: Arc<RwLock<HashMap<String, Vec<Uuid>>>>,

    /// Component catalog handed to every orchestrator
    library: Arc<ComponentLibrary>,

    /// Maximum idle time before session expires (in seconds)
    max_idle_secs: i64,

    /// Maximum sessions per user
    max_sessions_per_user: usize,
}

impl PreviewSessionManager {
    /// Create a new session manager
    #[must_use]
    pub fn new(library: Arc<ComponentLibrary>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            user_sessions: Arc::new(RwLock::new(HashMap::new())),
            library,
            max_idle_secs: 3600,
            max_sessions_per_user: 10,
        }
    }

    /// Configure maximum idle time
    #[must_use]
    pub fn with_max_idle_secs(mut self, secs: i64) -> Self {
        self.max_idle_secs = secs;
        self
    }

    /// Configure maximum sessions per user
    #[must_use]
    pub fn with_max_sessions_per_user(mut self, max: usize) -> Self {
        self.max_sessions_per_user = max.max(1);
        self
    }

    /// Component catalog
    #[must_use]
    pub fn library(&self) -> &Arc<ComponentLibrary> {
        &self.library
    }

    /// Open a session over a document. The user's oldest sessions are
    /// evicted beyond the per-user limit.
    pub async fn open_session(&self, user_id: &str, document: &CanvasDocument) -> SessionInfo {
        let session = PreviewSession::new(user_id, document, self.library.clone());
        let session_id = session.id;
        let info = session.info();

        {
            let mut sessions = self.sessions.write().await;
            sessions.insert(session_id, session);
        }

        let evicted: Vec<Uuid> = {
            let mut user_sessions = self.user_sessions.write().await;
            let ids = user_sessions.entry(user_id.to_string()).or_default();
            ids.push(session_id);
            if ids.len() > self.max_sessions_per_user {
                let excess = ids.len() - self.max_sessions_per_user;
                ids.drain(0..excess).collect()
            } else {
                Vec::new()
            }
        };

        if !evicted.is_empty() {
            let mut sessions = self.sessions.write().await;
            for id in &evicted {
                if let Some(mut old) = sessions.remove(id) {
                    old.host.detach();
                }
            }
            info!(user_id = %user_id, evicted = evicted.len(), "Evicted oldest preview sessions");
        }

        info!(
            session_id = %session_id,
            document_id = %document.id,
            "Preview session opened"
        );
        info
    }

    /// Get a session snapshot by ID
    pub async fn get_session(&self, session_id: Uuid) -> Option<SessionInfo> {
        let sessions = self.sessions.read().await;
        sessions.get(&session_id).map(PreviewSession::info)
    }

    /// Run `f` against a session
    pub async fn update_session<F, R>(&self, session_id: Uuid, f: F) -> Option<R>
    where
        F: FnOnce(&mut PreviewSession) -> R,
    {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(&session_id) {
            session.touch();
            Some(f(session))
        } else {
            None
        }
    }

    /// Run `f` against a session owned by `user_id`
    pub async fn update_owned_session<F, R>(&self, session_id: Uuid, user_id: &str, f: F) -> Result<R>
    where
        F: FnOnce(&mut PreviewSession) -> R,
    {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or(Error::SessionNotFound(session_id))?;
        if session.user_id != user_id {
            return Err(Error::PermissionDenied(format!(
                "session {} belongs to another user",
                session_id
            )));
        }
        session.touch();
        Ok(f(session))
    }

    /// Get all sessions for a user
    pub async fn get_user_sessions(&self, user_id: &str) -> Vec<SessionInfo> {
        let user_sessions = self.user_sessions.read().await;
        let session_ids = user_sessions.get(user_id).cloned().unwrap_or_default();
        drop(user_sessions);

        let sessions = self.sessions.read().await;
        session_ids
            .iter()
            .filter_map(|id| sessions.get(id).map(PreviewSession::info))
            .collect()
    }

    /// Remove a session, detaching its surface
    pub async fn remove_session(&self, session_id: Uuid) -> Option<SessionInfo> {
        let session = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(&session_id)
        };

        let mut session = session?;
        session.host.detach();

        let mut user_sessions = self.user_sessions.write().await;
        if let Some(ids) = user_sessions.get_mut(&session.user_id) {
            ids.retain(|&id| id != session_id);
        }

        debug!(session_id = %session_id, "Preview session removed");
        Some(session.info())
    }

    /// Write the session's schema back to its document.
    ///
    /// On failure the in-memory schema is untouched, so the save can be retried.
    pub async fn save(
        &self,
        session_id: Uuid,
        user_id: &str,
        store: &dyn DocumentStore,
    ) -> Result<CanvasDocument> {
        let (document_id, schema) = self
            .update_owned_session(session_id, user_id, |s| {
                (s.document_id, s.host.schema().clone())
            })
            .await?;

        let document = store
            .update(document_id, user_id, DocumentPatch::components(schema))
            .await?;

        self.update_session(session_id, |s| s.saved_at = Some(document.updated_at))
            .await;
        info!(
            session_id = %session_id,
            document_id = %document_id,
            components = document.components.len(),
            "Session saved"
        );
        Ok(document)
    }

    /// Clean up expired sessions. Sessions with a connected surface never expire.
    pub async fn cleanup_expired(&self) -> usize {
        let expired_ids: Vec<Uuid> = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .filter(|(_, s)| {
                    s.host.connection_state() == ConnectionState::Disconnected
                        && s.is_expired(self.max_idle_secs)
                })
                .map(|(id, _)| *id)
                .collect()
        };

        let count = expired_ids.len();
        for id in expired_ids {
            self.remove_session(id).await;
        }

        count
    }

    /// Periodically expire idle sessions until `cancel` fires
    pub async fn run_cleanup(&self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = self.cleanup_expired().await;
                    if removed > 0 {
                        info!(removed, "Expired idle preview sessions");
                    }
                }
            }
        }
        debug!("Session cleanup stopped");
    }

    /// Get total number of active sessions
    pub async fn session_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }
}
