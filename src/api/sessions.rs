//! Preview session API endpoints
//!
//! Builder-side edits go through these endpoints; every change is pushed to
//! the connected preview surface as a fresh snapshot.
//!
//! POST   /api/v1/documents/:id/session                               - Open a session
//! GET    /api/v1/sessions                                            - List the caller's sessions
//! GET    /api/v1/sessions/:id                                        - Snapshot and connection state
//! DELETE /api/v1/sessions/:id                                        - Close a session
//! POST   /api/v1/sessions/:id/components                             - Add a component
//! PATCH  /api/v1/sessions/:id/components/:instance_id                - Merge properties
//! DELETE /api/v1/sessions/:id/components/:instance_id                - Remove a component
//! POST   /api/v1/sessions/:id/components/:instance_id/move           - Move up or down
//! POST   /api/v1/sessions/:id/clear                                  - Remove every component
//! PUT    /api/v1/sessions/:id/selection                              - Select or deselect
//! POST   /api/v1/sessions/:id/save                                   - Write back to the document

use axum::{
    extract::Path,
    http::StatusCode,
    routing::{get, patch, post, put},
    Extension, Json, Router,
};
use nixora_canvas::{
    CanvasDocument, Direction, DocumentStore, PreviewSession, PreviewSessionManager, Props,
    SessionInfo,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::response::{ok, ApiError, ApiResponse, ApiResult};
use crate::middleware::auth::RequireAuth;

type Sessions = Extension<Arc<PreviewSessionManager>>;

/// Request body for adding a component
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddComponentRequest {
    pub component_type: String,
    #[serde(default)]
    pub props: Props,
}

/// Request body for a property edit
#[derive(Debug, Deserialize)]
pub struct EditPropsRequest {
    pub props: Props,
}

/// Request body for a move
#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub direction: Direction,
}

/// Request body for a selection change; `null` deselects
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRequest {
    #[serde(default)]
    pub instance_id: Option<String>,
}

/// Response for an added component
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedComponent {
    pub instance_id: String,
    pub session: SessionInfo,
}

fn instance_not_found(instance_id: &str) -> ApiError {
    ApiError::not_found(format!("component instance not found: {}", instance_id))
}

/// Run `f` against the caller's session and flatten both error layers
async fn with_session<F, R>(
    sessions: &PreviewSessionManager,
    session_id: Uuid,
    user_id: &str,
    f: F,
) -> Result<R, ApiError>
where
    F: FnOnce(&mut PreviewSession) -> Result<R, ApiError>,
{
    sessions
        .update_owned_session(session_id, user_id, f)
        .await?
}

async fn open_session(
    RequireAuth(auth): RequireAuth,
    Extension(store): Extension<Arc<dyn DocumentStore>>,
    Extension(sessions): Sessions,
    Path(document_id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<SessionInfo>>), ApiError> {
    let document = store.read(document_id, &auth.user_id).await?;
    let info = sessions.open_session(&auth.user_id, &document).await;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(info))))
}

async fn list_sessions(
    RequireAuth(auth): RequireAuth,
    Extension(sessions): Sessions,
) -> ApiResult<Vec<SessionInfo>> {
    ok(sessions.get_user_sessions(&auth.user_id).await)
}

async fn get_session(
    RequireAuth(auth): RequireAuth,
    Extension(sessions): Sessions,
    Path(session_id): Path<Uuid>,
) -> ApiResult<SessionInfo> {
    ok(with_session(&sessions, session_id, &auth.user_id, |s| Ok(s.info())).await?)
}

async fn close_session(
    RequireAuth(auth): RequireAuth,
    Extension(sessions): Sessions,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    with_session(&sessions, session_id, &auth.user_id, |_| Ok(())).await?;
    sessions.remove_session(session_id).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_component(
    RequireAuth(auth): RequireAuth,
    Extension(sessions): Sessions,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AddComponentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AddedComponent>>), ApiError> {
    let added = with_session(&sessions, session_id, &auth.user_id, |s| {
        let instance_id = s
            .host
            .apply_local_add(&request.component_type, request.props)
            .ok_or_else(|| {
                ApiError::bad_request(format!(
                    "unknown component type: {}",
                    request.component_type
                ))
            })?;
        Ok(AddedComponent {
            instance_id,
            session: s.info(),
        })
    })
    .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(added))))
}

async fn edit_component(
    RequireAuth(auth): RequireAuth,
    Extension(sessions): Sessions,
    Path((session_id, instance_id)): Path<(Uuid, String)>,
    Json(request): Json<EditPropsRequest>,
) -> ApiResult<SessionInfo> {
    ok(with_session(&sessions, session_id, &auth.user_id, |s| {
        if !s.host.apply_local_properties_edit(&instance_id, request.props) {
            return Err(instance_not_found(&instance_id));
        }
        Ok(s.info())
    })
    .await?)
}

async fn remove_component(
    RequireAuth(auth): RequireAuth,
    Extension(sessions): Sessions,
    Path((session_id, instance_id)): Path<(Uuid, String)>,
) -> ApiResult<SessionInfo> {
    ok(with_session(&sessions, session_id, &auth.user_id, |s| {
        s.host
            .apply_local_remove(&instance_id)
            .ok_or_else(|| instance_not_found(&instance_id))?;
        Ok(s.info())
    })
    .await?)
}

async fn move_component(
    RequireAuth(auth): RequireAuth,
    Extension(sessions): Sessions,
    Path((session_id, instance_id)): Path<(Uuid, String)>,
    Json(request): Json<MoveRequest>,
) -> ApiResult<SessionInfo> {
    ok(with_session(&sessions, session_id, &auth.user_id, |s| {
        if !s.host.schema().contains(&instance_id) {
            return Err(instance_not_found(&instance_id));
        }
        // Moving past either end leaves the order as is
        s.host.apply_local_move(&instance_id, request.direction);
        Ok(s.info())
    })
    .await?)
}

async fn clear_components(
    RequireAuth(auth): RequireAuth,
    Extension(sessions): Sessions,
    Path(session_id): Path<Uuid>,
) -> ApiResult<SessionInfo> {
    ok(with_session(&sessions, session_id, &auth.user_id, |s| {
        s.host.clear();
        Ok(s.info())
    })
    .await?)
}

async fn set_selection(
    RequireAuth(auth): RequireAuth,
    Extension(sessions): Sessions,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SelectionRequest>,
) -> ApiResult<SessionInfo> {
    ok(with_session(&sessions, session_id, &auth.user_id, |s| {
        if let Some(id) = request.instance_id.as_deref() {
            if !s.host.schema().contains(id) {
                return Err(instance_not_found(id));
            }
        }
        s.host.select(request.instance_id.as_deref());
        Ok(s.info())
    })
    .await?)
}

async fn save_session(
    RequireAuth(auth): RequireAuth,
    Extension(store): Extension<Arc<dyn DocumentStore>>,
    Extension(sessions): Sessions,
    Path(session_id): Path<Uuid>,
) -> ApiResult<CanvasDocument> {
    ok(sessions
        .save(session_id, &auth.user_id, store.as_ref())
        .await?)
}

/// Create preview session routes
pub fn sessions_routes() -> Router {
    Router::new()
        .route("/api/v1/documents/:id/session", post(open_session))
        .route("/api/v1/sessions", get(list_sessions))
        .route(
            "/api/v1/sessions/:id",
            get(get_session).delete(close_session),
        )
        .route("/api/v1/sessions/:id/components", post(add_component))
        .route(
            "/api/v1/sessions/:id/components/:instance_id",
            patch(edit_component).delete(remove_component),
        )
        .route(
            "/api/v1/sessions/:id/components/:instance_id/move",
            post(move_component),
        )
        .route("/api/v1/sessions/:id/clear", post(clear_components))
        .route("/api/v1/sessions/:id/selection", put(set_selection))
        .route("/api/v1/sessions/:id/save", post(save_session))
}
