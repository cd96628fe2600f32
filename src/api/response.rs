//! Response envelope and error mapping shared by every endpoint

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use nixora_canvas::Error as CanvasError;
use serde::Serialize;
use tracing::error;

/// Standard API response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> ApiResponse<T> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Failed request, rendered as `{success: false, error, code}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ApiErrorBody {
    success: bool,
    error: String,
    code: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }
}

impl From<CanvasError> for ApiError {
    fn from(err: CanvasError) -> Self {
        let status = match &err {
            CanvasError::SessionNotFound(_) | CanvasError::DocumentNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            CanvasError::PermissionDenied(_) | CanvasError::OriginRejected(_) => {
                StatusCode::FORBIDDEN
            }
            CanvasError::InvalidMessage(_)
            | CanvasError::MessageTooLarge(_)
            | CanvasError::Serialization(_) => StatusCode::BAD_REQUEST,
            CanvasError::MaxSessionsExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(code = err.code(), error = %err, "Request failed");
        }
        Self::new(status, err.code(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            success: false,
            error: self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Handler result
pub type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

/// Wrap `data` in a successful response
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}
