//! Authentication middleware for Axum
//!
//! Extracts Bearer tokens or API keys from requests and validates them
//! against the AuthStore. Provides `RequireAuth` extractor for handlers.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::server::config::AuthConfig;

/// User id handed to handlers when authentication is disabled
pub const ANONYMOUS_USER: &str = "anonymous";

/// Authentication failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No token in the request
    MissingCredentials,
    /// Token not known
    InvalidCredentials,
    /// Server misconfiguration
    Internal(String),
}

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: String,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self {
            user_id: ANONYMOUS_USER.to_string(),
        }
    }
}

// ============================================================================
// Auth Store
// ============================================================================

/// Static token table. Only SHA-256 digests of the tokens are kept.
pub struct AuthStore {
    /// token_hash_hex → user_id
    tokens: HashMap<String, String>,
    enabled: bool,
}

impl AuthStore {
    /// Create an empty store
    pub fn new(enabled: bool) -> Self {
        Self {
            tokens: HashMap::new(),
            enabled,
        }
    }

    /// Build the store from `[server.auth]`
    pub fn from_config(config: &AuthConfig) -> Self {
        let mut store = Self::new(config.enabled);
        for entry in &config.tokens {
            store.add_token(&entry.token, &entry.user_id);
        }
        store
    }

    /// Register a token for `user_id`
    pub fn add_token(&mut self, token: &str, user_id: &str) {
        self.tokens
            .insert(Self::hash_token(token), user_id.to_string());
    }

    /// Check if authentication is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of registered tokens
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    /// Validate a token and return the auth context
    pub fn validate_token(&self, token: &str) -> std::result::Result<AuthContext, AuthError> {
        if !self.enabled {
            return Ok(AuthContext::anonymous());
        }

        if token.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        match self.tokens.get(&Self::hash_token(token)) {
            Some(user_id) => {
                debug!(user_id = %user_id, "Token validated");
                Ok(AuthContext {
                    user_id: user_id.clone(),
                })
            }
            None => {
                warn!("Invalid token attempt");
                Err(AuthError::InvalidCredentials)
            }
        }
    }
}

// ============================================================================
// Rejection
// ============================================================================

/// JSON error response for auth failures
#[derive(Debug, Serialize)]
struct AuthErrorResponse {
    success: bool,
    error: String,
    code: String,
}

impl AuthErrorResponse {
    fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            code: code.into(),
        }
    }
}

/// Auth rejection type
pub struct AuthRejection {
    status: StatusCode,
    body: AuthErrorResponse,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<AuthError> for AuthRejection {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => AuthRejection {
                status: StatusCode::UNAUTHORIZED,
                body: AuthErrorResponse::new(
                    "Authentication required. Provide Authorization: Bearer <token> or X-API-Key header.",
                    "UNAUTHORIZED",
                ),
            },
            AuthError::InvalidCredentials => AuthRejection {
                status: StatusCode::UNAUTHORIZED,
                body: AuthErrorResponse::new("Invalid token or API key", "INVALID_CREDENTIALS"),
            },
            AuthError::Internal(msg) => AuthRejection {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: AuthErrorResponse::new(msg, "INTERNAL_ERROR"),
            },
        }
    }
}

// ============================================================================
// RequireAuth Extractor
// ============================================================================

/// Axum extractor that requires authentication.
///
/// Extracts the token from:
/// 1. `Authorization: Bearer <token>` header
/// 2. `X-API-Key: <key>` header
/// 3. `?token=<token>` query parameter
pub struct RequireAuth(pub AuthContext);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let auth_store = parts
            .extensions
            .get::<Arc<AuthStore>>()
            .ok_or_else(|| AuthError::Internal("AuthStore not configured".to_string()))?;

        if !auth_store.is_enabled() {
            return Ok(RequireAuth(AuthContext::anonymous()));
        }

        let token = extract_token(parts)?;
        let ctx = auth_store.validate_token(&token)?;

        Ok(RequireAuth(ctx))
    }
}

/// Extract token from request headers or query params
fn extract_token(parts: &Parts) -> std::result::Result<String, AuthError> {
    // 1. Authorization: Bearer <token>
    if let Some(auth_header) = parts.headers.get("authorization") {
        if let Ok(value) = auth_header.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Ok(token.trim().to_string());
            }
        }
    }

    // 2. X-API-Key header
    if let Some(api_key_header) = parts.headers.get("x-api-key") {
        if let Ok(value) = api_key_header.to_str() {
            return Ok(value.trim().to_string());
        }
    }

    // 3. ?token= query parameter
    if let Some(query) = parts.uri.query() {
        for param in query.split('&') {
            if let Some(token) = param.strip_prefix("token=") {
                return Ok(token.to_string());
            }
        }
    }

    Err(AuthError::MissingCredentials)
}
