//! Middleware module for the Nixora HTTP server
//!
//! Provides:
//! - Authentication (Bearer token / API key) via the `RequireAuth` extractor

pub mod auth;
