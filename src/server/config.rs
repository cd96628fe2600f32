//! Server configuration types
//!
//! Contains all configuration structures for the Nixora server.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Copy with token secrets masked, for printing
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        for token in &mut config.server.auth.tokens {
            token.token = "********".to_string();
        }
        config
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            bail!("server.port must be non-zero");
        }
        if self.server.auth.enabled && self.server.auth.tokens.is_empty() {
            bail!("server.auth.enabled requires at least one entry in server.auth.tokens");
        }
        if let Some(entry) = self
            .server
            .auth
            .tokens
            .iter()
            .find(|t| t.token.trim().is_empty() || t.user_id.trim().is_empty())
        {
            bail!(
                "server.auth.tokens entries need a token and a user_id (user_id: {:?})",
                entry.user_id
            );
        }
        if self.preview.max_message_size == 0 {
            bail!("preview.max_message_size must be non-zero");
        }
        if self.preview.cleanup_interval_secs == 0 {
            bail!("preview.cleanup_interval_secs must be non-zero");
        }
        let base = self.publish.base_url.as_str();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            bail!("publish.base_url must be an http(s) URL, got {:?}", base);
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            auth: AuthConfig::default(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Enable bearer authentication on the REST API
    #[serde(default)]
    pub enabled: bool,
    /// Static API tokens
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
}

/// A static API token and the user it authenticates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub token: String,
    pub user_id: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite://nixora.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

/// Live preview configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "default_max_sessions_per_user")]
    pub max_sessions_per_user: usize,
    #[serde(default = "default_max_idle_secs")]
    pub max_idle_secs: i64,
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// Largest accepted inbound frame in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    #[serde(default)]
    pub origins: OriginsConfig,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_sessions_per_user: default_max_sessions_per_user(),
            max_idle_secs: default_max_idle_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            max_message_size: default_max_message_size(),
            origins: OriginsConfig::default(),
        }
    }
}

fn default_max_sessions_per_user() -> usize {
    10
}

fn default_max_idle_secs() -> i64 {
    3600
}

fn default_cleanup_interval_secs() -> u64 {
    300
}

fn default_max_message_size() -> usize {
    nixora_canvas::security::DEFAULT_MAX_MESSAGE_SIZE
}

/// Which page origins may open a preview connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginsConfig {
    /// Accept any origin (development only)
    #[serde(default)]
    pub allow_any: bool,
    /// Hosts accepted exactly or as a parent domain
    #[serde(default = "default_allowed_hosts")]
    pub allowed_hosts: Vec<String>,
}

impl Default for OriginsConfig {
    fn default() -> Self {
        Self {
            allow_any: false,
            allowed_hosts: default_allowed_hosts(),
        }
    }
}

fn default_allowed_hosts() -> Vec<String> {
    vec!["localhost".to_string()]
}

/// Publishing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Base of public page URLs (`{base_url}/p/{id}`)
    #[serde(default = "default_publish_base_url")]
    pub base_url: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            base_url: default_publish_base_url(),
        }
    }
}

fn default_publish_base_url() -> String {
    "http://localhost:8080".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines
    #[serde(default)]
    pub json: bool,
}
