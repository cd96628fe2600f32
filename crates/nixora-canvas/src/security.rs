//! Preview Transport Security
//!
//! Origin allow-listing for preview surface connections and inbound frame
//! limits. Message shapes are untouched; this only decides whether a peer
//! may talk to a session at all.

use crate::error::{Error, Result};

/// Default inbound frame limit (256 KiB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 256 * 1024;

/// Which origins may open a preview connection
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    /// Accept any origin, including none at all
    allow_any: bool,

    /// Allowed hosts; a host also admits its subdomains
    allowed_hosts: Vec<String>,

    /// Maximum inbound frame size in bytes
    pub max_message_size: usize,
}

impl Default for OriginPolicy {
    fn default() -> Self {
        Self::new(vec!["localhost".to_string()])
    }
}

impl OriginPolicy {
    /// Restrictive policy admitting only `allowed_hosts`
    #[must_use]
    pub fn new(allowed_hosts: Vec<String>) -> Self {
        Self {
            allow_any: false,
            allowed_hosts: allowed_hosts
                .into_iter()
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Wildcard policy. Only for deployments where host and preview share a
    /// trusted origin.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            allow_any: true,
            ..Self::default()
        }
    }

    /// Set the inbound frame limit
    #[must_use]
    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    /// Whether every origin is accepted
    #[must_use]
    pub fn allows_any(&self) -> bool {
        self.allow_any
    }

    /// Check the `Origin` header of a connection attempt
    pub fn check_origin(&self, origin: Option<&str>) -> Result<()> {
        if self.allow_any {
            return Ok(());
        }
        let Some(origin) = origin else {
            return Err(Error::OriginRejected("missing origin".into()));
        };

        let parsed =
            url::Url::parse(origin).map_err(|_| Error::OriginRejected(origin.to_string()))?;

        match parsed.scheme() {
            "http" | "https" => {}
            _ => return Err(Error::OriginRejected(origin.to_string())),
        }

        let host = parsed.host_str().unwrap_or("").to_ascii_lowercase();
        let allowed = self
            .allowed_hosts
            .iter()
            .any(|h| host == *h || host.ends_with(&format!(".{}", h)));

        if !allowed {
            return Err(Error::OriginRejected(origin.to_string()));
        }

        Ok(())
    }

    /// Check the size of an inbound frame
    pub fn check_frame(&self, text: &str) -> Result<()> {
        if text.len() > self.max_message_size {
            return Err(Error::MessageTooLarge(text.len()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "security_tests.rs"]
mod tests;
