//! Host/Preview Protocol Messages
//!
//! This module defines the closed set of envelopes exchanged between the
//! builder host and the embedded preview surface. Every envelope is a JSON
//! object `{"type": <discriminant>, "payload": {...}}`.
//!
//! Receivers ignore discriminants they do not know, so either side can be
//! deployed ahead of the other.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::schema::Schema;

/// Protocol revision of the discriminant set below
pub const PROTOCOL_VERSION: u32 = 1;

/// Envelope discriminants
pub mod message_type {
    /// Host pushes a full schema snapshot
    pub const UPDATE_COMPONENTS: &str = "builder:update-components";
    /// Surface finished mounting and wants a snapshot
    pub const READY: &str = "preview:ready";
    /// Surface-side selection gesture
    pub const COMPONENT_SELECTED: &str = "preview:component-selected";
    /// Surface-side drag reorder completed
    pub const COMPONENTS_REORDERED: &str = "preview:components-reordered";
}

/// Messages sent from the host to the preview surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum HostMessage {
    /// Full authoritative snapshot
    #[serde(rename = "builder:update-components", rename_all = "camelCase")]
    UpdateComponents {
        /// Ordered component instances
        schema: Schema,
        /// Selected instance, if any
        #[serde(default)]
        selected_instance_id: Option<String>,
    },
}

/// Messages sent from the preview surface to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum SurfaceMessage {
    /// Handshake, once per mount
    #[serde(rename = "preview:ready")]
    Ready,

    /// An instance was clicked or keyboard-activated
    #[serde(rename = "preview:component-selected", rename_all = "camelCase")]
    ComponentSelected {
        /// Selected instance id
        instance_id: String,
        /// Its template key
        component_type: String,
        /// Its position in the surface's rendered order
        index: usize,
    },

    /// A drag reorder completed
    #[serde(rename = "preview:components-reordered", rename_all = "camelCase")]
    ComponentsReordered {
        /// Full ordered id list after the drag
        instance_ids: Vec<String>,
    },
}

/// A message type that can travel over the channel
pub trait Envelope: Serialize + DeserializeOwned {
    /// Discriminants this type understands
    const KNOWN_TYPES: &'static [&'static str];

    /// Discriminant of this message
    fn message_type(&self) -> &'static str;
}

impl Envelope for HostMessage {
    const KNOWN_TYPES: &'static [&'static str] = &[message_type::UPDATE_COMPONENTS];

    fn message_type(&self) -> &'static str {
        match self {
            Self::UpdateComponents { .. } => message_type::UPDATE_COMPONENTS,
        }
    }
}

impl Envelope for SurfaceMessage {
    const KNOWN_TYPES: &'static [&'static str] = &[
        message_type::READY,
        message_type::COMPONENT_SELECTED,
        message_type::COMPONENTS_REORDERED,
    ];

    fn message_type(&self) -> &'static str {
        match self {
            Self::Ready => message_type::READY,
            Self::ComponentSelected { .. } => message_type::COMPONENT_SELECTED,
            Self::ComponentsReordered { .. } => message_type::COMPONENTS_REORDERED,
        }
    }
}

/// Decode a text frame.
///
/// Returns `Ok(None)` for frames whose `type` is missing or unknown. A known
/// type with a malformed payload is an `InvalidMessage` error.
pub fn decode<M: Envelope>(text: &str) -> Result<Option<M>> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    decode_value(value)
}

/// Decode an already-parsed JSON value
pub fn decode_value<M: Envelope>(value: serde_json::Value) -> Result<Option<M>> {
    let Some(kind) = value.get("type").and_then(|t| t.as_str()) else {
        debug!("Ignoring message without type");
        return Ok(None);
    };
    if !M::KNOWN_TYPES.contains(&kind) {
        debug!(message_type = %kind, "Ignoring unknown message type");
        return Ok(None);
    }
    let kind = kind.to_string();
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| Error::invalid_message(format!("{kind}: {e}")))
}

/// Encode a message as a text frame
pub fn encode<M: Envelope>(message: &M) -> Result<String> {
    Ok(serde_json::to_string(message)?)
}

/// Handshake state of one preview surface connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No surface attached
    #[default]
    Disconnected,
    /// Surface attached, ready signal not yet received
    AwaitingReady,
    /// Ready received, snapshots flowing
    Synced,
}

impl HostMessage {
    /// Build a snapshot message
    #[must_use]
    pub fn snapshot(schema: Schema, selected_instance_id: Option<String>) -> Self {
        Self::UpdateComponents {
            schema,
            selected_instance_id,
        }
    }
}
