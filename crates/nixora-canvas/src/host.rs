//! Host Orchestrator
//!
//! The builder side of the preview protocol. Owns the authoritative schema and
//! selection, applies local edits, reconciles envelopes coming back from the
//! preview surface and pushes full snapshots to it.
//!
//! ## Handshake
//!
//! ```text
//! Disconnected --attach--> AwaitingReady --ready--> Synced --ready--> Synced
//!       ^                                              |
//!       +-------------------detach---------------------+
//! ```
//!
//! Nothing is pushed before the first `ready`. Every `ready` (including after
//! a preview reload) pushes the state as it is at that moment. While synced,
//! every change to schema or selection pushes a fresh snapshot.

use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::channel::Outbound;
use crate::library::ComponentLibrary;
use crate::protocol::{self, ConnectionState, Envelope, HostMessage, SurfaceMessage};
use crate::reorder::{self, Direction};
use crate::schema::{ComponentInstance, Props, Schema, Selection};

/// Authoritative editor state for one document
pub struct HostOrchestrator {
    schema: Schema,
    selection: Selection,
    library: Arc<ComponentLibrary>,
    state: ConnectionState,
    link: Option<Box<dyn Outbound<HostMessage>>>,
}

impl std::fmt::Debug for HostOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostOrchestrator")
            .field("schema", &self.schema)
            .field("selection", &self.selection)
            .field("state", &self.state)
            .finish()
    }
}

impl HostOrchestrator {
    /// Create an orchestrator with an empty schema
    #[must_use]
    pub fn new(library: Arc<ComponentLibrary>) -> Self {
        Self {
            schema: Schema::new(),
            selection: Selection::none(),
            library,
            state: ConnectionState::Disconnected,
            link: None,
        }
    }

    /// Start from an existing schema
    #[must_use]
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.load(schema);
        self
    }

    /// Authoritative schema
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Current selection
    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Handshake state of the attached surface
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    /// Component library used for local adds
    #[must_use]
    pub fn library(&self) -> &ComponentLibrary {
        &self.library
    }

    /// Snapshot of the current state
    #[must_use]
    pub fn snapshot(&self) -> HostMessage {
        HostMessage::snapshot(self.schema.clone(), self.selection.to_wire())
    }

    // ------------------------------------------------------------------
    // Connection lifecycle
    // ------------------------------------------------------------------

    /// Attach a preview surface. Any previous surface is superseded.
    pub fn attach(&mut self, link: Box<dyn Outbound<HostMessage>>) {
        if self.link.is_some() {
            info!("Replacing attached preview surface");
        }
        self.link = Some(link);
        self.state = ConnectionState::AwaitingReady;
    }

    /// Detach the preview surface
    pub fn detach(&mut self) {
        self.link = None;
        self.state = ConnectionState::Disconnected;
    }

    /// Decode and handle a raw text frame. Unknown or malformed frames are dropped.
    pub fn handle_raw(&mut self, text: &str) {
        match protocol::decode::<SurfaceMessage>(text) {
            Ok(Some(message)) => self.handle(message),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Dropping malformed preview message"),
        }
    }

    /// Handle an envelope from the preview surface
    pub fn handle(&mut self, message: SurfaceMessage) {
        debug!(message_type = message.message_type(), "Preview message");
        match message {
            SurfaceMessage::Ready => self.on_ready(),
            SurfaceMessage::ComponentSelected {
                instance_id,
                index,
                ..
            } => self.reconcile_selection(&instance_id, index),
            SurfaceMessage::ComponentsReordered { instance_ids } => {
                self.reconcile_reorder(&instance_ids)
            }
        }
    }

    fn on_ready(&mut self) {
        if self.link.is_none() {
            debug!("Ready signal without an attached surface");
            return;
        }
        if self.state == ConnectionState::Synced {
            info!("Preview surface re-announced readiness");
        }
        self.state = ConnectionState::Synced;
        self.push_snapshot();
    }

    fn push_snapshot(&mut self) {
        if self.state != ConnectionState::Synced {
            return;
        }
        let Some(link) = &self.link else {
            return;
        };
        if !link.post(self.snapshot()) {
            info!("Preview surface went away");
            self.detach();
        }
    }

    // ------------------------------------------------------------------
    // Local edits
    // ------------------------------------------------------------------

    /// Append a new instance of `component_type` and select it.
    ///
    /// Returns `None` (and changes nothing) if the library does not know the type.
    pub fn apply_local_add(&mut self, component_type: &str, initial_props: Props) -> Option<String> {
        let Some(props) = self.library.initial_props(component_type, initial_props) else {
            warn!(component_type = %component_type, "Unknown component type, add ignored");
            return None;
        };

        let id = self.generate_instance_id(component_type);
        self.schema
            .push(ComponentInstance::new(id.clone(), component_type).with_props(props));
        self.selection.select(&self.schema, &id);
        debug!(instance_id = %id, component_type = %component_type, "Component added");

        self.push_snapshot();
        Some(id)
    }

    /// Set `props[key]` on an instance. Stale ids are a no-op.
    pub fn apply_local_property_edit(
        &mut self,
        instance_id: &str,
        key: &str,
        value: serde_json::Value,
    ) -> bool {
        if !self.schema.set_prop(instance_id, key, value) {
            debug!(instance_id = %instance_id, "Property edit for missing instance ignored");
            return false;
        }
        self.push_snapshot();
        true
    }

    /// Merge several props into an instance. Stale ids are a no-op.
    pub fn apply_local_properties_edit(&mut self, instance_id: &str, props: Props) -> bool {
        if !self.schema.merge_props(instance_id, props) {
            debug!(instance_id = %instance_id, "Property edit for missing instance ignored");
            return false;
        }
        self.push_snapshot();
        true
    }

    /// Remove an instance, clearing the selection if it pointed at it
    pub fn apply_local_remove(&mut self, instance_id: &str) -> Option<ComponentInstance> {
        let removed = self.schema.remove(instance_id)?;
        self.selection.retain_valid(&self.schema);
        debug!(instance_id = %instance_id, "Component removed");
        self.push_snapshot();
        Some(removed)
    }

    /// Move an instance one slot up or down
    pub fn apply_local_move(&mut self, instance_id: &str, direction: Direction) -> bool {
        let ids = self.schema.ids();
        let Some(next) = reorder::nudge_target(&ids, instance_id, direction)
            .and_then(|target| reorder::apply_drop(&ids, instance_id, &target))
        else {
            return false;
        };
        self.schema.reorder_by_ids(&next);
        self.push_snapshot();
        true
    }

    /// Select an instance from the host UI, or clear the selection with `None`.
    ///
    /// Stale ids are ignored.
    pub fn select(&mut self, instance_id: Option<&str>) -> bool {
        let changed = match instance_id {
            Some(id) => self.selection.select(&self.schema, id),
            None => self.selection.clear(),
        };
        if changed {
            self.push_snapshot();
        }
        changed
    }

    /// Remove every component
    pub fn clear(&mut self) {
        self.schema.clear();
        self.selection.clear();
        self.push_snapshot();
    }

    /// Replace the authoritative schema, e.g. when a document is opened
    pub fn load(&mut self, schema: Schema) {
        self.schema = schema;
        self.selection.clear();
        self.push_snapshot();
    }

    // ------------------------------------------------------------------
    // Reconciliation of surface envelopes
    // ------------------------------------------------------------------

    /// Apply a full ordered id list from the surface.
    ///
    /// Ids the host no longer knows are skipped; instances the list does not
    /// mention keep their relative order at the end.
    pub fn reconcile_reorder(&mut self, instance_ids: &[String]) {
        let changed = self.schema.reorder_by_ids(instance_ids);
        if instance_ids.len() != self.schema.len() {
            debug!(
                received = instance_ids.len(),
                known = self.schema.len(),
                "Reorder list did not match schema, merged"
            );
        }
        self.selection.retain_valid(&self.schema);
        debug!(changed, "Reorder reconciled");
        self.push_snapshot();
    }

    /// Apply a selection from the surface if the instance still exists
    pub fn reconcile_selection(&mut self, instance_id: &str, index: usize) {
        if !self.schema.contains(instance_id) {
            debug!(instance_id = %instance_id, "Selection of missing instance ignored");
            return;
        }
        if self.schema.position(instance_id) != Some(index) {
            debug!(instance_id = %instance_id, index, "Selection index differs from host order");
        }
        if self.selection.select(&self.schema, instance_id) {
            self.push_snapshot();
        }
    }

    fn generate_instance_id(&self, component_type: &str) -> String {
        loop {
            let id = format!("{}-{}", component_type, Uuid::new_v4().simple());
            if !self.schema.contains(&id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
