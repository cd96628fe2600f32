//! Embedded-Surface Reconciler
//!
//! The preview side of the protocol. Keeps a render-only copy of the last
//! snapshot, applies gestures optimistically and reports them to the host.
//! The next snapshot always overwrites local state wholesale.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::channel::Outbound;
use crate::protocol::{self, HostMessage, SurfaceMessage};
use crate::renderer::{RenderedComponent, TemplateRegistry};
use crate::reorder::{self, Direction, DragGesture, DropTarget, Extent};
use crate::schema::{Schema, Selection};

/// One instance in the rendered canvas
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedItem {
    /// Position in the local order
    pub index: usize,
    /// Template output
    pub component: RenderedComponent,
    /// Selection highlight
    pub selected: bool,
    /// Instance is being dragged
    pub dragging: bool,
}

/// What the surface currently shows
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedCanvas {
    /// No snapshot received yet
    Waiting,
    /// Snapshot received, nothing on the canvas
    Empty,
    /// Components in local order
    Components {
        /// Rendered instances
        items: Vec<RenderedItem>,
        /// Slot where the dragged item would land
        drop_indicator: Option<usize>,
    },
}

/// Preview-side state machine
pub struct SurfaceReconciler {
    schema: Schema,
    selection: Selection,
    received: bool,
    mounted: bool,
    drag: Option<DragGesture>,
    templates: Arc<TemplateRegistry>,
    link: Box<dyn Outbound<SurfaceMessage>>,
}

impl std::fmt::Debug for SurfaceReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceReconciler")
            .field("schema", &self.schema)
            .field("selection", &self.selection)
            .field("received", &self.received)
            .field("mounted", &self.mounted)
            .field("drag", &self.drag)
            .finish()
    }
}

impl SurfaceReconciler {
    /// Create an unmounted surface posting to `link`
    #[must_use]
    pub fn new(link: Box<dyn Outbound<SurfaceMessage>>, templates: Arc<TemplateRegistry>) -> Self {
        Self {
            schema: Schema::new(),
            selection: Selection::none(),
            received: false,
            mounted: false,
            drag: None,
            templates,
            link,
        }
    }

    /// Mount and announce readiness. Only the first call per mount emits.
    pub fn mount(&mut self) -> bool {
        if self.mounted {
            return false;
        }
        self.mounted = true;
        self.post(SurfaceMessage::Ready);
        true
    }

    /// Unmount. An in-flight drag is dropped without emitting and local
    /// state is discarded, as on a reload.
    pub fn unmount(&mut self) {
        if let Some(gesture) = self.drag.take() {
            debug!(instance_id = %gesture.dragged(), "Drag abandoned on unmount");
        }
        self.mounted = false;
        self.received = false;
        self.schema = Schema::new();
        self.selection = Selection::none();
    }

    /// Whether the surface is mounted
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Whether any snapshot has arrived since mount
    #[must_use]
    pub fn has_snapshot(&self) -> bool {
        self.received
    }

    /// Local schema copy
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Local selection
    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Locally rendered order
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.schema.ids()
    }

    /// Id of the item being dragged
    #[must_use]
    pub fn dragging(&self) -> Option<&str> {
        self.drag.as_ref().map(DragGesture::dragged)
    }

    /// Current drop indicator slot
    #[must_use]
    pub fn drop_indicator(&self) -> Option<usize> {
        self.drag.as_ref().and_then(DragGesture::indicator)
    }

    // ------------------------------------------------------------------
    // Inbound
    // ------------------------------------------------------------------

    /// Decode and handle a raw text frame. Unknown or malformed frames are dropped.
    pub fn handle_raw(&mut self, text: &str) {
        match protocol::decode::<HostMessage>(text) {
            Ok(Some(message)) => self.handle(message),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Dropping malformed host message"),
        }
    }

    /// Handle an envelope from the host
    pub fn handle(&mut self, message: HostMessage) {
        match message {
            HostMessage::UpdateComponents {
                schema,
                selected_instance_id,
            } => self.apply_snapshot(schema, selected_instance_id),
        }
    }

    /// Replace local state with an authoritative snapshot
    pub fn apply_snapshot(&mut self, schema: Schema, selected_instance_id: Option<String>) {
        self.selection = Selection::from_wire(selected_instance_id, &schema);
        self.schema = schema;
        self.received = true;

        if let Some(gesture) = self.drag.as_mut() {
            if !gesture.rebase(self.schema.ids()) {
                debug!(instance_id = %gesture.dragged(), "Dragged instance removed by host");
                self.drag = None;
            }
        }
        debug!(components = self.schema.len(), "Snapshot applied");
    }

    // ------------------------------------------------------------------
    // Gestures
    // ------------------------------------------------------------------

    /// Click or keyboard activation on an instance
    pub fn select(&mut self, instance_id: &str) -> bool {
        if !self.mounted {
            return false;
        }
        let Some(index) = self.schema.position(instance_id) else {
            return false;
        };
        let component_type = self.schema.as_slice()[index].component_type.clone();
        self.selection.select(&self.schema, instance_id);
        self.post(SurfaceMessage::ComponentSelected {
            instance_id: instance_id.to_string(),
            component_type,
            index,
        });
        true
    }

    /// Start dragging an instance. Replaces any gesture already in progress.
    pub fn begin_drag(&mut self, instance_id: &str) -> bool {
        if !self.mounted {
            return false;
        }
        self.drag = DragGesture::start(instance_id, self.schema.ids());
        self.drag.is_some()
    }

    /// Hover over a resolved drop target
    pub fn hover(&mut self, target: DropTarget) {
        if let Some(gesture) = self.drag.as_mut() {
            gesture.hover(target);
        }
    }

    /// Hover over `over_id` with the pointer at `pointer` along the drag axis
    pub fn hover_pointer(&mut self, over_id: &str, pointer: f64, extent: Extent) {
        let side = reorder::resolve_side(pointer, extent);
        self.hover(DropTarget::Item {
            id: over_id.to_string(),
            side,
        });
    }

    /// Pointer left every drop zone
    pub fn leave(&mut self) {
        if let Some(gesture) = self.drag.as_mut() {
            gesture.leave();
        }
    }

    /// Release the pointer. Emits a reorder only if the order changed.
    pub fn finish_drag(&mut self) -> bool {
        let Some(gesture) = self.drag.take() else {
            return false;
        };
        match gesture.finish() {
            Some(next) => {
                self.commit_order(next);
                true
            }
            None => false,
        }
    }

    /// Abort the drag; the committed order stands and nothing is emitted
    pub fn cancel_drag(&mut self) {
        if let Some(gesture) = self.drag.take() {
            let _ = gesture.cancel();
        }
    }

    /// Keyboard reorder by one slot
    pub fn nudge(&mut self, instance_id: &str, direction: Direction) -> bool {
        if !self.mounted {
            return false;
        }
        let ids = self.schema.ids();
        let Some(next) = reorder::nudge_target(&ids, instance_id, direction)
            .and_then(|target| reorder::apply_drop(&ids, instance_id, &target))
        else {
            return false;
        };
        self.commit_order(next);
        true
    }

    fn commit_order(&mut self, next: Vec<String>) {
        self.schema.reorder_by_ids(&next);
        self.post(SurfaceMessage::ComponentsReordered { instance_ids: next });
    }

    fn post(&self, message: SurfaceMessage) {
        if !self.link.post(message) {
            debug!("Host link closed, message dropped");
        }
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Render the local state
    #[must_use]
    pub fn render(&self) -> RenderedCanvas {
        if !self.received {
            return RenderedCanvas::Waiting;
        }
        if self.schema.is_empty() {
            return RenderedCanvas::Empty;
        }

        let dragging = self.dragging();
        let items = self
            .schema
            .iter()
            .enumerate()
            .map(|(index, instance)| RenderedItem {
                index,
                component: self.templates.render_instance(instance),
                selected: self.selection.is(&instance.id),
                dragging: dragging == Some(instance.id.as_str()),
            })
            .collect();

        RenderedCanvas::Components {
            items,
            drop_indicator: self.drop_indicator(),
        }
    }
}

#[cfg(test)]
#[path = "surface_tests.rs"]
mod tests;
