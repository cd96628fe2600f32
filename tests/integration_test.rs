//! Integration tests for Nixora
//!
//! These tests drive a `HostOrchestrator` and a `SurfaceReconciler` against
//! each other over in-memory channels, the same way the WebSocket transport
//! connects them in production.

use std::sync::Arc;

use nixora_canvas::channel::{pair, HostEndpoint, SurfaceEndpoint};
use nixora_canvas::protocol::{decode, encode};
use nixora_canvas::{
    ComponentInstance, ComponentLibrary, DropTarget, Extent, HostMessage, HostOrchestrator,
    Props, RenderedCanvas, Schema, SurfaceMessage, SurfaceReconciler, TemplateRegistry,
};
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    host: HostOrchestrator,
    surface: SurfaceReconciler,
    to_host: UnboundedReceiver<SurfaceMessage>,
    to_surface: UnboundedReceiver<HostMessage>,
}

impl Harness {
    fn new(schema: Schema) -> Self {
        let (host_end, surface_end) = pair();
        let HostEndpoint {
            outbound: host_out,
            inbound: to_host,
        } = host_end;
        let SurfaceEndpoint {
            outbound: surface_out,
            inbound: to_surface,
        } = surface_end;

        let mut host =
            HostOrchestrator::new(Arc::new(ComponentLibrary::builtin())).with_schema(schema);
        host.attach(Box::new(host_out));
        let surface =
            SurfaceReconciler::new(Box::new(surface_out), Arc::new(TemplateRegistry::builtin()));

        Self {
            host,
            surface,
            to_host,
            to_surface,
        }
    }

    /// Messages the surface has posted but the host has not handled yet
    fn drain_to_host(&mut self) -> Vec<SurfaceMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.to_host.try_recv() {
            messages.push(message);
        }
        messages
    }

    /// Messages the host has posted but the surface has not handled yet
    fn drain_to_surface(&mut self) -> Vec<HostMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.to_surface.try_recv() {
            messages.push(message);
        }
        messages
    }

    /// Deliver messages in both directions until the link is quiet.
    /// Returns (surface→host, host→surface) message counts.
    fn pump(&mut self) -> (usize, usize) {
        let mut up = 0;
        let mut down = 0;
        loop {
            let inbound = self.drain_to_host();
            let outbound = self.drain_to_surface();
            if inbound.is_empty() && outbound.is_empty() {
                return (up, down);
            }
            up += inbound.len();
            down += outbound.len();
            for message in inbound {
                self.host.handle(message);
            }
            for message in outbound {
                self.surface.handle(message);
            }
        }
    }
}

fn instance(id: &str, component_type: &str) -> ComponentInstance {
    ComponentInstance::new(id, component_type)
}

fn abcd() -> Schema {
    Schema::from_instances(vec![
        instance("a", "hero"),
        instance("b", "marketing-text"),
        instance("c", "cta"),
        instance("d", "testimonials"),
    ])
}

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Snapshot identity
// ============================================================================

#[test]
fn test_snapshot_round_trip_reproduces_host_state() {
    let mut props = Props::new();
    props.insert("headline".into(), json!("Ship"));
    props.insert("nested".into(), json!({"list": [1, 2, {"deep": null}]}));
    let schema = Schema::from_instances(vec![
        instance("a", "hero").with_props(props),
        instance("b", "cta"),
    ]);

    let mut h = Harness::new(schema);
    h.host.select(Some("b"));
    h.surface.mount();
    h.pump();

    assert_eq!(h.surface.schema(), h.host.schema());
    assert_eq!(h.surface.selection(), h.host.selection());

    // Identity over the wire as well
    let snapshot = h.host.snapshot();
    let text = encode(&snapshot).unwrap();
    let decoded: HostMessage = decode(&text).unwrap().unwrap();
    assert_eq!(decoded, snapshot);
}

// ============================================================================
// Reorder
// ============================================================================

#[test]
fn test_noop_drag_emits_nothing() {
    let mut h = Harness::new(abcd());
    h.surface.mount();
    h.pump();

    // Dropping `a` just before `b` keeps the order
    assert!(h.surface.begin_drag("a"));
    h.surface.hover(DropTarget::before("b"));
    assert!(!h.surface.finish_drag());

    assert!(h.drain_to_host().is_empty());
    assert_eq!(h.host.schema().ids(), ids(&["a", "b", "c", "d"]));
    assert_eq!(h.surface.ids(), ids(&["a", "b", "c", "d"]));
}

#[test]
fn test_partial_reorder_keeps_missing_components() {
    let mut h = Harness::new(abcd());
    h.surface.mount();
    h.pump();

    h.host.handle(SurfaceMessage::ComponentsReordered {
        instance_ids: ids(&["c", "a"]),
    });
    assert_eq!(h.host.schema().ids(), ids(&["c", "a", "b", "d"]));

    h.pump();
    assert_eq!(h.surface.ids(), ids(&["c", "a", "b", "d"]));
}

#[test]
fn test_drag_commit_reaches_host() {
    let mut h = Harness::new(abcd());
    h.surface.mount();
    h.pump();

    // Pointer in the lower half of `c` drops `a` after it
    assert!(h.surface.begin_drag("a"));
    h.surface.hover_pointer("c", 175.0, Extent::new(160.0, 20.0));
    assert_eq!(h.surface.drop_indicator(), Some(2));
    assert!(h.surface.finish_drag());

    // Optimistic local order before the host answers
    assert_eq!(h.surface.ids(), ids(&["b", "c", "a", "d"]));

    let (up, down) = h.pump();
    assert_eq!(up, 1);
    assert_eq!(down, 1);
    assert_eq!(h.host.schema().ids(), ids(&["b", "c", "a", "d"]));
    assert_eq!(h.surface.ids(), ids(&["b", "c", "a", "d"]));
}

// ============================================================================
// Selection
// ============================================================================

#[test]
fn test_removing_selected_component_clears_selection_everywhere() {
    let mut h = Harness::new(abcd());
    h.surface.mount();
    h.pump();

    h.host.select(Some("b"));
    h.pump();
    assert_eq!(h.surface.selection().id(), Some("b"));

    assert!(h.host.apply_local_remove("b").is_some());
    assert_eq!(h.host.selection().id(), None);

    h.pump();
    assert_eq!(h.surface.selection().id(), None);
    assert_eq!(h.surface.ids(), ids(&["a", "c", "d"]));
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn test_unknown_component_type_renders_placeholder() {
    let schema = Schema::from_instances(vec![
        instance("a", "hero"),
        instance("x", "mystery-widget"),
        instance("c", "cta"),
    ]);
    let mut h = Harness::new(schema);
    h.surface.mount();
    h.pump();

    let RenderedCanvas::Components { items, .. } = h.surface.render() else {
        panic!("expected components");
    };
    assert_eq!(items.len(), 3);
    assert!(!items[0].component.placeholder);
    assert!(items[1].component.placeholder);
    assert_eq!(items[1].component.instance_id, "x");
    assert!(!items[2].component.placeholder);
}

// ============================================================================
// Handshake
// ============================================================================

#[test]
fn test_nothing_is_pushed_before_ready() {
    let mut h = Harness::new(Schema::new());
    h.host.apply_local_add("hero", Props::new());
    h.host.apply_local_add("cta", Props::new());

    assert!(h.drain_to_surface().is_empty());
    assert_eq!(h.surface.render(), RenderedCanvas::Waiting);
}

#[test]
fn test_every_ready_gets_current_state() {
    let mut h = Harness::new(abcd());
    h.surface.mount();
    let (_, down) = h.pump();
    assert_eq!(down, 1);

    // Host edits while the surface reloads
    h.surface.unmount();
    h.host.apply_local_remove("a");
    h.pump();
    h.host.apply_local_add("marketing-button", Props::new());
    h.pump();

    h.surface.mount();
    h.pump();
    assert_eq!(h.surface.schema(), h.host.schema());
    assert_eq!(h.surface.ids().len(), 4);
    assert!(!h.surface.ids().contains(&"a".to_string()));
    assert_eq!(h.surface.selection(), h.host.selection());
}

// ============================================================================
// End to end
// ============================================================================

#[test]
fn test_builder_session_end_to_end() {
    let mut h = Harness::new(Schema::new());
    h.surface.mount();
    h.pump();
    assert_eq!(h.surface.render(), RenderedCanvas::Empty);

    // Add from the library
    let id = h
        .host
        .apply_local_add("marketing-button", Props::new())
        .unwrap();
    let snapshots = h.drain_to_surface();
    assert_eq!(snapshots.len(), 1);
    let HostMessage::UpdateComponents {
        schema,
        selected_instance_id,
    } = snapshots[0].clone();
    assert_eq!(schema.ids(), vec![id.clone()]);
    assert_eq!(selected_instance_id.as_deref(), Some(id.as_str()));
    for snapshot in snapshots {
        h.surface.handle(snapshot);
    }

    // Click the already selected component
    assert!(h.surface.select(&id));
    let clicks = h.drain_to_host();
    assert_eq!(
        clicks,
        vec![SurfaceMessage::ComponentSelected {
            instance_id: id.clone(),
            component_type: "marketing-button".into(),
            index: 0,
        }]
    );
    for click in clicks {
        h.host.handle(click);
    }
    assert_eq!(h.host.selection().id(), Some(id.as_str()));
    assert!(h.drain_to_surface().is_empty());

    // Dragging the only component anywhere is a no-op
    assert!(h.surface.begin_drag(&id));
    h.surface.hover(DropTarget::End);
    assert!(!h.surface.finish_drag());
    assert!(h.drain_to_host().is_empty());
    assert_eq!(h.host.schema().ids(), vec![id]);
}
