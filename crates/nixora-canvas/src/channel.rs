//! Message Channel
//!
//! Point-to-point, FIFO delivery between the host and one preview surface.
//! Both reconcilers only ever see the `Outbound` half; the WebSocket handler
//! and the in-process `pair` below provide the other side.

use tokio::sync::mpsc;

use crate::protocol::{HostMessage, SurfaceMessage};

/// Sending half of a cross-context channel
pub trait Outbound<M>: Send + Sync {
    /// Post a message. Returns false if the other side is gone.
    fn post(&self, message: M) -> bool;
}

impl<M: Send> Outbound<M> for mpsc::UnboundedSender<M> {
    fn post(&self, message: M) -> bool {
        self.send(message).is_ok()
    }
}

/// Host end of an in-process link
pub struct HostEndpoint {
    /// Sends snapshots to the surface
    pub outbound: mpsc::UnboundedSender<HostMessage>,
    /// Receives surface envelopes
    pub inbound: mpsc::UnboundedReceiver<SurfaceMessage>,
}

/// Surface end of an in-process link
pub struct SurfaceEndpoint {
    /// Sends envelopes to the host
    pub outbound: mpsc::UnboundedSender<SurfaceMessage>,
    /// Receives snapshots from the host
    pub inbound: mpsc::UnboundedReceiver<HostMessage>,
}

/// Create a connected host/surface pair
#[must_use]
pub fn pair() -> (HostEndpoint, SurfaceEndpoint) {
    let (to_surface, from_host) = mpsc::unbounded_channel();
    let (to_host, from_surface) = mpsc::unbounded_channel();
    (
        HostEndpoint {
            outbound: to_surface,
            inbound: from_surface,
        },
        SurfaceEndpoint {
            outbound: to_host,
            inbound: from_host,
        },
    )
}
