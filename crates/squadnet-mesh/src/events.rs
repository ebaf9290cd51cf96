//! Events the mesh delivers upward to the application layer.

use squadnet_protocol::Recipient;
use squadnet_transport::EndpointId;

/// What the application sees. Delivered on the event channel returned by
/// [`crate::MeshService::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshEvent {
    /// An application message arrived. `authentic` combines signature
    /// validity with the endpoint/alias binding check; unauthentic messages
    /// are still delivered — acting on them (or surfacing a warning) is the
    /// consumer's call.
    MessageReceived {
        endpoint: EndpointId,
        message: String,
        authentic: bool,
        recipient: Recipient,
    },
    /// A connection handshake completed.
    EndpointConnected(EndpointId),
    /// A live connection dropped.
    EndpointDisconnected(EndpointId),
    /// A peer tried to connect under a display name already bound to a live
    /// endpoint. Only emitted when duplicate-name rejection is enabled.
    ImpersonationDetected(EndpointId),
}
