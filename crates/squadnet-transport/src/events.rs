//! Commands sent to the transport driver and events it delivers back.

use tokio::sync::oneshot;

use crate::{EndpointId, TransportError};

/// A request from the mesh layer to the transport driver.
///
/// Start requests are asynchronous with an explicit success/failure ack; the
/// mesh must not assume they took effect before the ack arrives. Stops and
/// connection operations are fire-and-forget.
#[derive(Debug)]
pub enum TransportCommand {
    StartAdvertising {
        display_name: String,
        service_id: String,
        reply: oneshot::Sender<Result<(), TransportError>>,
    },
    StopAdvertising,
    StartDiscovery {
        service_id: String,
        reply: oneshot::Sender<Result<(), TransportError>>,
    },
    StopDiscovery,
    /// Initiate a connection to a discovered endpoint, presenting
    /// `local_display_name` as this node's advertised name.
    RequestConnection {
        local_display_name: String,
        endpoint: EndpointId,
    },
    AcceptConnection {
        endpoint: EndpointId,
    },
    RejectConnection {
        endpoint: EndpointId,
    },
    Disconnect {
        endpoint: EndpointId,
    },
    /// Point-to-point (one endpoint) or fan-out (many) delivery of raw bytes.
    SendPayload {
        endpoints: Vec<EndpointId>,
        bytes: Vec<u8>,
    },
}

/// A lifecycle or payload event delivered by the transport driver.
///
/// Events may originate on any driver thread but are funneled through one
/// mpsc so the mesh processes them as a strictly ordered stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Discovery spotted a peer advertising under `advertised_name`.
    EndpointFound {
        endpoint: EndpointId,
        advertised_name: String,
    },
    /// A previously found peer is no longer visible.
    EndpointLost { endpoint: EndpointId },
    /// A connection handshake started; `peer_display_name` is the name the
    /// peer claims.
    ConnectionInitiated {
        endpoint: EndpointId,
        peer_display_name: String,
    },
    /// The handshake resolved.
    ConnectionResult { endpoint: EndpointId, success: bool },
    /// A live connection dropped.
    Disconnected { endpoint: EndpointId },
    /// Raw bytes arrived from a connected peer.
    PayloadReceived { endpoint: EndpointId, bytes: Vec<u8> },
}
