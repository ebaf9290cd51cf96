use squadnet_protocol::ProtocolError;
use squadnet_transport::TransportError;
use thiserror::Error;

/// Errors surfaced by the mesh layer. None are crash-worthy: failures are
/// either absorbed locally (dropped payloads, no-op starts) or handed back
/// to the caller as one of these.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("mesh service channel closed")]
    ChannelClosed,
}
