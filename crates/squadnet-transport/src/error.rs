use thiserror::Error;

/// Failures reported by the transport. Never auto-retried at this layer;
/// retry policy belongs to the caller.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Advertising or discovery could not be started.
    #[error("transport start failed: {0}")]
    StartFailed(String),

    /// A payload could not be handed to the link.
    #[error("payload send failed: {0}")]
    SendFailed(String),

    /// The transport driver has gone away.
    #[error("transport channel closed")]
    ChannelClosed,
}
