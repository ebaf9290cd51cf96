use thiserror::Error;

/// Errors produced by the protocol layer.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Sign or parse requested for a role with no registered keypair.
    #[error("no keypair registered for alias '{0}'")]
    UnknownAlias(String),

    /// Inbound bytes did not decode to a `SignedPayload`.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Key material could not be generated, loaded or written.
    #[error("crypto error: {0}")]
    Crypto(String),
}
