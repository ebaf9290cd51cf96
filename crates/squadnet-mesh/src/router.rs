//! Signing, verification and delivery of application messages.
//!
//! The router is invoked from the service lane, which snapshots membership
//! state (send targets, the bound name of a receiving endpoint) before
//! handing off. The CPU-bound sign/verify work runs under `spawn_blocking`
//! so a burst of inbound messages cannot stall lifecycle handling; results
//! go straight to the transport or the application channel without
//! re-entering the membership table.

use std::sync::Arc;

use tokio::sync::mpsc;

use squadnet_protocol::{ProtocolError, Recipient, RoleAlias, RoleKeyring, SignedPayload};
use squadnet_transport::{EndpointId, TransportHandle};

use crate::MeshEvent;

/// Builds, signs and verifies [`SignedPayload`]s.
pub struct MessageRouter {
    keyring: Arc<RoleKeyring>,
    transport: TransportHandle,
    events: mpsc::Sender<MeshEvent>,
}

impl MessageRouter {
    pub fn new(
        keyring: Arc<RoleKeyring>,
        transport: TransportHandle,
        events: mpsc::Sender<MeshEvent>,
    ) -> Self {
        Self {
            keyring,
            transport,
            events,
        }
    }

    /// Sign `message` as `alias` and hand it to the transport for every
    /// endpoint in `targets`. Fire-and-forget: delivery failure is logged,
    /// never retried here.
    pub fn dispatch(
        &self,
        targets: Vec<EndpointId>,
        message: String,
        alias: RoleAlias,
        recipient: Recipient,
    ) {
        if targets.is_empty() {
            tracing::debug!("no connected endpoints, dropping outbound message");
            return;
        }
        let keyring = Arc::clone(&self.keyring);
        let transport = self.transport.clone();
        tokio::spawn(async move {
            let signed = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, ProtocolError> {
                let signature = keyring.sign(alias, message.as_bytes())?;
                SignedPayload {
                    message,
                    signature: signature.to_bytes().to_vec(),
                    alias,
                    recipient,
                }
                .encode()
            })
            .await;
            match signed {
                Ok(Ok(bytes)) => {
                    if let Err(e) = transport.send_payload(targets, bytes).await {
                        tracing::warn!(error = %e, "payload send failed");
                    }
                }
                Ok(Err(e)) => tracing::warn!(error = %e, "signing failed"),
                Err(e) => tracing::error!(error = %e, "signing task failed"),
            }
        });
    }

    /// Verify inbound bytes from `endpoint` and deliver the message upward.
    ///
    /// `bound_name` is the membership snapshot for the endpoint, taken on
    /// the lane. Malformed bytes are dropped with a log line and nothing is
    /// delivered; everything that decodes is delivered with
    /// `authentic = signature_valid && identity_valid` — a flag, not a
    /// filter.
    pub fn on_receive(&self, endpoint: EndpointId, bytes: Vec<u8>, bound_name: Option<String>) {
        let keyring = Arc::clone(&self.keyring);
        let events = self.events.clone();
        tokio::spawn(async move {
            let verified =
                tokio::task::spawn_blocking(move || -> Result<(SignedPayload, bool), ProtocolError> {
                    let payload = SignedPayload::decode(&bytes)?;
                    let signature_valid =
                        keyring.verify(payload.alias, payload.message.as_bytes(), &payload.signature);
                    Ok((payload, signature_valid))
                })
                .await;
            match verified {
                Ok(Ok((payload, signature_valid))) => {
                    let identity_valid =
                        bound_name.as_deref() == Some(payload.alias.to_string().as_str());
                    let event = MeshEvent::MessageReceived {
                        endpoint,
                        message: payload.message,
                        authentic: signature_valid && identity_valid,
                        recipient: payload.recipient,
                    };
                    if events.send(event).await.is_err() {
                        tracing::debug!("application event receiver dropped");
                    }
                }
                Ok(Err(e)) => {
                    tracing::debug!(%endpoint, error = %e, "dropping malformed payload");
                }
                Err(e) => tracing::error!(error = %e, "verify task failed"),
            }
        });
    }
}
