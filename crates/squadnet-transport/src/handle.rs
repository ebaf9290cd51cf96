//! Cloneable handle for issuing transport commands.

use tokio::sync::{mpsc, oneshot};

use crate::{EndpointId, TransportCommand, TransportError};

/// Command channel buffer between the mesh and the transport driver.
pub const COMMAND_BUFFER: usize = 64;

/// Sends commands to the transport driver.
///
/// Cheap to clone; every method is async but none blocks on peer
/// acknowledgement — only start requests wait for the driver's local ack.
#[derive(Clone)]
pub struct TransportHandle {
    tx: mpsc::Sender<TransportCommand>,
}

impl TransportHandle {
    pub fn new(tx: mpsc::Sender<TransportCommand>) -> Self {
        Self { tx }
    }

    /// Create a handle plus the receiving end a driver consumes.
    pub fn channel() -> (Self, mpsc::Receiver<TransportCommand>) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        (Self::new(tx), rx)
    }

    async fn send(&self, command: TransportCommand) -> Result<(), TransportError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }

    /// Ask the driver to advertise under `display_name`; resolves once the
    /// driver acks success or failure.
    pub async fn start_advertising(
        &self,
        display_name: &str,
        service_id: &str,
    ) -> Result<(), TransportError> {
        let (reply, ack) = oneshot::channel();
        self.send(TransportCommand::StartAdvertising {
            display_name: display_name.to_string(),
            service_id: service_id.to_string(),
            reply,
        })
        .await?;
        ack.await.map_err(|_| TransportError::ChannelClosed)?
    }

    pub async fn stop_advertising(&self) -> Result<(), TransportError> {
        self.send(TransportCommand::StopAdvertising).await
    }

    /// Ask the driver to start discovery; resolves on the driver's ack.
    pub async fn start_discovery(&self, service_id: &str) -> Result<(), TransportError> {
        let (reply, ack) = oneshot::channel();
        self.send(TransportCommand::StartDiscovery {
            service_id: service_id.to_string(),
            reply,
        })
        .await?;
        ack.await.map_err(|_| TransportError::ChannelClosed)?
    }

    pub async fn stop_discovery(&self) -> Result<(), TransportError> {
        self.send(TransportCommand::StopDiscovery).await
    }

    pub async fn request_connection(
        &self,
        local_display_name: &str,
        endpoint: EndpointId,
    ) -> Result<(), TransportError> {
        self.send(TransportCommand::RequestConnection {
            local_display_name: local_display_name.to_string(),
            endpoint,
        })
        .await
    }

    pub async fn accept_connection(&self, endpoint: EndpointId) -> Result<(), TransportError> {
        self.send(TransportCommand::AcceptConnection { endpoint }).await
    }

    pub async fn reject_connection(&self, endpoint: EndpointId) -> Result<(), TransportError> {
        self.send(TransportCommand::RejectConnection { endpoint }).await
    }

    pub async fn disconnect(&self, endpoint: EndpointId) -> Result<(), TransportError> {
        self.send(TransportCommand::Disconnect { endpoint }).await
    }

    /// Hand bytes to the link for one or many endpoints. Fire-and-forget:
    /// delivery failure is the driver's to report, not awaited here.
    pub async fn send_payload(
        &self,
        endpoints: Vec<EndpointId>,
        bytes: Vec<u8>,
    ) -> Result<(), TransportError> {
        self.send(TransportCommand::SendPayload { endpoints, bytes }).await
    }
}
