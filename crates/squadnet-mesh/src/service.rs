//! The mesh service: one event lane tying the coordinator, the role state
//! machine and the message router together.
//!
//! Transport callbacks may arrive on any driver thread, but they reach the
//! service as a single ordered stream, and the `run()` loop processes one
//! event or command at a time. That serialization is what makes the
//! election tie-break an atomic snapshot of the membership table.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use squadnet_protocol::role::COMMANDER_NAME;
use squadnet_protocol::{Recipient, RoleAlias, RoleKeyring};
use squadnet_transport::{EndpointId, TransportEvent, TransportHandle};

use crate::{
    ConnectionCoordinator, MeshConfig, MeshError, MeshEvent, MessageRouter, RoleAction, RoleState,
    RoleStateMachine,
};

const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 256;

/// Point-in-time view of the mesh, for operators and tests.
#[derive(Debug, Clone)]
pub struct MeshStatus {
    pub role: RoleState,
    pub advertising: bool,
    pub discovering: bool,
    pub endpoints: Vec<EndpointId>,
    pub local_identity: String,
}

enum MeshCommand {
    StartAdvertising {
        display_name: String,
        reply: oneshot::Sender<Result<(), MeshError>>,
    },
    StartDiscovery {
        display_name: String,
        reply: oneshot::Sender<Result<(), MeshError>>,
    },
    StopAdvertising {
        reply: oneshot::Sender<Result<(), MeshError>>,
    },
    StopDiscovery {
        reply: oneshot::Sender<Result<(), MeshError>>,
    },
    StopAllEndpoints {
        reply: oneshot::Sender<Result<(), MeshError>>,
    },
    Send {
        endpoint: EndpointId,
        message: String,
        alias: RoleAlias,
        recipient: Recipient,
    },
    Broadcast {
        message: String,
        alias: RoleAlias,
    },
    Status {
        reply: oneshot::Sender<MeshStatus>,
    },
}

/// Cloneable handle for driving the mesh service.
#[derive(Clone)]
pub struct MeshHandle {
    tx: mpsc::Sender<MeshCommand>,
}

impl MeshHandle {
    async fn send_command(&self, command: MeshCommand) -> Result<(), MeshError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| MeshError::ChannelClosed)
    }

    /// Start advertising under `display_name` (the operator's explicit
    /// "start as Commander" entry point when the name is "Commander").
    pub async fn start_advertising(&self, display_name: &str) -> Result<(), MeshError> {
        let (reply, rx) = oneshot::channel();
        self.send_command(MeshCommand::StartAdvertising {
            display_name: display_name.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| MeshError::ChannelClosed)?
    }

    /// Start discovery, presenting `display_name` on outgoing connection
    /// requests (the operator's "start as AgentN" entry point).
    pub async fn start_discovery(&self, display_name: &str) -> Result<(), MeshError> {
        let (reply, rx) = oneshot::channel();
        self.send_command(MeshCommand::StartDiscovery {
            display_name: display_name.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| MeshError::ChannelClosed)?
    }

    pub async fn stop_advertising(&self) -> Result<(), MeshError> {
        let (reply, rx) = oneshot::channel();
        self.send_command(MeshCommand::StopAdvertising { reply }).await?;
        rx.await.map_err(|_| MeshError::ChannelClosed)?
    }

    pub async fn stop_discovery(&self) -> Result<(), MeshError> {
        let (reply, rx) = oneshot::channel();
        self.send_command(MeshCommand::StopDiscovery { reply }).await?;
        rx.await.map_err(|_| MeshError::ChannelClosed)?
    }

    /// Disconnect everything and return to the idle baseline.
    pub async fn stop_all_endpoints(&self) -> Result<(), MeshError> {
        let (reply, rx) = oneshot::channel();
        self.send_command(MeshCommand::StopAllEndpoints { reply }).await?;
        rx.await.map_err(|_| MeshError::ChannelClosed)?
    }

    /// Sign `message` as `alias` and send it point-to-point. Fire and
    /// forget: the result only reflects hand-off to the service.
    pub async fn send(
        &self,
        endpoint: EndpointId,
        message: &str,
        alias: RoleAlias,
        recipient: Recipient,
    ) -> Result<(), MeshError> {
        self.send_command(MeshCommand::Send {
            endpoint,
            message: message.to_string(),
            alias,
            recipient,
        })
        .await
    }

    /// Sign `message` as `alias` and send it to every connected endpoint.
    pub async fn broadcast(&self, message: &str, alias: RoleAlias) -> Result<(), MeshError> {
        self.send_command(MeshCommand::Broadcast {
            message: message.to_string(),
            alias,
        })
        .await
    }

    pub async fn status(&self) -> Result<MeshStatus, MeshError> {
        let (reply, rx) = oneshot::channel();
        self.send_command(MeshCommand::Status { reply }).await?;
        rx.await.map_err(|_| MeshError::ChannelClosed)
    }
}

/// The event-processing lane. Construct with [`MeshService::new`], then
/// `tokio::spawn(service.run())`.
pub struct MeshService {
    core: MeshCore,
    transport_rx: mpsc::Receiver<TransportEvent>,
    command_rx: mpsc::Receiver<MeshCommand>,
}

/// The serialized coordination state: everything the lane mutates.
struct MeshCore {
    coordinator: ConnectionCoordinator,
    role: RoleStateMachine,
    router: MessageRouter,
}

impl MeshService {
    /// Wire up the service. Returns the service itself, the handle the
    /// application drives it with, and the channel mesh events arrive on.
    pub fn new(
        config: &MeshConfig,
        keyring: Arc<RoleKeyring>,
        transport: TransportHandle,
        transport_rx: mpsc::Receiver<TransportEvent>,
    ) -> Result<(Self, MeshHandle, mpsc::Receiver<MeshEvent>), MeshError> {
        let local_identity = config.resolve_local_identity()?;
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);

        let coordinator = ConnectionCoordinator::new(
            transport.clone(),
            event_tx.clone(),
            config.service_id.clone(),
            config.reject_duplicate_names,
        );
        let router = MessageRouter::new(keyring, transport, event_tx);
        let role = RoleStateMachine::new(local_identity);

        Ok((
            Self {
                core: MeshCore {
                    coordinator,
                    role,
                    router,
                },
                transport_rx,
                command_rx,
            },
            MeshHandle { tx: command_tx },
            event_rx,
        ))
    }

    /// Run until both the transport and every handle are gone.
    pub async fn run(self) {
        let MeshService {
            mut core,
            mut transport_rx,
            mut command_rx,
        } = self;
        loop {
            tokio::select! {
                Some(event) = transport_rx.recv() => {
                    core.handle_transport_event(event).await;
                }
                Some(command) = command_rx.recv() => {
                    core.handle_command(command).await;
                }
                else => break,
            }
        }
        tracing::debug!("mesh service stopped");
    }
}

impl MeshCore {
    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::EndpointFound {
                endpoint,
                advertised_name,
            } => {
                tracing::debug!(%endpoint, name = %advertised_name, "endpoint found");
                if advertised_name == COMMANDER_NAME {
                    // The (original) leader is in sight: reconcile before
                    // connecting, so we join its group with a clean slate.
                    let actions = self
                        .role
                        .on_commander_rediscovered(self.coordinator.is_advertising());
                    self.apply_actions(actions).await;
                }
                if let Err(e) = self.coordinator.request_connection(&endpoint).await {
                    tracing::warn!(%endpoint, error = %e, "connection request failed");
                }
            }
            TransportEvent::EndpointLost { endpoint } => {
                tracing::debug!(%endpoint, "endpoint lost");
            }
            TransportEvent::ConnectionInitiated {
                endpoint,
                peer_display_name,
            } => {
                if let Err(e) = self
                    .coordinator
                    .on_connection_initiated(endpoint, peer_display_name)
                    .await
                {
                    tracing::warn!(error = %e, "connection accept failed");
                }
            }
            TransportEvent::ConnectionResult { endpoint, success } => {
                self.coordinator.on_connection_result(endpoint, success).await;
                if success && !self.coordinator.is_advertising() {
                    self.role.note_connected_as_subordinate();
                }
            }
            TransportEvent::Disconnected { endpoint } => {
                let name = self.coordinator.on_disconnected(endpoint).await;
                if name.as_deref() == Some(COMMANDER_NAME) {
                    let survivors = self.coordinator.membership().endpoints();
                    let actions = self.role.on_commander_lost(&survivors);
                    self.apply_actions(actions).await;
                }
            }
            TransportEvent::PayloadReceived { endpoint, bytes } => {
                let bound_name = self
                    .coordinator
                    .membership()
                    .alias_of(&endpoint)
                    .map(str::to_string);
                self.router.on_receive(endpoint, bytes, bound_name);
            }
        }
    }

    async fn handle_command(&mut self, command: MeshCommand) {
        match command {
            MeshCommand::StartAdvertising { display_name, reply } => {
                let result = self.coordinator.start_advertising(&display_name).await;
                if result.is_ok() {
                    self.role.note_advertising(&display_name);
                }
                let _ = reply.send(result);
            }
            MeshCommand::StartDiscovery { display_name, reply } => {
                let result = self.coordinator.start_discovery(&display_name).await;
                if result.is_ok() {
                    self.role.note_discovering();
                }
                let _ = reply.send(result);
            }
            MeshCommand::StopAdvertising { reply } => {
                let _ = reply.send(self.coordinator.stop_advertising().await);
            }
            MeshCommand::StopDiscovery { reply } => {
                let _ = reply.send(self.coordinator.stop_discovery().await);
            }
            MeshCommand::StopAllEndpoints { reply } => {
                self.coordinator.stop_all_endpoints().await;
                self.role.note_idle();
                let _ = reply.send(Ok(()));
            }
            MeshCommand::Send {
                endpoint,
                message,
                alias,
                recipient,
            } => {
                self.router.dispatch(vec![endpoint], message, alias, recipient);
            }
            MeshCommand::Broadcast { message, alias } => {
                let targets = self.coordinator.membership().endpoints();
                self.router
                    .dispatch(targets, message, alias, Recipient::Everyone);
            }
            MeshCommand::Status { reply } => {
                let _ = reply.send(MeshStatus {
                    role: self.role.state(),
                    advertising: self.coordinator.is_advertising(),
                    discovering: self.coordinator.is_discovering(),
                    endpoints: self.coordinator.membership().endpoints(),
                    local_identity: self.role.local_identity().to_string(),
                });
            }
        }
    }

    /// Execute a role transition plan. Failures are logged and surfaced to
    /// nobody: transitions fire from transport callbacks, and the flags
    /// stay truthful for a later retry either way.
    async fn apply_actions(&mut self, actions: Vec<RoleAction>) {
        for action in actions {
            let result = match action {
                RoleAction::StartAdvertising(name) => {
                    self.coordinator.start_advertising(&name).await
                }
                RoleAction::StartDiscovery(name) => self.coordinator.start_discovery(&name).await,
                RoleAction::StopAdvertising => self.coordinator.stop_advertising().await,
                RoleAction::StopAllEndpoints => {
                    self.coordinator.stop_all_endpoints().await;
                    Ok(())
                }
            };
            if let Err(e) = result {
                tracing::warn!(error = %e, "role transition action failed");
            }
        }
    }
}
