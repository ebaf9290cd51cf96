//! Connection lifecycle against the external transport.
//!
//! Translates transport lifecycle events into membership mutations and
//! upward notifications, and manages idempotent start/stop of advertising
//! and discovery. The coordinator is the only writer of the membership
//! table and the advertising/discovery flags; it runs exclusively on the
//! service lane.

use tokio::sync::mpsc;

use squadnet_transport::{EndpointId, TransportHandle};

use crate::{MembershipTable, MeshError, MeshEvent};

/// Display name presented on outgoing connection requests before the
/// application has chosen one.
const DEFAULT_DISPLAY_NAME: &str = "Subordinate";

/// Drives advertising, discovery and per-endpoint lifecycle, keeping the
/// membership table in sync with what the transport reports.
pub struct ConnectionCoordinator {
    transport: TransportHandle,
    membership: MembershipTable,
    events: mpsc::Sender<MeshEvent>,
    service_id: String,
    advertising: bool,
    discovering: bool,
    /// Name this node presents when it initiates connections.
    discovery_name: Option<String>,
    /// Gate for the duplicate-display-name rejection. Off by default.
    reject_duplicate_names: bool,
}

impl ConnectionCoordinator {
    pub fn new(
        transport: TransportHandle,
        events: mpsc::Sender<MeshEvent>,
        service_id: String,
        reject_duplicate_names: bool,
    ) -> Self {
        Self {
            transport,
            membership: MembershipTable::new(),
            events,
            service_id,
            advertising: false,
            discovering: false,
            discovery_name: None,
            reject_duplicate_names,
        }
    }

    pub fn is_advertising(&self) -> bool {
        self.advertising
    }

    pub fn is_discovering(&self) -> bool {
        self.discovering
    }

    pub fn membership(&self) -> &MembershipTable {
        &self.membership
    }

    /// Begin advertising under `display_name`. No-op if already advertising.
    ///
    /// The flag flips only after the transport acks success; on failure it
    /// stays false and the error goes to the caller — no automatic retry,
    /// and no stale "already running" state blocking the next attempt.
    pub async fn start_advertising(&mut self, display_name: &str) -> Result<(), MeshError> {
        if self.advertising {
            tracing::debug!("already advertising");
            return Ok(());
        }
        self.transport
            .start_advertising(display_name, &self.service_id)
            .await?;
        self.advertising = true;
        tracing::info!(name = %display_name, "started advertising");
        Ok(())
    }

    /// Stop advertising. No-op if not advertising; otherwise the flag clears
    /// unconditionally, whether or not the transport ever acks the stop.
    pub async fn stop_advertising(&mut self) -> Result<(), MeshError> {
        if !self.advertising {
            tracing::debug!("not advertising");
            return Ok(());
        }
        self.advertising = false;
        self.transport.stop_advertising().await?;
        tracing::info!("stopped advertising");
        Ok(())
    }

    /// Begin discovery, recording `display_name` as the name presented on
    /// outgoing connection requests. No-op (beyond recording the name) if
    /// already discovering.
    pub async fn start_discovery(&mut self, display_name: &str) -> Result<(), MeshError> {
        self.discovery_name = Some(display_name.to_string());
        if self.discovering {
            tracing::debug!("already discovering");
            return Ok(());
        }
        self.transport.start_discovery(&self.service_id).await?;
        self.discovering = true;
        tracing::info!(name = %display_name, "started discovery");
        Ok(())
    }

    /// Stop discovery. Same unconditional-flag semantics as advertising.
    pub async fn stop_discovery(&mut self) -> Result<(), MeshError> {
        if !self.discovering {
            tracing::debug!("not discovering");
            return Ok(());
        }
        self.discovering = false;
        self.transport.stop_discovery().await?;
        tracing::info!("stopped discovery");
        Ok(())
    }

    /// Request a connection to a discovered endpoint, presenting the
    /// recorded discovery name.
    pub async fn request_connection(&self, endpoint: &EndpointId) -> Result<(), MeshError> {
        let name = self
            .discovery_name
            .clone()
            .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());
        self.transport
            .request_connection(&name, endpoint.clone())
            .await?;
        Ok(())
    }

    /// A peer opened a handshake claiming `peer_name`: auto-accept and bind
    /// provisionally, unless duplicate-name rejection is on and the name is
    /// already taken by a live endpoint.
    pub async fn on_connection_initiated(
        &mut self,
        endpoint: EndpointId,
        peer_name: String,
    ) -> Result<(), MeshError> {
        if self.reject_duplicate_names && self.membership.contains_name(&peer_name) {
            tracing::warn!(%endpoint, name = %peer_name, "duplicate display name, rejecting");
            self.transport.reject_connection(endpoint.clone()).await?;
            self.notify(MeshEvent::ImpersonationDetected(endpoint)).await;
            return Ok(());
        }
        self.transport.accept_connection(endpoint.clone()).await?;
        self.membership.bind(endpoint, peer_name);
        Ok(())
    }

    /// The handshake resolved. Success is notified upward; failure drops the
    /// provisional binding.
    pub async fn on_connection_result(&mut self, endpoint: EndpointId, success: bool) {
        if success {
            tracing::debug!(%endpoint, "connection established");
            self.notify(MeshEvent::EndpointConnected(endpoint)).await;
        } else {
            tracing::debug!(%endpoint, "connection failed");
            self.membership.unbind(&endpoint);
        }
    }

    /// A live connection dropped. Returns the display name the endpoint was
    /// bound to, so the service can decide whether the leader just vanished.
    pub async fn on_disconnected(&mut self, endpoint: EndpointId) -> Option<String> {
        let name = self.membership.unbind(&endpoint);
        tracing::debug!(%endpoint, name = ?name, "disconnected");
        self.notify(MeshEvent::EndpointDisconnected(endpoint)).await;
        name
    }

    /// Reset to a clean slate: disconnect every bound endpoint, clear the
    /// table, stop advertising and discovery. The merge primitive.
    ///
    /// Unconditionally effective: the table and both flags end up clear
    /// even if the transport never acks (or is already gone).
    pub async fn stop_all_endpoints(&mut self) {
        for endpoint in self.membership.endpoints() {
            if let Err(e) = self.transport.disconnect(endpoint.clone()).await {
                tracing::warn!(%endpoint, error = %e, "disconnect request failed");
            }
        }
        self.membership.clear();
        if let Err(e) = self.stop_advertising().await {
            tracing::warn!(error = %e, "stop advertising during teardown failed");
        }
        if let Err(e) = self.stop_discovery().await {
            tracing::warn!(error = %e, "stop discovery during teardown failed");
        }
    }

    async fn notify(&self, event: MeshEvent) {
        if self.events.send(event).await.is_err() {
            tracing::debug!("application event receiver dropped");
        }
    }
}
