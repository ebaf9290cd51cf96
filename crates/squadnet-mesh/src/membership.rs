//! The membership table: endpoint -> claimed display name.
//!
//! Single source of truth for "who am I connected to and as what name".
//! Pure in-memory state, no I/O. Single-writer discipline: only the
//! connection coordinator mutates it (enforced structurally — the table
//! lives inside the coordinator on the service lane); the router and the
//! role machine only read snapshots.

use std::collections::HashMap;

use squadnet_transport::EndpointId;

/// Mapping of live endpoints to the display name each peer claimed during
/// the connection handshake. Never holds an endpoint without a bound name.
#[derive(Debug, Default)]
pub struct MembershipTable {
    bindings: HashMap<EndpointId, String>,
}

impl MembershipTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an endpoint to the name its peer claimed.
    pub fn bind(&mut self, endpoint: EndpointId, name: impl Into<String>) {
        self.bindings.insert(endpoint, name.into());
    }

    /// Remove an endpoint, returning the name it was bound to.
    pub fn unbind(&mut self, endpoint: &EndpointId) -> Option<String> {
        self.bindings.remove(endpoint)
    }

    /// The name the peer on `endpoint` claimed, if still connected.
    pub fn alias_of(&self, endpoint: &EndpointId) -> Option<&str> {
        self.bindings.get(endpoint).map(String::as_str)
    }

    /// Whether any connected peer already claims `name`.
    pub fn contains_name(&self, name: &str) -> bool {
        self.bindings.values().any(|n| n == name)
    }

    /// Snapshot of every bound endpoint.
    pub fn endpoints(&self) -> Vec<EndpointId> {
        self.bindings.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }
}
