//! Leader election and leader-merge logic as an explicit state machine.
//!
//! Transition functions are pure: given a trigger plus a snapshot of the
//! connected endpoint set, they update the named state and return the plan
//! of transport actions to execute, so elections and merges are testable
//! without a live link. The service lane executes plans atomically with
//! respect to the membership table.
//!
//! The election is bully-style over the *locally visible* connection set
//! only: sort surviving endpoint ids ascending and self-promote when the
//! minimum equals this node's stable local identity. Under partition two
//! subgroups can each elect a leader; that is a known limitation of the
//! star topology, not something this layer papers over.

use squadnet_protocol::role::COMMANDER_NAME;
use squadnet_transport::EndpointId;

/// Where this node currently stands in the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleState {
    /// Baseline after construction or a full teardown; no role chosen yet.
    Idle,
    /// Searching for a leader to join.
    Discovering,
    /// Advertising as the group leader (original or self-promoted).
    AdvertisingAsCommander,
    /// At least one live connection while not advertising as leader.
    ConnectedAsSubordinate,
}

/// One step of a transition plan, executed by the service lane against the
/// connection coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleAction {
    StartAdvertising(String),
    StartDiscovery(String),
    StopAdvertising,
    StopAllEndpoints,
}

/// Election and merge transitions layered on top of the coordinator events.
#[derive(Debug)]
pub struct RoleStateMachine {
    state: RoleState,
    /// Stable, orderable tie-break value; need not be globally unique.
    local_identity: String,
}

impl RoleStateMachine {
    pub fn new(local_identity: impl Into<String>) -> Self {
        Self {
            state: RoleState::Idle,
            local_identity: local_identity.into(),
        }
    }

    pub fn state(&self) -> RoleState {
        self.state
    }

    pub fn local_identity(&self) -> &str {
        &self.local_identity
    }

    /// The bound "Commander" endpoint disconnected. `surviving` is the
    /// membership snapshot taken after the leader was unbound.
    ///
    /// Lowest-ordered surviving peer wins: if the minimum endpoint id equals
    /// the local identity, self-promote and advertise as Commander;
    /// otherwise go looking for whoever becomes the new leader.
    pub fn on_commander_lost(&mut self, surviving: &[EndpointId]) -> Vec<RoleAction> {
        let mut ids: Vec<&EndpointId> = surviving.iter().collect();
        ids.sort();
        match ids.first() {
            Some(min) if min.as_str() == self.local_identity => {
                self.state = RoleState::AdvertisingAsCommander;
                vec![RoleAction::StartAdvertising(COMMANDER_NAME.to_string())]
            }
            _ => {
                self.state = RoleState::Discovering;
                vec![RoleAction::StartDiscovery(self.local_identity.clone())]
            }
        }
    }

    /// Discovery found a peer advertising as "Commander".
    ///
    /// A temporary leader demotes: stop advertising and rejoin via
    /// discovery. A subordinate does a full reset first, so no stale
    /// temporary-leader connection survives into the merged group.
    pub fn on_commander_rediscovered(&mut self, advertising: bool) -> Vec<RoleAction> {
        self.state = RoleState::Discovering;
        if advertising {
            vec![
                RoleAction::StopAdvertising,
                RoleAction::StartDiscovery(self.local_identity.clone()),
            ]
        } else {
            vec![
                RoleAction::StopAllEndpoints,
                RoleAction::StartDiscovery(self.local_identity.clone()),
            ]
        }
    }

    /// Operator explicitly started advertising under `display_name`.
    pub fn note_advertising(&mut self, display_name: &str) {
        if display_name == COMMANDER_NAME {
            self.state = RoleState::AdvertisingAsCommander;
        }
    }

    /// Operator explicitly started discovery.
    pub fn note_discovering(&mut self) {
        if self.state != RoleState::ConnectedAsSubordinate {
            self.state = RoleState::Discovering;
        }
    }

    /// A connection completed while this node is not advertising as leader.
    pub fn note_connected_as_subordinate(&mut self) {
        if self.state != RoleState::AdvertisingAsCommander {
            self.state = RoleState::ConnectedAsSubordinate;
        }
    }

    /// Full teardown returned the node to the idle baseline.
    pub fn note_idle(&mut self) {
        self.state = RoleState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<EndpointId> {
        names.iter().map(|n| EndpointId::from(*n)).collect()
    }

    #[test]
    fn test_commander_lost_lowest_id_promotes() {
        let mut machine = RoleStateMachine::new("a");
        let actions = machine.on_commander_lost(&ids(&["b", "a", "c"]));
        assert_eq!(
            actions,
            vec![RoleAction::StartAdvertising("Commander".to_string())]
        );
        assert_eq!(machine.state(), RoleState::AdvertisingAsCommander);
    }

    #[test]
    fn test_commander_lost_non_minimum_discovers() {
        let mut machine = RoleStateMachine::new("b");
        let actions = machine.on_commander_lost(&ids(&["b", "a", "c"]));
        assert_eq!(
            actions,
            vec![RoleAction::StartDiscovery("b".to_string())]
        );
        assert_eq!(machine.state(), RoleState::Discovering);
    }

    #[test]
    fn test_commander_lost_alone_discovers() {
        // No surviving peers: nothing to lead, go search.
        let mut machine = RoleStateMachine::new("a");
        let actions = machine.on_commander_lost(&[]);
        assert_eq!(actions, vec![RoleAction::StartDiscovery("a".to_string())]);
    }

    #[test]
    fn test_rediscovery_demotes_temporary_commander() {
        let mut machine = RoleStateMachine::new("a");
        machine.note_advertising(COMMANDER_NAME);
        let actions = machine.on_commander_rediscovered(true);
        assert_eq!(
            actions,
            vec![
                RoleAction::StopAdvertising,
                RoleAction::StartDiscovery("a".to_string()),
            ]
        );
        assert_eq!(machine.state(), RoleState::Discovering);
    }

    #[test]
    fn test_rediscovery_resets_subordinate() {
        let mut machine = RoleStateMachine::new("b");
        machine.note_connected_as_subordinate();
        let actions = machine.on_commander_rediscovered(false);
        assert_eq!(
            actions,
            vec![
                RoleAction::StopAllEndpoints,
                RoleAction::StartDiscovery("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_election_is_deterministic() {
        // Same snapshot, same outcome, independent of insertion order.
        for shuffled in [["c", "b", "a"], ["a", "c", "b"], ["b", "a", "c"]] {
            let mut machine = RoleStateMachine::new("a");
            let actions = machine.on_commander_lost(&ids(&shuffled));
            assert_eq!(
                actions,
                vec![RoleAction::StartAdvertising("Commander".to_string())]
            );
        }
    }
}
