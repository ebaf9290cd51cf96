//! Squadnet mesh — ad-hoc group coordination over an unreliable local link.
//!
//! Forms a star-topology group of peers, assigns each peer a role
//! ("Commander" or a bounded set of "Agent" subordinates), elects a
//! replacement leader when the current one disappears, reconciles the group
//! when the original leader reappears, and authenticates every application
//! message against the claimed sender role.
//!
//! Data flow:
//! - transport events -> [`ConnectionCoordinator`] -> [`MembershipTable`]
//!   mutation + [`RoleStateMachine`] transition;
//! - outbound messages -> [`MessageRouter`] -> keyring sign -> transport;
//! - inbound bytes -> [`MessageRouter`] -> keyring verify + membership
//!   identity check -> [`MeshEvent::MessageReceived`] with an authenticity
//!   flag (never filtered).
//!
//! All coordination state lives on one event lane, the [`MeshService`]
//! loop; signing and verification run off-lane.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod membership;
pub mod role_machine;
pub mod router;
pub mod service;

pub use config::{KeyConfig, MeshConfig};
pub use coordinator::ConnectionCoordinator;
pub use error::MeshError;
pub use events::MeshEvent;
pub use membership::MembershipTable;
pub use role_machine::{RoleAction, RoleState, RoleStateMachine};
pub use router::MessageRouter;
pub use service::{MeshHandle, MeshService, MeshStatus};
