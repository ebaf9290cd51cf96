//! Squadnet protocol — role identities and signed message payloads.
//!
//! Defines the fixed role universe ("Commander", "Agent1".."AgentN"), the
//! `SignedPayload` wire format, and the `RoleKeyring` that holds one Ed25519
//! keypair per role. Roles are shared secrets: every installation derives the
//! private key for every role from one mesh seed, so a valid signature proves
//! possession of a role key, not device identity.

pub mod error;
pub mod keyring;
pub mod payload;
pub mod role;

pub use error::ProtocolError;
pub use keyring::{generate_seed, seed_from_mnemonic, seed_to_mnemonic, RoleKeyring};
pub use payload::SignedPayload;
pub use role::{Recipient, RoleAlias};
