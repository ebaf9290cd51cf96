//! The fixed role universe and message addressing.
//!
//! Wire form is the plain alias string: `"Commander"`, `"Agent1"`..`"AgentN"`,
//! plus the broadcast sentinel `"everyone"` for recipients.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::ProtocolError;

/// Display name the group leader advertises under.
pub const COMMANDER_NAME: &str = "Commander";

/// Recipient sentinel addressing every connected peer.
pub const EVERYONE: &str = "everyone";

/// A logical participant role in the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoleAlias {
    /// The group leader.
    Commander,
    /// A numbered subordinate, 1-based.
    Agent(u8),
}

impl RoleAlias {
    /// Iterate the full role universe for a given subordinate bound.
    pub fn universe(max_agents: u8) -> impl Iterator<Item = RoleAlias> {
        std::iter::once(RoleAlias::Commander).chain((1..=max_agents).map(RoleAlias::Agent))
    }

    pub fn is_commander(&self) -> bool {
        matches!(self, RoleAlias::Commander)
    }
}

impl fmt::Display for RoleAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleAlias::Commander => f.write_str(COMMANDER_NAME),
            RoleAlias::Agent(n) => write!(f, "Agent{n}"),
        }
    }
}

impl FromStr for RoleAlias {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == COMMANDER_NAME {
            return Ok(RoleAlias::Commander);
        }
        if let Some(rest) = s.strip_prefix("Agent") {
            if let Ok(n) = rest.parse::<u8>() {
                if n >= 1 {
                    return Ok(RoleAlias::Agent(n));
                }
            }
        }
        Err(ProtocolError::UnknownAlias(s.to_string()))
    }
}

impl Serialize for RoleAlias {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RoleAlias {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Who a signed payload is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// A single role.
    Role(RoleAlias),
    /// Every connected peer.
    Everyone,
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipient::Role(alias) => alias.fmt(f),
            Recipient::Everyone => f.write_str(EVERYONE),
        }
    }
}

impl FromStr for Recipient {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == EVERYONE {
            return Ok(Recipient::Everyone);
        }
        s.parse().map(Recipient::Role)
    }
}

impl Serialize for Recipient {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Recipient {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
