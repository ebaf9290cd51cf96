//! The signed application message wire format.

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, Recipient, RoleAlias};

/// A signed application message as it travels over the transport.
///
/// Built by the sender's router, immutable once built, alive for the
/// duration of one transmission. The signature covers the UTF-8 bytes of
/// `message` and is produced by the keypair of the claimed `alias`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPayload {
    pub message: String,
    pub signature: Vec<u8>,
    pub alias: RoleAlias,
    pub recipient: Recipient,
}

impl SignedPayload {
    /// Serialize to the self-describing JSON wire encoding.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(self).map_err(|e| ProtocolError::MalformedPayload(e.to_string()))
    }

    /// Deserialize from wire bytes. Anything that does not decode losslessly
    /// to the four fields is malformed and must be dropped by the caller.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::MalformedPayload(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_roundtrip() {
        let payload = SignedPayload {
            message: "move to checkpoint".to_string(),
            signature: vec![1, 2, 3, 4],
            alias: RoleAlias::Agent(2),
            recipient: Recipient::Everyone,
        };
        let bytes = payload.encode().unwrap();
        let decoded = SignedPayload::decode(&bytes).unwrap();
        assert_eq!(payload, decoded);
    }

    #[test]
    fn test_payload_wire_form() {
        let payload = SignedPayload {
            message: "hi".to_string(),
            signature: vec![0xff],
            alias: RoleAlias::Commander,
            recipient: Recipient::Role(RoleAlias::Agent(1)),
        };
        let json: serde_json::Value =
            serde_json::from_slice(&payload.encode().unwrap()).unwrap();
        assert_eq!(json["alias"], "Commander");
        assert_eq!(json["recipient"], "Agent1");
        assert_eq!(json["signature"], serde_json::json!([255]));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(SignedPayload::decode(b"not json").is_err());
        assert!(SignedPayload::decode(b"{\"message\":\"x\"}").is_err());
        assert!(SignedPayload::decode(
            b"{\"message\":\"x\",\"signature\":[],\"alias\":\"Nobody\",\"recipient\":\"everyone\"}"
        )
        .is_err());
    }
}
