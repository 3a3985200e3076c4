use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Protocol identifier under which redemption keys are derived by default.
pub const DEFAULT_PROTOCOL_ID: &str = "hodlock";

/// Identifies the custodian key a lock was created against.
///
/// Recorded at lock-creation time and carried on the registry entry; the
/// watchman never guesses a derivation path, it redeems with exactly this
/// binding or not at all.
#[derive(Debug, Clone, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct KeyRef {
    protocol_id: String,
    key_id: String,
}

impl KeyRef {
    pub fn new(protocol_id: impl Into<String>, key_id: impl Into<String>) -> Self {
        Self {
            protocol_id: protocol_id.into(),
            key_id: key_id.into(),
        }
    }

    /// A binding under the default protocol.
    pub fn for_key(key_id: impl Into<String>) -> Self {
        Self::new(DEFAULT_PROTOCOL_ID, key_id)
    }

    pub fn protocol_id(&self) -> &str {
        &self.protocol_id
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}
