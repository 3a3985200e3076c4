use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::ParseError;

/// 20-byte hash buffer, the RIPEMD160(SHA256(pubkey)) form an owner address
/// takes inside a locking script. Serde form is the hex string.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, BorshSerialize, BorshDeserialize)]
pub struct Hash160Buf(pub [u8; 20]);

impl Hash160Buf {
    pub const LEN: usize = 20;

    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Parses from an arbitrary byte slice, rejecting anything that is not
    /// exactly 20 bytes.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, ParseError> {
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| ParseError::BadHashLength(bytes.len()))?;
        Ok(Self(arr))
    }

    pub fn from_hex(s: &str) -> Result<Self, ParseError> {
        let bytes = hex::decode(s).map_err(|_| ParseError::BadHex)?;
        Self::try_from_slice(&bytes)
    }
}

impl From<[u8; 20]> for Hash160Buf {
    fn from(value: [u8; 20]) -> Self {
        Self(value)
    }
}

impl AsRef<[u8]> for Hash160Buf {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Hash160Buf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Hash160Buf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash160Buf({})", self)
    }
}

impl Serialize for Hash160Buf {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hash160Buf {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as Deserialize>::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length() {
        assert!(Hash160Buf::try_from_slice(&[0u8; 19]).is_err());
        assert!(Hash160Buf::try_from_slice(&[0u8; 21]).is_err());
        assert!(Hash160Buf::try_from_slice(&[7u8; 20]).is_ok());
    }

    #[test]
    fn hex_roundtrip() {
        let buf = Hash160Buf::new([0xab; 20]);
        let parsed = Hash160Buf::from_hex(&buf.to_string()).unwrap();
        assert_eq!(parsed, buf);
    }

    #[test]
    fn serde_form_is_hex() {
        let buf = Hash160Buf::new([0x0f; 20]);
        let json = serde_json::to_string(&buf).unwrap();
        assert_eq!(json, format!("\"{}\"", "0f".repeat(20)));
        let back: Hash160Buf = serde_json::from_str(&json).unwrap();
        assert_eq!(back, buf);
    }
}
