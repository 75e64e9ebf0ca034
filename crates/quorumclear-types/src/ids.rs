//! Identifiers used throughout QuorumClear.
//!
//! Owners use UUIDv7 for time-ordered sorting. Quorum members are
//! identified by their raw ed25519 public key.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// BatchId
// ---------------------------------------------------------------------------

/// Monotonically increasing batch identifier, starting at 0.
///
/// Identifiers are never reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct BatchId(pub u64);

impl BatchId {
    /// The batch open at system initialization.
    pub const GENESIS: Self = Self(0);

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// OwnerId
// ---------------------------------------------------------------------------

/// Identity of the party that submitted an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OwnerId(pub Uuid);

impl OwnerId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// MemberId
// ---------------------------------------------------------------------------

/// A computing-quorum member. This is the raw ed25519 public key (32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct MemberId(pub [u8; 32]);

impl MemberId {
    #[must_use]
    pub fn from_pubkey(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "member:{}", hex::encode(&self.0[..8]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_id_next() {
        assert_eq!(BatchId::GENESIS.next(), BatchId(1));
        assert_eq!(BatchId(41).next(), BatchId(42));
    }

    #[test]
    fn owner_id_uniqueness_and_order() {
        let a = OwnerId::new();
        let b = OwnerId::new();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn member_id_display() {
        let id = MemberId([0xAB; 32]);
        assert_eq!(format!("{id}"), "member:abababababababab");
        assert_eq!(id.short(), "abababab");
    }

    #[test]
    fn owner_id_serde() {
        let id = OwnerId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: OwnerId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
