//! Batch result types produced by the computation quorum.
//!
//! A [`BatchResult`] is the deterministic output of the auction for one
//! batch. Quorum members sign a [`ResultMessage`] that binds the result hash
//! to the batch identifier and the hash of its frozen intent sequence.

use serde::{Deserialize, Serialize};

use crate::{BatchId, MemberId, OwnerId, Price, QuorumClearError, Result};

/// One line item of a batch result. Positive flow = the owner receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Settlement {
    pub owner: OwnerId,
    pub asset_a_flow: i128,
    pub asset_b_flow: i128,
}

/// Aggregate flow a set of settlements imposes on the venue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetFlow {
    pub asset_a: i128,
    pub asset_b: i128,
}

impl NetFlow {
    pub const ZERO: Self = Self {
        asset_a: 0,
        asset_b: 0,
    };

    /// Sum all settlement flows.
    ///
    /// # Errors
    /// `ArithmeticOverflow` if a running sum leaves `i128`.
    pub fn from_settlements(settlements: &[Settlement]) -> Result<Self> {
        settlements.iter().try_fold(Self::ZERO, |acc, s| {
            Ok(Self {
                asset_a: acc.asset_a.checked_add(s.asset_a_flow).ok_or(
                    QuorumClearError::ArithmeticOverflow {
                        context: "net asset A flow",
                    },
                )?,
                asset_b: acc.asset_b.checked_add(s.asset_b_flow).ok_or(
                    QuorumClearError::ArithmeticOverflow {
                        context: "net asset B flow",
                    },
                )?,
            })
        })
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.asset_a == 0 && self.asset_b == 0
    }
}

/// Deterministic output of the auction for one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub settlements: Vec<Settlement>,
    /// Intent indices declared resolved by the match. Duplicates and
    /// out-of-range values are tolerated.
    pub matched_indices: Vec<u64>,
    pub clearing_price: Price,
}

impl BatchResult {
    /// A result that matches nothing; every intent falls back.
    #[must_use]
    pub fn fallback_only() -> Self {
        Self {
            settlements: Vec::new(),
            matched_indices: Vec::new(),
            clearing_price: Price::ONE,
        }
    }

    /// Total net flow across all settlements.
    pub fn net_flow(&self) -> Result<NetFlow> {
        NetFlow::from_settlements(&self.settlements)
    }
}

/// One quorum member's signature over a [`ResultMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub member: MemberId,
    pub signature: Vec<u8>,
}

/// The message quorum members sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMessage {
    pub batch_id: BatchId,
    /// Hash of the batch's frozen intent sequence.
    pub intents_hash: [u8; 32],
    /// Hash of the [`BatchResult`].
    pub result_hash: [u8; 32],
}

impl ResultMessage {
    /// Canonical signing payload.
    ///
    /// Format: `"quorumclear:result-approval:v1:" || batch_id || intents_hash || result_hash`
    #[must_use]
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(31 + 8 + 64);
        payload.extend_from_slice(b"quorumclear:result-approval:v1:");
        payload.extend_from_slice(&self.batch_id.0.to_le_bytes());
        payload.extend_from_slice(&self.intents_hash);
        payload.extend_from_slice(&self.result_hash);
        payload
    }
}

/// Dummy results for testing.
#[cfg(any(test, feature = "test-helpers"))]
impl Settlement {
    pub fn dummy(asset_a_flow: i128, asset_b_flow: i128) -> Self {
        Self {
            owner: OwnerId::new(),
            asset_a_flow,
            asset_b_flow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn net_flow_sums() {
        let settlements = vec![
            Settlement::dummy(-10, 20),
            Settlement::dummy(10, -20),
            Settlement::dummy(5, 0),
        ];
        let net = NetFlow::from_settlements(&settlements).unwrap();
        assert_eq!(net.asset_a, 5);
        assert_eq!(net.asset_b, 0);
        assert!(!net.is_zero());
    }

    #[test]
    fn net_flow_overflow() {
        let settlements = vec![Settlement::dummy(i128::MAX, 0), Settlement::dummy(1, 0)];
        assert!(NetFlow::from_settlements(&settlements).is_err());
    }

    #[test]
    fn fallback_only_is_empty() {
        let r = BatchResult::fallback_only();
        assert!(r.settlements.is_empty());
        assert!(r.matched_indices.is_empty());
        assert!(r.net_flow().unwrap().is_zero());
    }

    #[test]
    fn signing_bytes_bind_batch_id() {
        let a = ResultMessage {
            batch_id: BatchId(1),
            intents_hash: [1; 32],
            result_hash: [2; 32],
        };
        let b = ResultMessage {
            batch_id: BatchId(2),
            ..a
        };
        assert_ne!(a.signing_bytes(), b.signing_bytes());
        assert!(a.signing_bytes().starts_with(b"quorumclear:result-approval:v1:"));
    }

    #[test]
    fn batch_result_serde_roundtrip() {
        let r = BatchResult {
            settlements: vec![Settlement::dummy(-1, 1)],
            matched_indices: vec![0, 7],
            clearing_price: Price::ONE,
        };
        let json = serde_json::to_string(&r).unwrap();
        let back: BatchResult = serde_json::from_str(&json).unwrap();
        assert_eq!(r, back);
    }
}
