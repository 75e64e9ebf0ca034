//! Determinism verification utilities for cross-member consistency.
//!
//! Every quorum member running the auction over the same intent sequence
//! must produce the exact same `BatchResult`. The result hash is what
//! members sign, so two members agree on a result iff their hashes match.

use quorumclear_types::{BatchId, BatchResult};
use sha2::{Digest, Sha256};

/// Compute the result hash for a batch.
///
/// Depends on, in order:
/// - the batch id
/// - the clearing price
/// - every settlement (owner and both flows)
/// - every matched index
#[must_use]
pub fn compute_result_hash(batch_id: BatchId, result: &BatchResult) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"quorumclear:batch-result:v1:");
    hasher.update(batch_id.0.to_le_bytes());
    hasher.update(result.clearing_price.0.to_le_bytes());

    hasher.update((result.settlements.len() as u64).to_le_bytes());
    for settlement in &result.settlements {
        hasher.update(settlement.owner.as_bytes());
        hasher.update(settlement.asset_a_flow.to_le_bytes());
        hasher.update(settlement.asset_b_flow.to_le_bytes());
    }

    hasher.update((result.matched_indices.len() as u64).to_le_bytes());
    for index in &result.matched_indices {
        hasher.update(index.to_le_bytes());
    }

    hasher.finalize().into()
}

/// Recompute the hash of `result` and compare with `expected`.
#[must_use]
pub fn verify_result_hash(batch_id: BatchId, result: &BatchResult, expected: &[u8; 32]) -> bool {
    compute_result_hash(batch_id, result) == *expected
}

#[cfg(test)]
mod tests {
    use quorumclear_types::{Price, Settlement};

    use super::*;

    fn make_result(flows: &[(i128, i128)]) -> BatchResult {
        BatchResult {
            settlements: flows
                .iter()
                .enumerate()
                .map(|(i, &(a, b))| Settlement {
                    owner: quorumclear_types::OwnerId::from_bytes([i as u8; 16]),
                    asset_a_flow: a,
                    asset_b_flow: b,
                })
                .collect(),
            matched_indices: (0..flows.len() as u64).collect(),
            clearing_price: Price::ONE,
        }
    }

    #[test]
    fn empty_result_deterministic() {
        let empty = BatchResult::fallback_only();
        assert_eq!(
            compute_result_hash(BatchId(0), &empty),
            compute_result_hash(BatchId(0), &empty)
        );
    }

    #[test]
    fn batch_id_is_bound() {
        let result = make_result(&[(-10, 10), (10, -10)]);
        assert_ne!(
            compute_result_hash(BatchId(0), &result),
            compute_result_hash(BatchId(1), &result)
        );
    }

    #[test]
    fn settlement_order_matters() {
        let ab = make_result(&[(-10, 10), (10, -10)]);
        let mut ba = ab.clone();
        ba.settlements.swap(0, 1);
        assert_ne!(
            compute_result_hash(BatchId(3), &ab),
            compute_result_hash(BatchId(3), &ba),
            "Order of settlements must affect the hash"
        );
    }

    #[test]
    fn matched_indices_are_bound() {
        let a = make_result(&[(-1, 1)]);
        let mut b = a.clone();
        b.matched_indices.push(7);
        assert_ne!(
            compute_result_hash(BatchId(0), &a),
            compute_result_hash(BatchId(0), &b)
        );
    }

    #[test]
    fn price_is_bound() {
        let a = make_result(&[(-1, 1)]);
        let mut b = a.clone();
        b.clearing_price = Price::from_units(2);
        assert!(!verify_result_hash(
            BatchId(0),
            &b,
            &compute_result_hash(BatchId(0), &a)
        ));
    }

    #[test]
    fn verify_correct_hash() {
        let result = make_result(&[(-5, 5), (5, -5)]);
        let hash = compute_result_hash(BatchId(9), &result);
        assert!(verify_result_hash(BatchId(9), &result, &hash));
        assert!(!verify_result_hash(BatchId(9), &result, &[0xAB; 32]));
    }
}
