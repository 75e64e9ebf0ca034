//! Quorum member side of a batch.
//!
//! A member reads the finalized intents, decrypts them, runs the auction,
//! and signs the [`ResultMessage`] for the outcome. Members running the same
//! engine configuration over the same batch produce identical results, so
//! their approvals can be pooled.

use quorumclear_auction::AuctionEngine;
use quorumclear_quorum::QuorumSigner;
use quorumclear_types::{
    Approval, AuctionConfig, BatchId, BatchResult, Intent, IntentCipher, MemberId, Result,
    ResultMessage, compute_intents_hash,
};

/// A member's signed proposal for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub result: BatchResult,
    pub message: ResultMessage,
    pub approval: Approval,
}

/// Off-core computation node holding one quorum key.
#[derive(Debug)]
pub struct ComputeNode {
    engine: AuctionEngine,
    signer: QuorumSigner,
}

impl ComputeNode {
    #[must_use]
    pub fn new(config: AuctionConfig, signer: QuorumSigner) -> Self {
        Self {
            engine: AuctionEngine::new(config),
            signer,
        }
    }

    #[must_use]
    pub fn member_id(&self) -> MemberId {
        self.signer.member_id()
    }

    #[must_use]
    pub fn signer(&self) -> &QuorumSigner {
        &self.signer
    }

    /// Clear a finalized batch and sign the outcome.
    ///
    /// # Errors
    /// `ArithmeticOverflow` from the auction.
    pub fn propose(
        &self,
        batch_id: BatchId,
        intents: &[Intent],
        cipher: &dyn IntentCipher,
    ) -> Result<Proposal> {
        let outcome = self.engine.run_sealed(batch_id, intents, cipher)?;
        let message = ResultMessage {
            batch_id,
            intents_hash: compute_intents_hash(batch_id, intents),
            result_hash: outcome.result_hash,
        };
        let approval = self.signer.approve(&message);
        tracing::debug!(
            batch = batch_id.0,
            member = %approval.member,
            result_hash = hex::encode(&outcome.result_hash[..8]),
            "Result proposed"
        );
        Ok(Proposal {
            result: outcome.result,
            message,
            approval,
        })
    }

    /// Sign a result another member computed, after recomputing it.
    ///
    /// Returns `None` if this node's own result differs.
    pub fn endorse(
        &self,
        batch_id: BatchId,
        intents: &[Intent],
        cipher: &dyn IntentCipher,
        result: &BatchResult,
    ) -> Result<Option<Approval>> {
        let own = self.propose(batch_id, intents, cipher)?;
        Ok((own.result == *result).then_some(own.approval))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use quorumclear_types::{IntentParams, OwnerId, TransparentCipher};

    use super::*;

    fn batch() -> Vec<Intent> {
        [IntentParams::sell(10), IntentParams::buy(10)]
            .iter()
            .map(|p| {
                Intent::new(
                    OwnerId::new(),
                    TransparentCipher.encrypt(p).unwrap(),
                    Utc::now(),
                )
            })
            .collect()
    }

    #[test]
    fn members_agree_on_result_hash() {
        let intents = batch();
        let a = ComputeNode::new(AuctionConfig::default(), QuorumSigner::from_seed([1; 32]));
        let b = ComputeNode::new(AuctionConfig::default(), QuorumSigner::from_seed([2; 32]));
        let pa = a.propose(BatchId(0), &intents, &TransparentCipher).unwrap();
        let pb = b.propose(BatchId(0), &intents, &TransparentCipher).unwrap();
        assert_eq!(pa.message, pb.message);
        assert_ne!(pa.approval.member, pb.approval.member);
        assert_eq!(pa.result.matched_indices, vec![0, 1]);
    }

    #[test]
    fn endorse_refuses_foreign_result() {
        let intents = batch();
        let node = ComputeNode::new(AuctionConfig::default(), QuorumSigner::from_seed([3; 32]));
        let honest = node
            .propose(BatchId(0), &intents, &TransparentCipher)
            .unwrap()
            .result;
        assert!(node
            .endorse(BatchId(0), &intents, &TransparentCipher, &honest)
            .unwrap()
            .is_some());
        assert!(node
            .endorse(
                BatchId(0),
                &intents,
                &TransparentCipher,
                &BatchResult::fallback_only()
            )
            .unwrap()
            .is_none());
    }
}
