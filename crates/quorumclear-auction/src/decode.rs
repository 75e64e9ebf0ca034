//! Decrypting a finalized batch for the auction.
//!
//! Only quorum members run this. An intent that fails to decrypt, fails its
//! commitment check, or carries malformed parameters is left out of the
//! auction; it is not matched and the settlement side voids it during
//! fallback.

use quorumclear_types::{
    Intent, IntentCipher, IntentParams, OwnerId, QuorumClearError, open_intent,
};

/// A decrypted intent, still tagged with its position in the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlainIntent {
    pub index: u64,
    pub owner: OwnerId,
    pub params: IntentParams,
}

/// Output of [`decode_batch`].
#[derive(Debug, Clone, Default)]
pub struct DecodedBatch {
    /// Decodable intents in arrival order.
    pub intents: Vec<PlainIntent>,
    /// Indices left out of the auction and why.
    pub undecodable: Vec<(u64, QuorumClearError)>,
}

/// Decrypt every intent of a batch, preserving arrival order.
#[must_use]
pub fn decode_batch(intents: &[Intent], cipher: &dyn IntentCipher) -> DecodedBatch {
    let mut decoded = DecodedBatch::default();
    for (index, intent) in (0u64..).zip(intents) {
        let opened = if intent.verify_commitment() {
            open_intent(cipher, &intent.ciphertext)
        } else {
            Err(QuorumClearError::MalformedIntent {
                reason: "commitment mismatch".to_string(),
            })
        };
        match opened {
            Ok(params) => decoded.intents.push(PlainIntent {
                index,
                owner: intent.owner,
                params,
            }),
            Err(err) => {
                tracing::warn!(index, owner = %intent.owner, error = %err, "Intent left out of auction");
                decoded.undecodable.push((index, err));
            }
        }
    }
    decoded
}
