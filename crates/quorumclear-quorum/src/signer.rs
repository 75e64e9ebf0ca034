//! Member-side signing of result messages.

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use quorumclear_types::{Approval, MemberId, ResultMessage};

/// A quorum member's signing identity.
pub struct QuorumSigner {
    key: SigningKey,
}

impl QuorumSigner {
    #[must_use]
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Deterministic signer from a 32-byte secret seed.
    #[must_use]
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self::new(SigningKey::from_bytes(&seed))
    }

    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    #[must_use]
    pub fn member_id(&self) -> MemberId {
        MemberId::from_pubkey(self.key.verifying_key().to_bytes())
    }

    /// Sign a result message.
    #[must_use]
    pub fn approve(&self, message: &ResultMessage) -> Approval {
        let signature = self.key.sign(&message.signing_bytes());
        Approval {
            member: self.member_id(),
            signature: signature.to_bytes().to_vec(),
        }
    }
}

impl std::fmt::Debug for QuorumSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuorumSigner")
            .field("member", &self.member_id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use quorumclear_types::BatchId;

    use super::*;
    use crate::{Ed25519Membership, Membership};

    #[test]
    fn approval_verifies_under_membership() {
        let signer = QuorumSigner::from_seed([3u8; 32]);
        let mut membership = Ed25519Membership::new();
        membership.insert(signer.verifying_key(), 1);

        let message = ResultMessage {
            batch_id: BatchId(2),
            intents_hash: [1; 32],
            result_hash: [2; 32],
        };
        let approval = signer.approve(&message);
        assert_eq!(approval.member, signer.member_id());
        assert!(membership.verify(
            &approval.member,
            &message.signing_bytes(),
            &approval.signature
        ));

        let other = ResultMessage {
            batch_id: BatchId(3),
            ..message
        };
        assert!(!membership.verify(
            &approval.member,
            &other.signing_bytes(),
            &approval.signature
        ));
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let signer = QuorumSigner::from_seed([4u8; 32]);
        let shown = format!("{signer:?}");
        assert!(shown.contains("QuorumSigner"));
        assert!(!shown.contains("secret"));
    }
}
