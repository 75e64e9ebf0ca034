//! Quorum membership.

use std::collections::BTreeMap;

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use quorumclear_types::{MemberId, QuorumClearError, Result};

/// Membership oracle consumed by the verifiers.
pub trait Membership: Send + Sync {
    fn is_member(&self, member: &MemberId) -> bool;

    /// Whether `signature` is a valid signature by `member` over `message`.
    /// Always `false` for non-members.
    fn verify(&self, member: &MemberId, message: &[u8], signature: &[u8]) -> bool;

    /// Stake bonded by `member`; zero for non-members.
    fn stake_of(&self, member: &MemberId) -> u128;

    fn member_count(&self) -> usize;
}

#[derive(Debug, Clone)]
struct MemberEntry {
    key: VerifyingKey,
    stake: u128,
}

/// Static member set keyed by ed25519 public key.
#[derive(Debug, Clone, Default)]
pub struct Ed25519Membership {
    members: BTreeMap<MemberId, MemberEntry>,
}

impl Ed25519Membership {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a member with its stake. Re-registering updates the stake.
    pub fn insert(&mut self, key: VerifyingKey, stake: u128) -> MemberId {
        let id = MemberId::from_pubkey(key.to_bytes());
        self.members.insert(id, MemberEntry { key, stake });
        id
    }

    /// Register a member from raw public key bytes.
    ///
    /// # Errors
    /// `Configuration` if the bytes are not a valid ed25519 point.
    pub fn insert_bytes(&mut self, public_key: [u8; 32], stake: u128) -> Result<MemberId> {
        let key = VerifyingKey::from_bytes(&public_key).map_err(|e| {
            QuorumClearError::Configuration(format!("invalid member key: {e}"))
        })?;
        Ok(self.insert(key, stake))
    }

    pub fn remove(&mut self, member: &MemberId) -> bool {
        self.members.remove(member).is_some()
    }

    pub fn members(&self) -> impl Iterator<Item = &MemberId> {
        self.members.keys()
    }
}

impl Membership for Ed25519Membership {
    fn is_member(&self, member: &MemberId) -> bool {
        self.members.contains_key(member)
    }

    fn verify(&self, member: &MemberId, message: &[u8], signature: &[u8]) -> bool {
        let Some(entry) = self.members.get(member) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        entry.key.verify(message, &signature).is_ok()
    }

    fn stake_of(&self, member: &MemberId) -> u128 {
        self.members.get(member).map_or(0, |entry| entry.stake)
    }

    fn member_count(&self) -> usize {
        self.members.len()
    }
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::{Signer, SigningKey};

    use super::*;

    #[test]
    fn insert_and_verify() {
        let sk = SigningKey::from_bytes(&[7u8; 32]);
        let mut membership = Ed25519Membership::new();
        let id = membership.insert(sk.verifying_key(), 100);

        assert!(membership.is_member(&id));
        assert_eq!(membership.stake_of(&id), 100);
        assert_eq!(membership.member_count(), 1);

        let sig = sk.sign(b"payload");
        assert!(membership.verify(&id, b"payload", &sig.to_bytes()));
        assert!(!membership.verify(&id, b"other", &sig.to_bytes()));
    }

    #[test]
    fn non_member_never_verifies() {
        let sk = SigningKey::from_bytes(&[8u8; 32]);
        let membership = Ed25519Membership::new();
        let id = MemberId::from_pubkey(sk.verifying_key().to_bytes());
        let sig = sk.sign(b"payload");
        assert!(!membership.is_member(&id));
        assert!(!membership.verify(&id, b"payload", &sig.to_bytes()));
        assert_eq!(membership.stake_of(&id), 0);
    }

    #[test]
    fn malformed_signature_bytes_rejected() {
        let sk = SigningKey::from_bytes(&[9u8; 32]);
        let mut membership = Ed25519Membership::new();
        let id = membership.insert(sk.verifying_key(), 1);
        assert!(!membership.verify(&id, b"payload", &[0u8; 12]));
    }

    #[test]
    fn remove_member() {
        let sk = SigningKey::from_bytes(&[1u8; 32]);
        let mut membership = Ed25519Membership::new();
        let id = membership.insert_bytes(sk.verifying_key().to_bytes(), 5).unwrap();
        assert!(membership.remove(&id));
        assert!(!membership.is_member(&id));
        assert!(!membership.remove(&id));
    }
}
