//! Result acceptance rules.
//!
//! Every verifier runs the same per-approval checks, in order:
//!
//! 1. The signer is a member (`NotAMember`)
//! 2. The signer has not already signed (`DuplicateSigner`)
//! 3. The signature verifies over the result message (`InvalidSignature`)
//!
//! and then applies its own sufficiency rule. The first failing predicate
//! is returned; a rejected result causes no state change anywhere.

use std::collections::BTreeSet;

use ed25519_dalek::VerifyingKey;
use quorumclear_types::{
    Approval, MemberId, QuorumClearError, QuorumConfig, QuorumScheme, Result, ResultMessage,
};

use crate::{Ed25519Membership, Membership};

/// Decides whether a set of approvals authorizes a result.
pub trait ResultVerifier: Send + Sync {
    /// # Errors
    /// The first failing predicate, as an authorization error.
    fn accept(&self, message: &ResultMessage, approvals: &[Approval]) -> Result<()>;

    fn is_accepted(&self, message: &ResultMessage, approvals: &[Approval]) -> bool {
        self.accept(message, approvals).is_ok()
    }
}

/// Run the per-approval checks and return the distinct valid signers.
fn check_signers<M: Membership>(
    membership: &M,
    message: &ResultMessage,
    approvals: &[Approval],
) -> Result<Vec<MemberId>> {
    let payload = message.signing_bytes();
    let mut seen = BTreeSet::new();
    for approval in approvals {
        if !membership.is_member(&approval.member) {
            return Err(QuorumClearError::NotAMember(approval.member));
        }
        if !seen.insert(approval.member) {
            return Err(QuorumClearError::DuplicateSigner(approval.member));
        }
        if !membership.verify(&approval.member, &payload, &approval.signature) {
            return Err(QuorumClearError::InvalidSignature(approval.member));
        }
    }
    Ok(seen.into_iter().collect())
}

/// Accept once at least `threshold` distinct members have signed.
#[derive(Debug, Clone)]
pub struct ThresholdVerifier<M> {
    membership: M,
    threshold: usize,
}

impl<M: Membership> ThresholdVerifier<M> {
    #[must_use]
    pub fn new(membership: M, threshold: usize) -> Self {
        Self {
            membership,
            threshold,
        }
    }

    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    #[must_use]
    pub fn membership(&self) -> &M {
        &self.membership
    }
}

impl<M: Membership> ResultVerifier for ThresholdVerifier<M> {
    fn accept(&self, message: &ResultMessage, approvals: &[Approval]) -> Result<()> {
        if approvals.len() < self.threshold {
            return Err(QuorumClearError::InsufficientApprovals {
                needed: self.threshold,
                got: approvals.len(),
            });
        }
        let signers = check_signers(&self.membership, message, approvals)?;
        tracing::debug!(
            batch = message.batch_id.0,
            signers = signers.len(),
            threshold = self.threshold,
            "Threshold quorum reached"
        );
        Ok(())
    }
}

/// Accept a result signed by one trusted key.
#[derive(Debug, Clone)]
pub struct SingleKeyVerifier {
    inner: ThresholdVerifier<Ed25519Membership>,
}

impl SingleKeyVerifier {
    #[must_use]
    pub fn new(key: VerifyingKey) -> Self {
        let mut membership = Ed25519Membership::new();
        membership.insert(key, 0);
        Self {
            inner: ThresholdVerifier::new(membership, 1),
        }
    }
}

impl ResultVerifier for SingleKeyVerifier {
    fn accept(&self, message: &ResultMessage, approvals: &[Approval]) -> Result<()> {
        self.inner.accept(message, approvals)
    }
}

/// Accept once the signers' combined stake reaches `min_stake`.
#[derive(Debug, Clone)]
pub struct StakeWeightedVerifier<M> {
    membership: M,
    min_stake: u128,
}

impl<M: Membership> StakeWeightedVerifier<M> {
    #[must_use]
    pub fn new(membership: M, min_stake: u128) -> Self {
        Self {
            membership,
            min_stake,
        }
    }
}

impl<M: Membership> ResultVerifier for StakeWeightedVerifier<M> {
    fn accept(&self, message: &ResultMessage, approvals: &[Approval]) -> Result<()> {
        if approvals.is_empty() {
            return Err(QuorumClearError::InsufficientApprovals { needed: 1, got: 0 });
        }
        let signers = check_signers(&self.membership, message, approvals)?;
        let stake = signers
            .iter()
            .fold(0u128, |acc, m| acc.saturating_add(self.membership.stake_of(m)));
        if stake < self.min_stake {
            return Err(QuorumClearError::InsufficientStake {
                needed: self.min_stake,
                got: stake,
            });
        }
        tracing::debug!(
            batch = message.batch_id.0,
            signers = signers.len(),
            stake,
            "Stake quorum reached"
        );
        Ok(())
    }
}

/// Build the configured verifier over a membership set.
///
/// # Errors
/// `Configuration` if the scheme is invalid.
pub fn build_verifier(
    config: &QuorumConfig,
    membership: Ed25519Membership,
) -> Result<Box<dyn ResultVerifier>> {
    config.validate()?;
    Ok(match config.scheme {
        QuorumScheme::Threshold { threshold } => {
            Box::new(ThresholdVerifier::new(membership, threshold))
        }
        QuorumScheme::StakeWeighted { min_stake } => {
            Box::new(StakeWeightedVerifier::new(membership, min_stake))
        }
    })
}
