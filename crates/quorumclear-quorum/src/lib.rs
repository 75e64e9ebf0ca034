//! # quorumclear-quorum
//!
//! **Verification plane**: decides whether a batch result carries enough
//! valid approvals from the computation quorum.
//!
//! - **Membership**: who may sign, how to check a signature, and stake
//! - **ResultVerifier**: the acceptance rule (fixed count, single key, or stake)
//! - **QuorumSigner**: the member side, producing approvals
//!
//! Every approval is an ed25519 signature over
//! [`ResultMessage::signing_bytes`](quorumclear_types::ResultMessage::signing_bytes),
//! which binds the batch id, the frozen intents hash and the result hash.

pub mod membership;
pub mod signer;
pub mod verifier;

pub use membership::{Ed25519Membership, Membership};
pub use signer::QuorumSigner;
pub use verifier::{
    ResultVerifier, SingleKeyVerifier, StakeWeightedVerifier, ThresholdVerifier, build_verifier,
};
