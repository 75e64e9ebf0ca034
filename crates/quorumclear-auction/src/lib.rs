//! # quorumclear-auction
//!
//! **Pure deterministic batch auction for QuorumClear.**
//!
//! This is the computation a quorum member runs off the core: it takes the
//! decrypted intents of one finalized batch and produces a [`BatchResult`]
//! together with its result hash. It has:
//!
//! - **Zero side effects**: no ledger access and no batch state
//! - **Deterministic output**: same intent sequence -> byte-identical result
//! - **Uniform price**: every fill in a batch settles at one clearing price
//!
//! ```text
//! decode_batch(intents, cipher) -> AuctionEngine::run() -> (BatchResult, result_hash)
//! ```
//!
//! [`BatchResult`]: quorumclear_types::BatchResult

pub mod clearing;
pub mod decode;
pub mod determinism;
pub mod engine;

pub use clearing::{ClearingResult, compute_clearing};
pub use decode::{DecodedBatch, PlainIntent, decode_batch};
pub use determinism::{compute_result_hash, verify_result_hash};
pub use engine::{AuctionEngine, AuctionOutcome};
