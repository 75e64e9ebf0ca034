//! # quorumclear-core
//!
//! The **QuorumClear** auction house: confidential intents are batched,
//! cleared off-core by a computation quorum, and settled here once enough
//! members have signed the result.
//!
//! - [`AuctionHouse`]: the single-owner facade over every component
//! - [`ComputeNode`]: the quorum member side (decrypt, clear, sign)
//! - [`telemetry`]: `tracing` subscriber setup
//!
//! ## Batch Lifecycle
//!
//! ```text
//! ┌──────────┐    ┌───────────┐    ┌───────────┐
//! │   OPEN   │───▶│ FINALIZED │───▶│ PROCESSED │
//! │          │    │           │    │           │
//! │ submit() │    │ quorum    │    │ matched + │
//! │ appends  │    │ clears &  │    │ fallback  │
//! │          │    │ signs     │    │ settled   │
//! └──────────┘    └───────────┘    └───────────┘
//!   size/age          submit_result() or
//!   trigger           force_complete()
//! ```
//!
//! Every intent ends up processed exactly once: either declared matched by
//! an accepted result, or executed individually by the fallback path.

pub mod compute_node;
pub mod engine;
pub mod telemetry;

pub use compute_node::{ComputeNode, Proposal};
pub use engine::AuctionHouse;
