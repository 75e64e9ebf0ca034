//! # quorumclear-settlement
//!
//! **Finality plane**: turns an accepted batch result into venue activity
//! and guarantees every intent of the batch is resolved exactly once.
//!
//! ## Architecture
//!
//! The [`SettlementCoordinator`] receives a verified [`BatchResult`] and:
//! 1. Rejects the batch if it is not finalized or already processed
//! 2. Stages the matched indices as processed
//! 3. Collects every owner's committed input via `Ledger::take`
//! 4. Executes one net swap for the batch's residual flow
//! 5. Pays out every positive flow via `Ledger::transfer`
//! 6. Runs the [`FallbackExecutor`] for every intent left over; an owner
//!    who cannot pay only leaves their own intent unfilled
//!
//! Steps 3 to 6 run inside one ledger transaction. Processed marks are
//! written to the `IntentLedger` only after it commits.
//!
//! [`BatchResult`]: quorumclear_types::BatchResult

pub mod coordinator;
pub mod fallback;
pub mod ledger;
pub mod memory_ledger;
pub mod net_flow;

pub use coordinator::{SettlementCoordinator, SettlementReport};
pub use fallback::FallbackExecutor;
pub use ledger::{Ledger, SwapDelta};
pub use memory_ledger::InMemoryLedger;
pub use net_flow::{NetSwap, plan_net_swap, verify_coverage};
