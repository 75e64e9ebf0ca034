//! # quorumclear-ingress
//!
//! **Admission plane**: intent accumulation and batch finalization.
//!
//! - **IntentLedger**: append-only per-batch store with per-intent processed status
//! - **BatchScheduler**: size/age triggers that close the open batch and open the next
//!
//! ## Intent Flow
//!
//! ```text
//! submit → BatchScheduler.submit() → IntentLedger.append()
//!        → size/age check → IntentLedger.finalize() + open(id + 1)
//! ```
//!
//! Ciphertext is opaque here; nothing in this crate can decrypt an intent.

pub mod intent_ledger;
pub mod scheduler;

pub use intent_ledger::{BatchRecord, IntentLedger};
pub use scheduler::{Admission, BatchScheduler};
