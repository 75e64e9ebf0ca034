//! # quorumclear-types
//!
//! Shared types, errors, and configuration for the **QuorumClear** batch
//! auction engine.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`BatchId`], [`OwnerId`], [`MemberId`]
//! - **Intent model**: [`Intent`], [`Ciphertext`], [`IntentParams`], [`Direction`], [`AssetKind`]
//! - **Batch model**: [`BatchState`], [`BatchSummary`], [`BatchFinalized`], [`IndexOutcome`], [`IntentResolution`]
//! - **Result model**: [`BatchResult`], [`Settlement`], [`NetFlow`], [`Approval`], [`ResultMessage`]
//! - **Pricing**: fixed-point [`Price`] with [`SCALE`]
//! - **Collaborators**: [`Clock`], [`IntentCipher`]
//! - **Configuration**: [`EngineConfig`] and its sections
//! - **Errors**: [`QuorumClearError`] with `QC_ERR_` prefix codes

pub mod batch;
pub mod cipher;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod intent;
pub mod price;
pub mod result;

pub use batch::*;
pub use cipher::*;
pub use clock::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use intent::*;
pub use price::*;
pub use result::*;

// Constants are accessed via `quorumclear_types::constants::FOO`.
