//! System-wide constants for the QuorumClear engine.

/// Default size trigger: a batch closes once it holds this many intents.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

/// Default age trigger in seconds.
pub const DEFAULT_BATCH_TIMEOUT_SECS: u64 = 30;

/// Default minimum intent count before the age trigger may fire.
pub const DEFAULT_MIN_BATCH_SIZE_FOR_TIMEOUT: usize = 1;

/// Minimum size for the age trigger in hardened deployments. A single-intent
/// batch reveals its sole participant's direction.
pub const HARDENED_MIN_BATCH_SIZE_FOR_TIMEOUT: usize = 2;

/// Default number of distinct member approvals required for a result.
pub const DEFAULT_QUORUM_THRESHOLD: usize = 2;

/// Default delay after finalization before an operator may force a
/// fallback-only completion, in seconds.
pub const DEFAULT_FORCE_COMPLETE_AFTER_SECS: u64 = 3_600;

/// Default slippage tolerated on the batch net swap, in basis points.
pub const DEFAULT_NET_SWAP_SLIPPAGE_BPS: u16 = 50;

/// Basis-point denominator.
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
