//! Batch lifecycle types.
//!
//! Each batch moves through three states, never backwards:
//! **OPEN → FINALIZED → PROCESSED**
//!
//! During OPEN, intents are appended in arrival order.
//! FINALIZED freezes the intent sequence; a verified result may now be applied.
//! PROCESSED means every intent was resolved by the match or the fallback path.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::BatchId;

/// Lifecycle state of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatchState {
    /// Accepting intents.
    Open,
    /// Intent sequence frozen; awaiting a verified result.
    Finalized,
    /// A result (or forced fallback) has been fully applied.
    Processed,
}

impl BatchState {
    /// Can this batch transition to the given target state?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Open, Self::Finalized) | (Self::Finalized, Self::Processed)
        )
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Finalized => write!(f, "FINALIZED"),
            Self::Processed => write!(f, "PROCESSED"),
        }
    }
}

/// Why a matched index or mark request had no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkipReason {
    /// The index was already marked processed.
    AlreadyProcessed,
    /// The index is not below the batch size.
    OutOfRange,
}

/// Result of marking one intent index processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexOutcome {
    Applied,
    Skipped(SkipReason),
}

impl IndexOutcome {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// How a processed intent was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentResolution {
    /// Declared matched by the verified batch result.
    Matched,
    /// Executed individually against the venue.
    FallbackExecuted,
    /// Could not be decoded; resolved without execution.
    Voided { reason: String },
    /// The venue price was outside the intent's limit; nothing moved.
    Unfilled { reason: String },
}

impl fmt::Display for IntentResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matched => write!(f, "MATCHED"),
            Self::FallbackExecuted => write!(f, "FALLBACK_EXECUTED"),
            Self::Voided { reason } => write!(f, "VOIDED({reason})"),
            Self::Unfilled { reason } => write!(f, "UNFILLED({reason})"),
        }
    }
}

/// Public summary of a batch record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: BatchId,
    pub state: BatchState,
    /// Number of intents in the batch.
    pub size: usize,
    /// Number of intents already marked processed.
    pub processed_count: usize,
    pub created_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
    /// Hash of the frozen intent sequence, once finalized.
    pub intents_hash: Option<[u8; 32]>,
}

impl BatchSummary {
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        matches!(self.state, BatchState::Finalized | BatchState::Processed)
    }

    #[must_use]
    pub fn is_processed(&self) -> bool {
        self.state == BatchState::Processed
    }
}

/// Emitted when a batch closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFinalized {
    pub batch_id: BatchId,
    /// Final intent count.
    pub size: usize,
    pub trigger: FinalizeTrigger,
    /// The batch opened in its place.
    pub next_batch: BatchId,
}

/// Which predicate closed a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FinalizeTrigger {
    Size,
    Age,
    Forced,
}

impl fmt::Display for FinalizeTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Size => write!(f, "SIZE"),
            Self::Age => write!(f, "AGE"),
            Self::Forced => write!(f, "FORCED"),
        }
    }
}
