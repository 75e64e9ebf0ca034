//! Error types for the QuorumClear batch auction engine.
//!
//! All errors use the `QC_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Admission errors
//! - 2xx: Authorization / quorum errors
//! - 3xx: Batch state errors
//! - 4xx: Data errors
//! - 5xx: Ledger errors
//! - 9xx: General / internal errors
//!
//! Out-of-range or duplicate matched indices are deliberately absent: they
//! are reported as [`crate::IndexOutcome::Skipped`], never as errors.

use thiserror::Error;

use crate::{BatchId, MemberId, OwnerId};

/// Central error enum for all QuorumClear operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuorumClearError {
    // =================================================================
    // Admission Errors (1xx)
    // =================================================================
    /// No batch record exists for this identifier.
    #[error("QC_ERR_100: Unknown batch: {0}")]
    UnknownBatch(BatchId),

    /// The batch no longer accepts intents.
    #[error("QC_ERR_101: Batch closed for submissions: {0}")]
    BatchClosed(BatchId),

    /// The ciphertext envelope is empty.
    #[error("QC_ERR_102: Empty ciphertext from {0}")]
    EmptyCiphertext(OwnerId),

    /// A batch with this identifier has already been opened.
    #[error("QC_ERR_103: Batch already opened: {0}")]
    BatchAlreadyOpened(BatchId),

    // =================================================================
    // Authorization Errors (2xx)
    // =================================================================
    /// Fewer approvals than the quorum threshold.
    #[error("QC_ERR_200: Insufficient approvals: need {needed}, got {got}")]
    InsufficientApprovals { needed: usize, got: usize },

    /// An approval came from a signer outside the current membership.
    #[error("QC_ERR_201: Signer is not a quorum member: {0}")]
    NotAMember(MemberId),

    /// The same member signed twice.
    #[error("QC_ERR_202: Duplicate signer: {0}")]
    DuplicateSigner(MemberId),

    /// A signature did not verify over the result message.
    #[error("QC_ERR_203: Invalid signature from {0}")]
    InvalidSignature(MemberId),

    /// Combined stake of the approving members is below the minimum.
    #[error("QC_ERR_204: Insufficient stake: need {needed}, got {got}")]
    InsufficientStake { needed: u128, got: u128 },

    /// Only the configured operator may perform this action.
    #[error("QC_ERR_205: Caller is not the operator: {0}")]
    NotOperator(OwnerId),

    // =================================================================
    // State Errors (3xx)
    // =================================================================
    /// The batch is still open; results can only be applied once finalized.
    #[error("QC_ERR_300: Batch not finalized: {0}")]
    BatchNotFinalized(BatchId),

    /// Finalization is terminal for a batch identifier.
    #[error("QC_ERR_301: Batch already finalized: {0}")]
    BatchAlreadyFinalized(BatchId),

    /// A result has already been applied to this batch.
    #[error("QC_ERR_302: Batch already processed: {0}")]
    BatchAlreadyProcessed(BatchId),

    /// Forced completion requested before the escape-hatch delay elapsed.
    #[error("QC_ERR_303: Force completion too early for {batch}: {remaining_secs}s remaining")]
    ForceCompleteTooEarly { batch: BatchId, remaining_secs: i64 },

    /// Forced finalization of an empty open batch.
    #[error("QC_ERR_304: Nothing to finalize in {0}")]
    NothingToFinalize(BatchId),

    // =================================================================
    // Data Errors (4xx)
    // =================================================================
    /// The intent payload decrypted but is structurally invalid.
    #[error("QC_ERR_400: Malformed intent: {reason}")]
    MalformedIntent { reason: String },

    /// The confidentiality layer could not decrypt the payload.
    #[error("QC_ERR_401: Decryption failed: {reason}")]
    DecryptionFailed { reason: String },

    /// The settlements demand both assets from the venue at once.
    #[error("QC_ERR_402: Net flow cannot be covered: asset_a={asset_a}, asset_b={asset_b}")]
    NetFlowUncovered { asset_a: i128, asset_b: i128 },

    /// Fixed-point arithmetic overflowed.
    #[error("QC_ERR_403: Arithmetic overflow in {context}")]
    ArithmeticOverflow { context: &'static str },

    // =================================================================
    // Ledger Errors (5xx)
    // =================================================================
    /// The venue rejected a swap.
    #[error("QC_ERR_500: Swap failed: {reason}")]
    SwapFailed { reason: String },

    /// The venue rejected a transfer.
    #[error("QC_ERR_501: Transfer failed: {reason}")]
    TransferFailed { reason: String },

    /// The venue could not collect committed funds from an owner.
    #[error("QC_ERR_502: Take failed: {reason}")]
    TakeFailed { reason: String },

    /// The swap executed outside the requested price limit.
    #[error("QC_ERR_503: Price limit breached: {reason}")]
    PriceLimitBreached { reason: String },

    /// The net swap returned less than the settlements require.
    #[error("QC_ERR_504: Ledger shortfall: {reason}")]
    LedgerShortfall { reason: String },

    /// A ledger transaction was already open or not open.
    #[error("QC_ERR_505: Ledger transaction error: {reason}")]
    LedgerTransaction { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("QC_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("QC_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("QC_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl QuorumClearError {
    /// Whether this error came from the Ledger collaborator.
    #[must_use]
    pub fn is_ledger_error(&self) -> bool {
        matches!(
            self,
            Self::SwapFailed { .. }
                | Self::TransferFailed { .. }
                | Self::TakeFailed { .. }
                | Self::PriceLimitBreached { .. }
                | Self::LedgerShortfall { .. }
                | Self::LedgerTransaction { .. }
        )
    }

    /// Whether this error is a quorum authorization rejection.
    #[must_use]
    pub fn is_authorization_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientApprovals { .. }
                | Self::NotAMember(_)
                | Self::DuplicateSigner(_)
                | Self::InvalidSignature(_)
                | Self::InsufficientStake { .. }
                | Self::NotOperator(_)
        )
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, QuorumClearError>;

impl From<serde_json::Error> for QuorumClearError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
