//! Append-only per-batch intent store.
//!
//! One [`BatchRecord`] per identifier, never removed, never reused. Intents
//! are appended while the batch is OPEN and frozen once it is FINALIZED.
//! Per-intent processed status is tracked in `processed_index`, with the
//! [`IntentResolution`] that explains how each index was resolved.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use quorumclear_types::{
    BatchId, BatchState, BatchSummary, IndexOutcome, Intent, IntentResolution, QuorumClearError,
    Result, SkipReason, compute_intents_hash,
};

/// Everything the engine knows about one batch.
#[derive(Debug, Clone)]
pub struct BatchRecord {
    pub batch_id: BatchId,
    /// Intents in arrival order.
    intents: Vec<Intent>,
    pub created_at: DateTime<Utc>,
    pub state: BatchState,
    pub finalized_at: Option<DateTime<Utc>>,
    /// Set at finalization.
    pub intents_hash: Option<[u8; 32]>,
    processed_index: BTreeSet<u64>,
    resolutions: BTreeMap<u64, IntentResolution>,
}

impl BatchRecord {
    fn new(batch_id: BatchId, created_at: DateTime<Utc>) -> Self {
        Self {
            batch_id,
            intents: Vec::new(),
            created_at,
            state: BatchState::Open,
            finalized_at: None,
            intents_hash: None,
            processed_index: BTreeSet::new(),
            resolutions: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn intents(&self) -> &[Intent] {
        &self.intents
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.intents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    #[must_use]
    pub fn processed_indices(&self) -> &BTreeSet<u64> {
        &self.processed_index
    }

    /// Indices in `[0, len)` not yet processed, ascending.
    pub fn unprocessed_indices(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.intents.len() as u64).filter(|i| !self.processed_index.contains(i))
    }

    fn summary(&self) -> BatchSummary {
        BatchSummary {
            batch_id: self.batch_id,
            state: self.state,
            size: self.intents.len(),
            processed_count: self.processed_index.len(),
            created_at: self.created_at,
            finalized_at: self.finalized_at,
            intents_hash: self.intents_hash,
        }
    }
}

/// Append-only store of every batch record.
#[derive(Debug, Default)]
pub struct IntentLedger {
    batches: BTreeMap<BatchId, BatchRecord>,
}

impl IntentLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a fresh, empty batch record.
    ///
    /// # Errors
    /// `BatchAlreadyOpened` if the identifier was used before.
    pub fn open(&mut self, batch_id: BatchId, created_at: DateTime<Utc>) -> Result<()> {
        if self.batches.contains_key(&batch_id) {
            return Err(QuorumClearError::BatchAlreadyOpened(batch_id));
        }
        self.batches
            .insert(batch_id, BatchRecord::new(batch_id, created_at));
        Ok(())
    }

    /// Append an intent to an open batch and return its index.
    ///
    /// No capacity check: the size trigger lives in the scheduler.
    ///
    /// # Errors
    /// - `UnknownBatch` if no record exists
    /// - `BatchClosed` if the batch is no longer open
    pub fn append(&mut self, batch_id: BatchId, intent: Intent) -> Result<u64> {
        let record = self.record_mut(batch_id)?;
        if record.state != BatchState::Open {
            return Err(QuorumClearError::BatchClosed(batch_id));
        }
        record.intents.push(intent);
        Ok(record.intents.len() as u64 - 1)
    }

    /// Freeze the intent sequence and compute its hash.
    ///
    /// # Errors
    /// `BatchAlreadyFinalized` if this batch has left the OPEN state.
    pub fn finalize(&mut self, batch_id: BatchId, now: DateTime<Utc>) -> Result<[u8; 32]> {
        let record = self.record_mut(batch_id)?;
        if !record.state.can_transition_to(BatchState::Finalized) {
            return Err(QuorumClearError::BatchAlreadyFinalized(batch_id));
        }
        let hash = compute_intents_hash(batch_id, &record.intents);
        record.state = BatchState::Finalized;
        record.finalized_at = Some(now);
        record.intents_hash = Some(hash);
        Ok(hash)
    }

    /// Mark one intent processed.
    ///
    /// Out-of-range and repeated indices are accepted as no-ops and reported
    /// as [`IndexOutcome::Skipped`].
    ///
    /// # Errors
    /// - `UnknownBatch` if no record exists
    /// - `BatchNotFinalized` if the batch is still open
    pub fn mark_processed(
        &mut self,
        batch_id: BatchId,
        index: u64,
        resolution: IntentResolution,
    ) -> Result<IndexOutcome> {
        let record = self.record_mut(batch_id)?;
        if record.state == BatchState::Open {
            return Err(QuorumClearError::BatchNotFinalized(batch_id));
        }
        if index >= record.intents.len() as u64 {
            return Ok(IndexOutcome::Skipped(SkipReason::OutOfRange));
        }
        if !record.processed_index.insert(index) {
            return Ok(IndexOutcome::Skipped(SkipReason::AlreadyProcessed));
        }
        record.resolutions.insert(index, resolution);
        Ok(IndexOutcome::Applied)
    }

    /// Transition a finalized batch to PROCESSED.
    ///
    /// # Errors
    /// `BatchNotFinalized` or `BatchAlreadyProcessed`.
    pub fn mark_batch_processed(&mut self, batch_id: BatchId) -> Result<()> {
        let record = self.record_mut(batch_id)?;
        match record.state {
            BatchState::Open => Err(QuorumClearError::BatchNotFinalized(batch_id)),
            BatchState::Processed => Err(QuorumClearError::BatchAlreadyProcessed(batch_id)),
            BatchState::Finalized => {
                record.state = BatchState::Processed;
                Ok(())
            }
        }
    }

    /// Whether the intent at `index` has been processed. False when out of range.
    #[must_use]
    pub fn is_processed(&self, batch_id: BatchId, index: u64) -> bool {
        self.batches
            .get(&batch_id)
            .is_some_and(|r| r.processed_index.contains(&index))
    }

    /// How a processed intent was resolved.
    #[must_use]
    pub fn resolution(&self, batch_id: BatchId, index: u64) -> Option<&IntentResolution> {
        self.batches
            .get(&batch_id)
            .and_then(|r| r.resolutions.get(&index))
    }

    /// Intents of a batch in arrival order.
    pub fn get(&self, batch_id: BatchId) -> Result<&[Intent]> {
        Ok(self.record(batch_id)?.intents())
    }

    /// Number of intents in a batch. Zero for unknown batches.
    #[must_use]
    pub fn size(&self, batch_id: BatchId) -> usize {
        self.batches.get(&batch_id).map_or(0, BatchRecord::len)
    }

    /// Hash frozen at finalization.
    ///
    /// # Errors
    /// `UnknownBatch`, or `BatchNotFinalized` while the batch is open.
    pub fn intents_hash(&self, batch_id: BatchId) -> Result<[u8; 32]> {
        self.record(batch_id)?
            .intents_hash
            .ok_or(QuorumClearError::BatchNotFinalized(batch_id))
    }

    pub fn summary(&self, batch_id: BatchId) -> Result<BatchSummary> {
        Ok(self.record(batch_id)?.summary())
    }

    pub fn record(&self, batch_id: BatchId) -> Result<&BatchRecord> {
        self.batches
            .get(&batch_id)
            .ok_or(QuorumClearError::UnknownBatch(batch_id))
    }

    fn record_mut(&mut self, batch_id: BatchId) -> Result<&mut BatchRecord> {
        self.batches
            .get_mut(&batch_id)
            .ok_or(QuorumClearError::UnknownBatch(batch_id))
    }

    /// Number of batch records ever opened.
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }
}
