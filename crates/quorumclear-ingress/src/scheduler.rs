//! Batch scheduler: decides when the open batch closes.
//!
//! There is no timer. Triggers are evaluated synchronously after every
//! append (and on demand via [`BatchScheduler::check_triggers`]):
//!
//! 1. **Size**: intent count ≥ `max_batch_size`
//! 2. **Age**: `now - created_at ≥ batch_timeout` and intent count ≥
//!    `min_batch_size_for_timeout`
//!
//! When either fires, the open batch is finalized and `id + 1` is opened
//! with `created_at = now`. The scheduler is the single owner of the batch
//! counter; all mutation goes through `&mut self`.

use chrono::{DateTime, TimeDelta, Utc};
use quorumclear_types::{
    BatchFinalized, BatchId, Ciphertext, FinalizeTrigger, Intent, OwnerId, QuorumClearError,
    Result, SchedulerConfig,
};

use crate::intent_ledger::IntentLedger;

/// Where a submitted intent landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub batch_id: BatchId,
    pub index: u64,
    /// Set when this submission closed the batch.
    pub finalized: Option<BatchFinalized>,
}

/// Governs the OPEN → FINALIZED transition of the current batch.
#[derive(Debug)]
pub struct BatchScheduler {
    config: SchedulerConfig,
    batch_timeout: TimeDelta,
    current: BatchId,
}

impl BatchScheduler {
    /// Create the scheduler and open batch 0 at `now`.
    ///
    /// # Errors
    /// `Configuration` for an invalid config, `BatchAlreadyOpened` if the
    /// ledger already holds batch 0.
    pub fn new(
        config: SchedulerConfig,
        ledger: &mut IntentLedger,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        config.validate()?;
        let batch_timeout = TimeDelta::from_std(config.batch_timeout).map_err(|e| {
            QuorumClearError::Configuration(format!("scheduler.batch_timeout: {e}"))
        })?;
        ledger.open(BatchId::GENESIS, now)?;
        Ok(Self {
            config,
            batch_timeout,
            current: BatchId::GENESIS,
        })
    }

    /// The batch currently accepting intents.
    #[must_use]
    pub fn current_batch_id(&self) -> BatchId {
        self.current
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Admit an intent into the open batch, then evaluate the triggers.
    ///
    /// # Errors
    /// `EmptyCiphertext` for an empty envelope. Nothing is appended then.
    pub fn submit(
        &mut self,
        ledger: &mut IntentLedger,
        owner: OwnerId,
        ciphertext: Ciphertext,
        now: DateTime<Utc>,
    ) -> Result<Admission> {
        if ciphertext.is_empty() {
            return Err(QuorumClearError::EmptyCiphertext(owner));
        }
        let batch_id = self.current;
        let index = ledger.append(batch_id, Intent::new(owner, ciphertext, now))?;
        tracing::debug!(batch = batch_id.0, index, owner = %owner, "Intent admitted");

        let finalized = self.check_triggers(ledger, now)?;
        Ok(Admission {
            batch_id,
            index,
            finalized,
        })
    }

    /// Evaluate both triggers against the open batch without appending.
    ///
    /// Only ever touches the open batch, so a finalized batch is never
    /// finalized again.
    pub fn check_triggers(
        &mut self,
        ledger: &mut IntentLedger,
        now: DateTime<Utc>,
    ) -> Result<Option<BatchFinalized>> {
        let record = ledger.record(self.current)?;
        match self.evaluate(record.len(), record.created_at, now) {
            Some(trigger) => self.rotate(ledger, trigger, now).map(Some),
            None => Ok(None),
        }
    }

    /// Close the open batch regardless of thresholds.
    ///
    /// Authorization is the caller's responsibility.
    ///
    /// # Errors
    /// `NothingToFinalize` if the open batch is empty.
    pub fn force_finalize(
        &mut self,
        ledger: &mut IntentLedger,
        now: DateTime<Utc>,
    ) -> Result<BatchFinalized> {
        if ledger.size(self.current) == 0 {
            return Err(QuorumClearError::NothingToFinalize(self.current));
        }
        self.rotate(ledger, FinalizeTrigger::Forced, now)
    }

    fn evaluate(
        &self,
        size: usize,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<FinalizeTrigger> {
        if size >= self.config.max_batch_size {
            return Some(FinalizeTrigger::Size);
        }
        if size >= self.config.min_batch_size_for_timeout
            && now.signed_duration_since(created_at) >= self.batch_timeout
        {
            return Some(FinalizeTrigger::Age);
        }
        None
    }

    fn rotate(
        &mut self,
        ledger: &mut IntentLedger,
        trigger: FinalizeTrigger,
        now: DateTime<Utc>,
    ) -> Result<BatchFinalized> {
        let closing = self.current;
        let intents_hash = ledger.finalize(closing, now)?;
        let next = closing.next();
        ledger.open(next, now)?;
        self.current = next;

        let event = BatchFinalized {
            batch_id: closing,
            size: ledger.size(closing),
            trigger,
            next_batch: next,
        };
        tracing::info!(
            batch = closing.0,
            size = event.size,
            trigger = %trigger,
            intents_hash = hex::encode(&intents_hash[..8]),
            next_batch = next.0,
            "Batch finalized"
        );
        Ok(event)
    }
}
