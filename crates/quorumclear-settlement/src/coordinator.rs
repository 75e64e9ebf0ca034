//! Batch settlement.
//!
//! ```text
//! apply(batch, result)
//!   state check ─▶ plan net swap ─▶ stage matched marks
//!   begin ─▶ take* ─▶ net swap ─▶ coverage check ─▶ transfer* ─▶ fallback*
//!   commit ─▶ write marks ─▶ PROCESSED
//! ```
//!
//! Nothing touches the `IntentLedger` until the ledger transaction has
//! committed. A ledger failure anywhere rolls the venue back and leaves the
//! batch FINALIZED with no intent marked, so the same or a corrected result
//! can be applied later.

use std::collections::BTreeMap;

use quorumclear_ingress::IntentLedger;
use quorumclear_types::{
    AssetKind, BatchId, BatchResult, BatchState, IndexOutcome, IntentCipher, IntentResolution,
    NetFlow, QuorumClearError, Result, SettlementConfig, SkipReason,
};
use serde::{Deserialize, Serialize};

use crate::{FallbackExecutor, Ledger, NetSwap, SwapDelta, plan_net_swap, verify_coverage};

/// What happened while settling one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReport {
    pub batch_id: BatchId,
    /// Indices resolved by the match.
    pub matched: Vec<u64>,
    /// Matched indices that were ignored, with the reason.
    pub skipped: Vec<(u64, SkipReason)>,
    /// Indices executed through fallback.
    pub fallback: Vec<u64>,
    /// Indices resolved without execution (undecodable or unfilled).
    pub voided: Vec<u64>,
    pub net_flow: NetFlow,
    /// Venue swap executed for the net flow, if any.
    pub net_swap: Option<SwapDelta>,
    /// Dust left in the settlement account by this batch.
    pub retained: NetFlow,
}

impl SettlementReport {
    /// Total intents resolved by this settlement.
    #[must_use]
    pub fn resolved(&self) -> usize {
        self.matched.len() + self.fallback.len() + self.voided.len()
    }
}

/// Applies verified batch results.
#[derive(Debug, Clone, Default)]
pub struct SettlementCoordinator {
    config: SettlementConfig,
}

impl SettlementCoordinator {
    #[must_use]
    pub fn new(config: SettlementConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    /// Settle a finalized batch. Every intent is processed exactly once.
    ///
    /// # Errors
    /// - `UnknownBatch`, `BatchNotFinalized`, `BatchAlreadyProcessed` before
    ///   any mutation
    /// - `NetFlowUncovered` or `ArithmeticOverflow` before any mutation
    /// - any ledger error, after a full rollback
    pub fn apply<L: Ledger + ?Sized>(
        &self,
        intents: &mut IntentLedger,
        ledger: &mut L,
        cipher: &dyn IntentCipher,
        batch_id: BatchId,
        result: &BatchResult,
    ) -> Result<SettlementReport> {
        match intents.record(batch_id)?.state {
            BatchState::Open => return Err(QuorumClearError::BatchNotFinalized(batch_id)),
            BatchState::Processed => {
                return Err(QuorumClearError::BatchAlreadyProcessed(batch_id));
            }
            BatchState::Finalized => {}
        }

        let net_flow = result.net_flow()?;
        let plan = plan_net_swap(net_flow)?;

        let mut report = SettlementReport {
            batch_id,
            net_flow,
            ..SettlementReport::default()
        };
        let mut staged = Self::stage_matched(intents, batch_id, result, &mut report);

        ledger.begin()?;
        let settled = self.run_transaction(
            intents,
            ledger,
            cipher,
            batch_id,
            result,
            plan,
            &mut staged,
            &mut report,
        );
        if let Err(err) = settled.and_then(|()| ledger.commit()) {
            ledger.rollback();
            tracing::warn!(batch = batch_id.0, error = %err, "Settlement rolled back");
            return Err(err);
        }

        for (index, resolution) in staged {
            intents.mark_processed(batch_id, index, resolution)?;
        }
        intents.mark_batch_processed(batch_id)?;

        tracing::info!(
            batch = batch_id.0,
            matched = report.matched.len(),
            fallback = report.fallback.len(),
            voided = report.voided.len(),
            skipped = report.skipped.len(),
            net_a = report.net_flow.asset_a,
            net_b = report.net_flow.asset_b,
            "Batch settled"
        );
        Ok(report)
    }

    /// Bounds-check matched indices without touching the intent ledger.
    fn stage_matched(
        intents: &IntentLedger,
        batch_id: BatchId,
        result: &BatchResult,
        report: &mut SettlementReport,
    ) -> BTreeMap<u64, IntentResolution> {
        let size = intents.size(batch_id) as u64;
        let mut staged = BTreeMap::new();
        for &index in &result.matched_indices {
            let outcome = if index >= size {
                IndexOutcome::Skipped(SkipReason::OutOfRange)
            } else if staged.contains_key(&index) || intents.is_processed(batch_id, index) {
                IndexOutcome::Skipped(SkipReason::AlreadyProcessed)
            } else {
                staged.insert(index, IntentResolution::Matched);
                IndexOutcome::Applied
            };
            match outcome {
                IndexOutcome::Applied => report.matched.push(index),
                IndexOutcome::Skipped(reason) => {
                    tracing::warn!(batch = batch_id.0, index, ?reason, "Matched index skipped");
                    report.skipped.push((index, reason));
                }
            }
        }
        staged
    }

    #[allow(clippy::too_many_arguments)]
    fn run_transaction<L: Ledger + ?Sized>(
        &self,
        intents: &IntentLedger,
        ledger: &mut L,
        cipher: &dyn IntentCipher,
        batch_id: BatchId,
        result: &BatchResult,
        plan: NetSwap,
        staged: &mut BTreeMap<u64, IntentResolution>,
        report: &mut SettlementReport,
    ) -> Result<()> {
        for settlement in &result.settlements {
            for (asset, flow) in [
                (AssetKind::A, settlement.asset_a_flow),
                (AssetKind::B, settlement.asset_b_flow),
            ] {
                if flow < 0 {
                    ledger.take(asset, settlement.owner, flow.unsigned_abs())?;
                }
            }
        }

        let delta = match plan.direction() {
            None => SwapDelta::default(),
            Some(direction) => {
                let limit =
                    plan.price_limit(result.clearing_price, self.config.net_swap_slippage_bps);
                let delta = ledger.swap(direction, plan.amount_a(), limit)?;
                report.net_swap = Some(delta);
                delta
            }
        };
        report.retained = verify_coverage(report.net_flow, delta)?;

        for settlement in &result.settlements {
            for (asset, flow) in [
                (AssetKind::A, settlement.asset_a_flow),
                (AssetKind::B, settlement.asset_b_flow),
            ] {
                if flow > 0 {
                    ledger.transfer(asset, settlement.owner, flow.unsigned_abs())?;
                }
            }
        }

        let fallback = FallbackExecutor::new(cipher);
        let record = intents.record(batch_id)?;
        for (index, intent) in (0u64..).zip(record.intents()) {
            if staged.contains_key(&index) || intents.is_processed(batch_id, index) {
                continue;
            }
            let resolution = fallback.execute(ledger, batch_id, index, intent)?;
            if resolution == IntentResolution::FallbackExecuted {
                report.fallback.push(index);
            } else {
                report.voided.push(index);
            }
            staged.insert(index, resolution);
        }
        Ok(())
    }
}
