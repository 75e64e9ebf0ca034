//! The auction house facade.
//!
//! Owns the intent ledger, the scheduler, the verifier and the settlement
//! coordinator, plus the injected collaborators (venue, cipher, clock).
//! Every mutation takes `&mut self`, so a single writer is enforced by the
//! borrow checker; wrap the house in a mutex to share it across threads.

use std::sync::Arc;

use quorumclear_auction::compute_result_hash;
use quorumclear_ingress::{Admission, BatchScheduler, IntentLedger};
use quorumclear_quorum::{Ed25519Membership, ResultVerifier, build_verifier};
use quorumclear_settlement::{Ledger, SettlementCoordinator, SettlementReport};
use quorumclear_types::{
    Approval, BatchFinalized, BatchId, BatchResult, BatchState, BatchSummary, Ciphertext, Clock,
    EngineConfig, Intent, IntentCipher, IntentResolution, OwnerId, QuorumClearError, Result,
    ResultMessage,
};

/// Confidential batch auction engine.
pub struct AuctionHouse<L, C> {
    config: EngineConfig,
    intents: IntentLedger,
    scheduler: BatchScheduler,
    verifier: Box<dyn ResultVerifier>,
    coordinator: SettlementCoordinator,
    ledger: L,
    cipher: C,
    clock: Arc<dyn Clock>,
}

impl<L: Ledger, C: IntentCipher> AuctionHouse<L, C> {
    /// Build a house with an explicit verifier. Batch 0 opens at `clock.now()`.
    ///
    /// # Errors
    /// `Configuration` for an invalid config.
    pub fn new(
        config: EngineConfig,
        verifier: Box<dyn ResultVerifier>,
        ledger: L,
        cipher: C,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let mut intents = IntentLedger::new();
        let scheduler = BatchScheduler::new(config.scheduler.clone(), &mut intents, clock.now())?;
        let coordinator = SettlementCoordinator::new(config.settlement.clone());
        tracing::info!(
            version = quorumclear_types::constants::VERSION,
            max_batch_size = config.scheduler.max_batch_size,
            matching_rule = ?config.auction.matching_rule,
            "Auction house started"
        );
        Ok(Self {
            config,
            intents,
            scheduler,
            verifier,
            coordinator,
            ledger,
            cipher,
            clock,
        })
    }

    /// Build a house whose verifier follows `config.quorum` over `membership`.
    ///
    /// # Errors
    /// `Configuration` for an invalid config.
    pub fn with_membership(
        config: EngineConfig,
        membership: Ed25519Membership,
        ledger: L,
        cipher: C,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let verifier = build_verifier(&config.quorum, membership)?;
        Self::new(config, verifier, ledger, cipher, clock)
    }

    // ------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------

    /// Append an encrypted intent to the open batch.
    ///
    /// # Errors
    /// `EmptyCiphertext`.
    pub fn submit(&mut self, owner: OwnerId, ciphertext: Ciphertext) -> Result<Admission> {
        let now = self.clock.now();
        self.scheduler
            .submit(&mut self.intents, owner, ciphertext, now)
    }

    /// Re-evaluate the age trigger without submitting.
    pub fn check_triggers(&mut self) -> Result<Option<BatchFinalized>> {
        let now = self.clock.now();
        self.scheduler.check_triggers(&mut self.intents, now)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn get_batch(&self, batch_id: BatchId) -> Result<BatchSummary> {
        self.intents.summary(batch_id)
    }

    pub fn get_intents(&self, batch_id: BatchId) -> Result<&[Intent]> {
        self.intents.get(batch_id)
    }

    #[must_use]
    pub fn current_batch_id(&self) -> BatchId {
        self.scheduler.current_batch_id()
    }

    #[must_use]
    pub fn current_batch_size(&self) -> usize {
        self.intents.size(self.current_batch_id())
    }

    /// Whether the batch has left the OPEN state.
    #[must_use]
    pub fn is_finalized(&self, batch_id: BatchId) -> bool {
        self.intents
            .summary(batch_id)
            .is_ok_and(|s| s.is_finalized())
    }

    #[must_use]
    pub fn is_processed(&self, batch_id: BatchId, index: u64) -> bool {
        self.intents.is_processed(batch_id, index)
    }

    #[must_use]
    pub fn resolution(&self, batch_id: BatchId, index: u64) -> Option<&IntentResolution> {
        self.intents.resolution(batch_id, index)
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    #[must_use]
    pub fn cipher(&self) -> &C {
        &self.cipher
    }

    // ------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------

    /// The message quorum members must sign for `result` on `batch_id`.
    ///
    /// # Errors
    /// `UnknownBatch`, or `BatchNotFinalized` while the batch is open.
    pub fn result_message(&self, batch_id: BatchId, result: &BatchResult) -> Result<ResultMessage> {
        Ok(ResultMessage {
            batch_id,
            intents_hash: self.intents.intents_hash(batch_id)?,
            result_hash: compute_result_hash(batch_id, result),
        })
    }

    /// Verify a quorum result and settle the batch with it.
    ///
    /// # Errors
    /// - state errors if the batch is open, unknown, or already processed
    /// - authorization errors from the verifier (no state change)
    /// - data and ledger errors from settlement (rolled back)
    pub fn submit_result(
        &mut self,
        batch_id: BatchId,
        result: &BatchResult,
        approvals: &[Approval],
    ) -> Result<SettlementReport> {
        self.ensure_settleable(batch_id)?;
        let message = self.result_message(batch_id, result)?;
        if let Err(err) = self.verifier.accept(&message, approvals) {
            tracing::warn!(batch = batch_id.0, error = %err, "Result rejected");
            return Err(err);
        }
        tracing::info!(
            batch = batch_id.0,
            approvals = approvals.len(),
            result_hash = hex::encode(&message.result_hash[..8]),
            "Result accepted"
        );
        self.coordinator.apply(
            &mut self.intents,
            &mut self.ledger,
            &self.cipher,
            batch_id,
            result,
        )
    }

    // ------------------------------------------------------------------
    // Operator surface
    // ------------------------------------------------------------------

    /// Close the open batch below both thresholds.
    ///
    /// # Errors
    /// `NotOperator`, `NothingToFinalize`.
    pub fn force_finalize(&mut self, caller: OwnerId) -> Result<BatchFinalized> {
        self.require_operator(caller)?;
        let now = self.clock.now();
        self.scheduler.force_finalize(&mut self.intents, now)
    }

    /// Settle a stalled batch entirely through fallback.
    ///
    /// Allowed once the batch has been finalized for `force_complete_after`.
    ///
    /// # Errors
    /// `NotOperator`, state errors, `ForceCompleteTooEarly`, ledger errors.
    pub fn force_complete(
        &mut self,
        caller: OwnerId,
        batch_id: BatchId,
    ) -> Result<SettlementReport> {
        self.require_operator(caller)?;
        self.ensure_settleable(batch_id)?;

        let summary = self.intents.summary(batch_id)?;
        let finalized_at = summary
            .finalized_at
            .ok_or(QuorumClearError::BatchNotFinalized(batch_id))?;
        let wait = chrono::TimeDelta::from_std(self.config.settlement.force_complete_after)
            .map_err(|e| QuorumClearError::Configuration(format!("force_complete_after: {e}")))?;
        // A deadline past the calendar's end is never reached.
        let remaining = finalized_at
            .checked_add_signed(wait)
            .map_or(wait, |deadline| deadline - self.clock.now());
        if remaining > chrono::TimeDelta::zero() {
            return Err(QuorumClearError::ForceCompleteTooEarly {
                batch: batch_id,
                remaining_secs: remaining.num_seconds().max(1),
            });
        }

        tracing::warn!(batch = batch_id.0, size = summary.size, "Force completing batch");
        self.coordinator.apply(
            &mut self.intents,
            &mut self.ledger,
            &self.cipher,
            batch_id,
            &BatchResult::fallback_only(),
        )
    }

    fn require_operator(&self, caller: OwnerId) -> Result<()> {
        match self.config.operator {
            Some(operator) if operator == caller => Ok(()),
            _ => Err(QuorumClearError::NotOperator(caller)),
        }
    }

    fn ensure_settleable(&self, batch_id: BatchId) -> Result<()> {
        match self.intents.record(batch_id)?.state {
            BatchState::Open => Err(QuorumClearError::BatchNotFinalized(batch_id)),
            BatchState::Processed => Err(QuorumClearError::BatchAlreadyProcessed(batch_id)),
            BatchState::Finalized => Ok(()),
        }
    }
}

impl<L, C> std::fmt::Debug for AuctionHouse<L, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuctionHouse")
            .field("current_batch", &self.scheduler.current_batch_id())
            .field("batches", &self.intents.batch_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use quorumclear_quorum::QuorumSigner;
    use quorumclear_settlement::InMemoryLedger;
    use quorumclear_types::{
        IntentParams, ManualClock, Price, QuorumScheme, SchedulerConfig, TransparentCipher,
    };

    use super::*;
    use crate::ComputeNode;

    struct Harness {
        house: AuctionHouse<InMemoryLedger, TransparentCipher>,
        clock: ManualClock,
        nodes: Vec<ComputeNode>,
        operator: OwnerId,
    }

    fn harness(max_batch_size: usize) -> Harness {
        let clock = ManualClock::at_epoch();
        let nodes: Vec<_> = (1..=3u8)
            .map(|i| ComputeNode::new(Default::default(), QuorumSigner::from_seed([i; 32])))
            .collect();
        let mut membership = Ed25519Membership::new();
        for n in &nodes {
            membership.insert(n.signer().verifying_key(), 1);
        }
        let operator = OwnerId::new();
        let config = EngineConfig {
            scheduler: SchedulerConfig {
                max_batch_size,
                ..SchedulerConfig::default()
            },
            operator: Some(operator),
            ..EngineConfig::default()
        };
        let ledger = InMemoryLedger::new(Price::ONE).with_liquidity(1_000_000, 1_000_000);
        let house = AuctionHouse::with_membership(
            config,
            membership,
            ledger,
            TransparentCipher,
            Arc::new(clock.clone()),
        )
        .unwrap();
        Harness {
            house,
            clock,
            nodes,
            operator,
        }
    }

    fn submit(h: &mut Harness, params: IntentParams) -> OwnerId {
        let owner = OwnerId::new();
        h.house
            .ledger_mut()
            .deposit(owner, quorumclear_types::AssetKind::A, 1_000)
            .unwrap();
        h.house
            .ledger_mut()
            .deposit(owner, quorumclear_types::AssetKind::B, 1_000)
            .unwrap();
        let ct = TransparentCipher.encrypt(&params).unwrap();
        h.house.submit(owner, ct).unwrap();
        owner
    }

    fn approvals(h: &Harness, batch: BatchId, n: usize) -> (BatchResult, Vec<Approval>) {
        let intents = h.house.get_intents(batch).unwrap();
        let proposals: Vec<_> = h.nodes[..n]
            .iter()
            .map(|node| node.propose(batch, intents, &TransparentCipher).unwrap())
            .collect();
        let result = proposals[0].result.clone();
        (result, proposals.into_iter().map(|p| p.approval).collect())
    }

    #[test]
    fn quorum_result_settles_batch() {
        let mut h = harness(2);
        submit(&mut h, IntentParams::sell(10));
        submit(&mut h, IntentParams::buy(10));
        assert!(h.house.is_finalized(BatchId(0)));

        let (result, approvals) = approvals(&h, BatchId(0), 2);
        let report = h.house.submit_result(BatchId(0), &result, &approvals).unwrap();
        assert_eq!(report.matched, vec![0, 1]);
        assert!(h.house.get_batch(BatchId(0)).unwrap().is_processed());
    }

    #[test]
    fn single_approval_rejected_without_state_change() {
        let mut h = harness(2);
        submit(&mut h, IntentParams::sell(10));
        submit(&mut h, IntentParams::buy(10));
        let (result, approvals) = approvals(&h, BatchId(0), 1);
        assert_eq!(
            h.house
                .submit_result(BatchId(0), &result, &approvals)
                .unwrap_err(),
            QuorumClearError::InsufficientApprovals { needed: 2, got: 1 }
        );
        assert!(!h.house.is_processed(BatchId(0), 0));
    }

    #[test]
    fn result_for_open_batch_rejected() {
        let mut h = harness(10);
        submit(&mut h, IntentParams::sell(10));
        let err = h
            .house
            .submit_result(BatchId(0), &BatchResult::fallback_only(), &[])
            .unwrap_err();
        assert_eq!(err, QuorumClearError::BatchNotFinalized(BatchId(0)));
    }

    #[test]
    fn operator_gates() {
        let mut h = harness(10);
        submit(&mut h, IntentParams::sell(10));
        let stranger = OwnerId::new();
        assert_eq!(
            h.house.force_finalize(stranger).unwrap_err(),
            QuorumClearError::NotOperator(stranger)
        );
        let event = h.house.force_finalize(h.operator).unwrap();
        assert_eq!(event.batch_id, BatchId(0));
        assert_eq!(
            h.house.force_complete(stranger, BatchId(0)).unwrap_err(),
            QuorumClearError::NotOperator(stranger)
        );
    }

    #[test]
    fn force_complete_waits_then_falls_back() {
        let mut h = harness(1);
        let owner = submit(&mut h, IntentParams::sell(10));
        h.clock.advance_secs(10);
        let err = h.house.force_complete(h.operator, BatchId(0)).unwrap_err();
        assert_eq!(
            err,
            QuorumClearError::ForceCompleteTooEarly {
                batch: BatchId(0),
                remaining_secs: 3_590
            }
        );

        h.clock.advance(chrono::Duration::seconds(3_590));
        let report = h.house.force_complete(h.operator, BatchId(0)).unwrap();
        assert_eq!(report.fallback, vec![0]);
        assert_eq!(
            h.house
                .ledger()
                .balance(owner, quorumclear_types::AssetKind::B),
            1_010
        );
        assert_eq!(
            h.house.force_complete(h.operator, BatchId(0)).unwrap_err(),
            QuorumClearError::BatchAlreadyProcessed(BatchId(0))
        );
    }

    #[test]
    fn stake_weighted_config_builds_stake_verifier() {
        let small = QuorumSigner::from_seed([8; 32]);
        let large = QuorumSigner::from_seed([9; 32]);
        let mut membership = Ed25519Membership::new();
        membership.insert(small.verifying_key(), 5);
        membership.insert(large.verifying_key(), 7);
        let mut config = EngineConfig::default();
        config.scheduler.max_batch_size = 1;
        config.quorum.scheme = QuorumScheme::StakeWeighted { min_stake: 10 };
        let mut house = AuctionHouse::with_membership(
            config,
            membership,
            InMemoryLedger::new(Price::ONE),
            TransparentCipher,
            Arc::new(ManualClock::at_epoch()),
        )
        .unwrap();
        house.submit(OwnerId::new(), Ciphertext(vec![1])).unwrap();

        let result = BatchResult::fallback_only();
        let message = house.result_message(BatchId(0), &result).unwrap();
        let err = house
            .submit_result(BatchId(0), &result, &[small.approve(&message)])
            .unwrap_err();
        assert_eq!(err, QuorumClearError::InsufficientStake { needed: 10, got: 5 });
        assert!(!house.is_processed(BatchId(0), 0));

        let both = [small.approve(&message), large.approve(&message)];
        let report = house.submit_result(BatchId(0), &result, &both).unwrap();
        assert_eq!(report.voided, vec![0]);
        assert!(house.get_batch(BatchId(0)).unwrap().is_processed());
    }

    #[test]
    fn force_paths_closed_without_operator() {
        let mut house = AuctionHouse::with_membership(
            EngineConfig::default(),
            Ed25519Membership::new(),
            InMemoryLedger::new(Price::ONE),
            TransparentCipher,
            Arc::new(ManualClock::at_epoch()),
        )
        .unwrap();
        house.submit(OwnerId::new(), Ciphertext(vec![1])).unwrap();
        let anyone = OwnerId::new();
        assert_eq!(
            house.force_finalize(anyone).unwrap_err(),
            QuorumClearError::NotOperator(anyone)
        );
    }

    #[test]
    fn force_complete_with_unreachable_deadline() {
        let mut h = harness(1);
        submit(&mut h, IntentParams::sell(5));
        // About 200 million years: fits a TimeDelta, not a DateTime.
        h.house.config.settlement.force_complete_after =
            Duration::from_secs(200_000_000 * 365 * 86_400);
        h.clock.advance_secs(1_000_000);
        assert!(matches!(
            h.house.force_complete(h.operator, BatchId(0)).unwrap_err(),
            QuorumClearError::ForceCompleteTooEarly { .. }
        ));
        assert!(!h.house.is_processed(BatchId(0), 0));
    }
}
