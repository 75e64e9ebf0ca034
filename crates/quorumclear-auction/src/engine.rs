//! Pure deterministic batch auction.
//!
//! ```text
//! AuctionEngine::run(batch_id, &[PlainIntent]) -> AuctionOutcome
//! ```
//!
//! ## Fill rules
//!
//! Both rules fill at most `matchable_volume` on each side.
//!
//! - **First-come-first-served** (default): walk intents in arrival order,
//!   each taking `min(amount, remaining side volume)`. Early intents fill
//!   completely; later ones may get a partial or zero fill.
//! - **Pro-rata**: each intent gets `floor(amount * matchable / side_total)`,
//!   independent of position. Rounding dust is left unmatched.
//!
//! ## Rounding
//!
//! Asset B amounts are quoted at the clearing price, floored for sellers
//! (who receive B) and rounded up for buyers (who pay B). The batch never
//! owes more B than it collects.

use quorumclear_types::{
    AuctionConfig, BatchId, BatchResult, Direction, Intent, IntentCipher, MatchingRule,
    QuorumClearError, Result, Settlement,
};

use crate::{
    ClearingResult, PlainIntent, compute_clearing, decode::decode_batch,
    determinism::compute_result_hash,
};

/// Everything a quorum member needs to approve a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionOutcome {
    pub batch_id: BatchId,
    pub result: BatchResult,
    pub result_hash: [u8; 32],
    pub clearing: ClearingResult,
    /// Decoded intents that received no fill, in arrival order.
    pub unmatched: Vec<u64>,
}

/// Stateless auction engine parameterized by its fill rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuctionEngine {
    rule: MatchingRule,
}

impl AuctionEngine {
    #[must_use]
    pub fn new(config: AuctionConfig) -> Self {
        Self {
            rule: config.matching_rule,
        }
    }

    #[must_use]
    pub fn rule(&self) -> MatchingRule {
        self.rule
    }

    /// Decrypt a finalized batch and run the auction over what decodes.
    ///
    /// # Errors
    /// See [`AuctionEngine::run`].
    pub fn run_sealed(
        &self,
        batch_id: BatchId,
        intents: &[Intent],
        cipher: &dyn IntentCipher,
    ) -> Result<AuctionOutcome> {
        let decoded = decode_batch(intents, cipher);
        self.run(batch_id, &decoded.intents)
    }

    /// Run the auction over decrypted intents in arrival order.
    ///
    /// ## Algorithm
    ///
    /// 1. Compute side totals, clearing price and matchable volume
    /// 2. Assign each intent a fill under the configured rule
    /// 3. Turn every nonzero fill into a [`Settlement`] and record its index
    /// 4. Hash the result for cross-member verification
    ///
    /// # Errors
    /// `ArithmeticOverflow` if any volume, product or flow leaves its type.
    pub fn run(&self, batch_id: BatchId, intents: &[PlainIntent]) -> Result<AuctionOutcome> {
        let clearing = compute_clearing(intents)?;
        let price = clearing.clearing_price;

        let mut settlements = Vec::new();
        let mut matched_indices = Vec::new();
        let mut unmatched = Vec::new();
        let mut remaining_buy = clearing.matchable_volume;
        let mut remaining_sell = clearing.matchable_volume;

        for intent in intents {
            let direction = intent.params.direction;
            let fill = match self.rule {
                MatchingRule::FirstComeFirstServed => {
                    let remaining = match direction {
                        Direction::Buy => &mut remaining_buy,
                        Direction::Sell => &mut remaining_sell,
                    };
                    let fill = intent.params.amount.min(*remaining);
                    *remaining -= fill;
                    fill
                }
                MatchingRule::ProRata => pro_rata_fill(intent.params.amount, &clearing, direction)?,
            };

            if fill == 0 {
                unmatched.push(intent.index);
                continue;
            }

            let fill_flow = to_flow(fill)?;
            let (asset_a_flow, asset_b_flow) = match direction {
                Direction::Sell => (-fill_flow, to_flow(price.quote(fill)?)?),
                Direction::Buy => (fill_flow, -to_flow(price.quote_ceil(fill)?)?),
            };
            tracing::debug!(
                batch = batch_id.0,
                index = intent.index,
                side = %direction,
                fill,
                requested = intent.params.amount,
                "Intent filled"
            );
            settlements.push(Settlement {
                owner: intent.owner,
                asset_a_flow,
                asset_b_flow,
            });
            matched_indices.push(intent.index);
        }

        let result = BatchResult {
            settlements,
            matched_indices,
            clearing_price: price,
        };
        let result_hash = compute_result_hash(batch_id, &result);

        tracing::info!(
            batch = batch_id.0,
            clearing_price = %price,
            matchable = clearing.matchable_volume,
            matched = result.matched_indices.len(),
            unmatched = unmatched.len(),
            result_hash = hex::encode(&result_hash[..8]),
            "Auction cleared"
        );

        Ok(AuctionOutcome {
            batch_id,
            result,
            result_hash,
            clearing,
            unmatched,
        })
    }
}

fn pro_rata_fill(amount: u128, clearing: &ClearingResult, direction: Direction) -> Result<u128> {
    let side_total = clearing.side_total(direction);
    if side_total == 0 || !clearing.crosses() {
        return Ok(0);
    }
    amount
        .checked_mul(clearing.matchable_volume)
        .map(|scaled| scaled / side_total)
        .ok_or(QuorumClearError::ArithmeticOverflow {
            context: "pro-rata fill",
        })
}

fn to_flow(amount: u128) -> Result<i128> {
    i128::try_from(amount).map_err(|_| QuorumClearError::ArithmeticOverflow {
        context: "settlement flow",
    })
}

#[cfg(test)]
mod tests {
    use quorumclear_types::{IntentParams, NetFlow, OwnerId, Price, SCALE};
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;

    fn plain(index: u64, params: IntentParams) -> PlainIntent {
        PlainIntent {
            index,
            owner: OwnerId::from_bytes([index as u8 + 1; 16]),
            params,
        }
    }

    fn fcfs() -> AuctionEngine {
        AuctionEngine::default()
    }

    fn pro_rata() -> AuctionEngine {
        AuctionEngine::new(AuctionConfig {
            matching_rule: MatchingRule::ProRata,
        })
    }

    #[test]
    fn empty_batch_produces_empty_result() {
        let outcome = fcfs().run(BatchId(0), &[]).unwrap();
        assert!(outcome.result.settlements.is_empty());
        assert!(outcome.result.matched_indices.is_empty());
        assert_eq!(outcome.result.clearing_price, Price::ONE);
    }

    #[test]
    fn one_sided_batch_matches_nothing() {
        let intents: Vec<_> = (0..3).map(|i| plain(i, IntentParams::sell(10))).collect();
        let outcome = fcfs().run(BatchId(0), &intents).unwrap();
        assert!(outcome.result.matched_indices.is_empty());
        assert_eq!(outcome.unmatched, vec![0, 1, 2]);
    }

    #[test]
    fn balanced_pair_nets_to_zero() {
        let intents = vec![
            plain(0, IntentParams::sell(100)),
            plain(1, IntentParams::buy(100)),
        ];
        let outcome = fcfs().run(BatchId(0), &intents).unwrap();
        assert_eq!(outcome.result.matched_indices, vec![0, 1]);
        let s = &outcome.result.settlements;
        assert_eq!((s[0].asset_a_flow, s[0].asset_b_flow), (-100, 100));
        assert_eq!((s[1].asset_a_flow, s[1].asset_b_flow), (100, -100));
        assert!(outcome.result.net_flow().unwrap().is_zero());
    }

    #[test]
    fn fcfs_fills_in_arrival_order() {
        // Sell 10 vs buys 6, 6 → matchable 10; second buy gets 4.
        let intents = vec![
            plain(0, IntentParams::buy(6)),
            plain(1, IntentParams::sell(10)),
            plain(2, IntentParams::buy(6)),
        ];
        let outcome = fcfs().run(BatchId(0), &intents).unwrap();
        let flows: Vec<i128> = outcome
            .result
            .settlements
            .iter()
            .map(|s| s.asset_a_flow)
            .collect();
        assert_eq!(flows, vec![6, -10, 4]);
        assert_eq!(outcome.result.matched_indices, vec![0, 1, 2]);
    }

    #[test]
    fn fcfs_late_intent_gets_zero_fill() {
        let intents = vec![
            plain(0, IntentParams::sell(5)),
            plain(1, IntentParams::buy(5)),
            plain(2, IntentParams::sell(5)),
        ];
        let outcome = fcfs().run(BatchId(0), &intents).unwrap();
        assert_eq!(outcome.result.matched_indices, vec![0, 1]);
        assert_eq!(outcome.unmatched, vec![2]);
    }

    #[test]
    fn pro_rata_scales_by_share() {
        // Sells 30 + 10 vs buy 20 → matchable 20; sells fill 15 and 5.
        let intents = vec![
            plain(0, IntentParams::sell(30)),
            plain(1, IntentParams::sell(10)),
            plain(2, IntentParams::buy(20)),
        ];
        let outcome = pro_rata().run(BatchId(0), &intents).unwrap();
        let flows: Vec<i128> = outcome
            .result
            .settlements
            .iter()
            .map(|s| s.asset_a_flow)
            .collect();
        assert_eq!(flows, vec![-15, -5, 20]);
        assert!(outcome.unmatched.is_empty());
    }

    #[test]
    fn pro_rata_floors_tiny_shares_to_zero() {
        // Sells 1 + 99 vs buy 1 → share of the first sell floors to 0.
        let intents = vec![
            plain(0, IntentParams::sell(1)),
            plain(1, IntentParams::sell(99)),
            plain(2, IntentParams::buy(1)),
        ];
        let outcome = pro_rata().run(BatchId(0), &intents).unwrap();
        assert_eq!(outcome.unmatched, vec![0, 1]);
        assert_eq!(outcome.result.matched_indices, vec![2]);
    }

    #[test]
    fn rules_differ_on_same_batch() {
        let intents = vec![
            plain(0, IntentParams::sell(10)),
            plain(1, IntentParams::sell(10)),
            plain(2, IntentParams::buy(10)),
        ];
        let a = fcfs().run(BatchId(0), &intents).unwrap();
        let b = pro_rata().run(BatchId(0), &intents).unwrap();
        assert_ne!(a.result_hash, b.result_hash);
        assert_eq!(a.result.matched_indices, vec![0, 2]);
        assert_eq!(b.result.matched_indices, vec![0, 1, 2]);
    }

    #[test]
    fn buyers_round_up_sellers_round_down() {
        // Price = 2/3: the seller of 2 receives 1 B, the buyer of 2 pays 2 B.
        let intents = vec![
            plain(0, IntentParams::sell(2)),
            plain(1, IntentParams::buy(3)),
        ];
        let outcome = fcfs().run(BatchId(0), &intents).unwrap();
        assert_eq!(outcome.clearing.clearing_price, Price(SCALE * 2 / 3));
        let net = outcome.result.net_flow().unwrap();
        assert_eq!(net.asset_a, 0);
        assert!(net.asset_b <= 0, "batch must never owe asset B: {net:?}");
    }

    #[test]
    fn run_sealed_skips_undecodable() {
        use chrono::Utc;
        use quorumclear_types::{Ciphertext, TransparentCipher};

        let intents = vec![
            Intent::new(
                OwnerId::new(),
                TransparentCipher.encrypt(&IntentParams::sell(10)).unwrap(),
                Utc::now(),
            ),
            Intent::new(OwnerId::new(), Ciphertext(vec![1, 2, 3]), Utc::now()),
            Intent::new(
                OwnerId::new(),
                TransparentCipher.encrypt(&IntentParams::buy(10)).unwrap(),
                Utc::now(),
            ),
        ];
        let outcome = fcfs()
            .run_sealed(BatchId(4), &intents, &TransparentCipher)
            .unwrap();
        assert_eq!(outcome.result.matched_indices, vec![0, 2]);
    }

    #[test]
    fn overflow_is_error() {
        let intents = vec![
            plain(0, IntentParams::sell(u128::MAX)),
            plain(1, IntentParams::buy(1)),
        ];
        assert!(matches!(
            fcfs().run(BatchId(0), &intents),
            Err(QuorumClearError::ArithmeticOverflow { .. })
        ));
    }

    #[test]
    fn randomized_batches_are_deterministic() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for round in 0..50 {
            let n = rng.gen_range(0..40);
            let intents: Vec<_> = (0..n)
                .map(|i| {
                    let amount = rng.gen_range(1..1_000_000u128);
                    let params = if rng.gen_bool(0.5) {
                        IntentParams::buy(amount)
                    } else {
                        IntentParams::sell(amount)
                    };
                    plain(i, params)
                })
                .collect();
            for engine in [fcfs(), pro_rata()] {
                let first = engine.run(BatchId(round), &intents).unwrap();
                let second = engine.run(BatchId(round), &intents).unwrap();
                assert_eq!(first, second);

                let net = NetFlow::from_settlements(&first.result.settlements).unwrap();
                assert!(net.asset_b <= 0 || net.asset_a != 0, "round {round}: {net:?}");
                for s in &first.result.settlements {
                    assert_ne!(s.asset_a_flow, 0);
                }
            }
        }
    }
}
