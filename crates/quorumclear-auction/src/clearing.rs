//! Clearing price computation for batch auctions.
//!
//! The price is the ratio of total sell volume to total buy volume, so it
//! depends only on the aggregate of the batch and never on arrival order.
//! Same inputs → same price.

use quorumclear_types::{Direction, Price, QuorumClearError, Result};

use crate::PlainIntent;

/// Aggregates of one batch and the price they clear at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearingResult {
    /// Uniform clearing price. [`Price::ONE`] when a side is empty.
    pub clearing_price: Price,
    pub total_buy: u128,
    pub total_sell: u128,
    /// `min(total_buy, total_sell)`: volume each side can fill.
    pub matchable_volume: u128,
}

impl ClearingResult {
    /// Whether any volume can be matched at all.
    #[must_use]
    pub fn crosses(&self) -> bool {
        self.matchable_volume > 0
    }

    /// Total requested volume on one side.
    #[must_use]
    pub fn side_total(&self, direction: Direction) -> u128 {
        match direction {
            Direction::Buy => self.total_buy,
            Direction::Sell => self.total_sell,
        }
    }
}

/// Compute the uniform clearing price and matchable volume.
///
/// Algorithm:
/// 1. Sum the amounts of sell intents and of buy intents
/// 2. If both sums are nonzero, `price = sell * SCALE / buy`; otherwise 1:1
/// 3. Matchable volume = the smaller sum
///
/// # Errors
/// `ArithmeticOverflow` if a side total or the scaled ratio leaves `u128`.
pub fn compute_clearing(intents: &[PlainIntent]) -> Result<ClearingResult> {
    let mut total_buy: u128 = 0;
    let mut total_sell: u128 = 0;
    for intent in intents {
        let total = match intent.params.direction {
            Direction::Buy => &mut total_buy,
            Direction::Sell => &mut total_sell,
        };
        *total = total
            .checked_add(intent.params.amount)
            .ok_or(QuorumClearError::ArithmeticOverflow {
                context: "side volume",
            })?;
    }

    let clearing_price = if total_buy > 0 && total_sell > 0 {
        Price::ratio(total_sell, total_buy)?
    } else {
        Price::ONE
    };

    Ok(ClearingResult {
        clearing_price,
        total_buy,
        total_sell,
        matchable_volume: total_buy.min(total_sell),
    })
}
