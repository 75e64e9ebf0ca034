//! Net-flow planning and conservation.
//!
//! A batch result's settlements sum to a [`NetFlow`]: what the batch owes
//! its owners beyond what it collects from them. Only that residual touches
//! venue liquidity, through at most one swap.
//!
//! Conservation invariant, checked after the swap and before any payout:
//! ```text
//! ∀ asset: swap_delta(asset) ≥ net_flow(asset)
//! ```
//! The difference is rounding dust kept by the settlement account.

use quorumclear_types::{Direction, NetFlow, Price, QuorumClearError, Result};

use crate::SwapDelta;

/// The single venue trade a batch needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetSwap {
    /// Flows are covered by what was collected.
    None,
    /// Surplus A is sold to cover a B deficit.
    Sell { amount_a: u128 },
    /// Surplus B buys the A deficit.
    Buy { amount_a: u128 },
}

impl NetSwap {
    #[must_use]
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Self::None => None,
            Self::Sell { .. } => Some(Direction::Sell),
            Self::Buy { .. } => Some(Direction::Buy),
        }
    }

    /// Asset A amount traded; zero for [`NetSwap::None`].
    #[must_use]
    pub fn amount_a(&self) -> u128 {
        match self {
            Self::None => 0,
            Self::Sell { amount_a } | Self::Buy { amount_a } => *amount_a,
        }
    }

    /// Limit for the swap: the clearing price moved `slippage_bps` against
    /// the batch.
    #[must_use]
    pub fn price_limit(&self, clearing_price: Price, slippage_bps: u16) -> Price {
        let bps = i32::from(slippage_bps);
        match self {
            Self::None => Price::ZERO,
            Self::Sell { .. } => clearing_price.shifted_bps(-bps),
            Self::Buy { .. } => clearing_price.shifted_bps(bps),
        }
    }
}

/// Decide which swap covers a net flow.
///
/// A positive component is a deficit. A deficit in A is bought with B; a
/// deficit in B alone is covered by selling the A surplus. Deficits in
/// both assets, or a B deficit with no A to sell, cannot be covered.
///
/// # Errors
/// `NetFlowUncovered` for an uncoverable flow.
pub fn plan_net_swap(net: NetFlow) -> Result<NetSwap> {
    let uncovered = || QuorumClearError::NetFlowUncovered {
        asset_a: net.asset_a,
        asset_b: net.asset_b,
    };
    if net.asset_a > 0 && net.asset_b > 0 {
        return Err(uncovered());
    }
    if net.asset_a > 0 {
        return Ok(NetSwap::Buy {
            amount_a: net.asset_a.unsigned_abs(),
        });
    }
    if net.asset_b > 0 {
        if net.asset_a == 0 {
            return Err(uncovered());
        }
        return Ok(NetSwap::Sell {
            amount_a: net.asset_a.unsigned_abs(),
        });
    }
    Ok(NetSwap::None)
}

/// Check that the swap covered the net flow and return what is left over.
///
/// # Errors
/// `LedgerShortfall` if either asset is still short.
pub fn verify_coverage(net: NetFlow, delta: SwapDelta) -> Result<NetFlow> {
    let residual = NetFlow {
        asset_a: delta
            .delta_a
            .checked_sub(net.asset_a)
            .ok_or(QuorumClearError::ArithmeticOverflow {
                context: "residual A",
            })?,
        asset_b: delta
            .delta_b
            .checked_sub(net.asset_b)
            .ok_or(QuorumClearError::ArithmeticOverflow {
                context: "residual B",
            })?,
    };
    if residual.asset_a < 0 || residual.asset_b < 0 {
        return Err(QuorumClearError::LedgerShortfall {
            reason: format!(
                "net flow ({}, {}) not covered by swap ({}, {})",
                net.asset_a, net.asset_b, delta.delta_a, delta.delta_b
            ),
        });
    }
    Ok(residual)
}
