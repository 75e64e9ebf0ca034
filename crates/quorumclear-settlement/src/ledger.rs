//! Liquidity venue interface.
//!
//! The venue uses flash accounting: inside a transaction the settlement
//! account may go temporarily negative, and `commit` fails unless every
//! asset balance of that account is back at or above zero.

use quorumclear_types::{AssetKind, Direction, OwnerId, Price, Result};
use serde::{Deserialize, Serialize};

/// Signed change to the settlement account caused by a swap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapDelta {
    pub delta_a: i128,
    pub delta_b: i128,
}

impl SwapDelta {
    #[must_use]
    pub fn of(&self, asset: AssetKind) -> i128 {
        match asset {
            AssetKind::A => self.delta_a,
            AssetKind::B => self.delta_b,
        }
    }
}

/// The exchange that actually moves funds.
///
/// Every call is fallible, and a failed call has no effect.
pub trait Ledger {
    /// Open a transaction. All other calls require one.
    fn begin(&mut self) -> Result<()>;

    /// Trade `amount` of asset A against the venue's own liquidity.
    ///
    /// `Sell` gives `amount` A and receives B; `Buy` receives `amount` A and
    /// pays B. A nonzero `price_limit` bounds the execution price: the
    /// minimum for a sell, the maximum for a buy.
    fn swap(&mut self, direction: Direction, amount: u128, price_limit: Price)
    -> Result<SwapDelta>;

    /// Input a `swap(direction, amount, _)` would consume at the current
    /// price: `amount` of A for a sell, the B cost for a buy.
    fn quote_input(&self, direction: Direction, amount: u128) -> Result<u128>;

    /// Move `amount` of an owner's committed funds into the settlement account.
    fn take(&mut self, asset: AssetKind, from: OwnerId, amount: u128) -> Result<()>;

    /// Pay `amount` from the settlement account to an owner.
    fn transfer(&mut self, asset: AssetKind, to: OwnerId, amount: u128) -> Result<()>;

    /// Close the transaction. On error the transaction has been rolled back.
    fn commit(&mut self) -> Result<()>;

    /// Discard every effect since `begin`. No-op without a transaction.
    fn rollback(&mut self);
}
