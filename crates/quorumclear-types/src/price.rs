//! Fixed-point prices.
//!
//! A [`Price`] is the amount of asset B per unit of asset A, scaled by
//! [`SCALE`] (10^18). Integer arithmetic keeps clearing bit-reproducible
//! across quorum members; [`Price::to_decimal`] is for display only.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{QuorumClearError, Result};

/// Fixed-point scale for prices.
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// Number of decimal places represented by [`SCALE`].
pub const SCALE_DECIMALS: u32 = 18;

/// A fixed-point price (asset B per asset A, times [`SCALE`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Price(pub u128);

impl Price {
    /// Neutral 1:1 price.
    pub const ONE: Self = Self(SCALE);
    /// As a limit, zero means "no limit".
    pub const ZERO: Self = Self(0);

    /// Price from a whole-unit integer ratio.
    #[must_use]
    pub fn from_units(units: u128) -> Self {
        Self(units.saturating_mul(SCALE))
    }

    /// `numerator * SCALE / denominator`, floored.
    ///
    /// # Errors
    /// `ArithmeticOverflow` if the scaled numerator does not fit in `u128`
    /// or the denominator is zero.
    pub fn ratio(numerator: u128, denominator: u128) -> Result<Self> {
        if denominator == 0 {
            return Err(QuorumClearError::ArithmeticOverflow {
                context: "price ratio with zero denominator",
            });
        }
        numerator
            .checked_mul(SCALE)
            .map(|scaled| Self(scaled / denominator))
            .ok_or(QuorumClearError::ArithmeticOverflow {
                context: "price ratio",
            })
    }

    /// Convert an amount of asset A into asset B at this price, floored.
    ///
    /// # Errors
    /// `ArithmeticOverflow` if `amount * price` exceeds `u128`.
    pub fn quote(self, amount: u128) -> Result<u128> {
        amount
            .checked_mul(self.0)
            .map(|v| v / SCALE)
            .ok_or(QuorumClearError::ArithmeticOverflow {
                context: "quote amount",
            })
    }

    /// Like [`Price::quote`] but rounded up. Used for amounts an owner pays,
    /// so rounding dust always stays with the venue.
    pub fn quote_ceil(self, amount: u128) -> Result<u128> {
        amount
            .checked_mul(self.0)
            .map(|v| v.div_ceil(SCALE))
            .ok_or(QuorumClearError::ArithmeticOverflow {
                context: "quote amount",
            })
    }

    /// Whether this limit value means "unlimited".
    #[must_use]
    pub fn is_unlimited(self) -> bool {
        self.0 == 0
    }

    /// Adjust by a number of basis points (positive widens upward).
    #[must_use]
    pub fn shifted_bps(self, bps: i32) -> Self {
        let delta = self.0 / 10_000 * u128::from(bps.unsigned_abs());
        if bps >= 0 {
            Self(self.0.saturating_add(delta))
        } else {
            Self(self.0.saturating_sub(delta))
        }
    }

    /// Human-readable decimal form. Saturates for values beyond `Decimal`'s range.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        i128::try_from(self.0)
            .ok()
            .and_then(|v| Decimal::try_from_i128_with_scale(v, SCALE_DECIMALS).ok())
            .unwrap_or(Decimal::MAX)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal().normalize())
    }
}
