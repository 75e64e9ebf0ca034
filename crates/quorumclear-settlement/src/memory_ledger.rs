//! In-process venue with a fixed quote price.
//!
//! Keeps per-owner balances, the venue's own liquidity reserves and the
//! settlement account. Transactions snapshot the whole state on `begin`.
//!
//! Supply invariant, checked by [`InMemoryLedger::verify_supply`]:
//! ```text
//! ∀ asset: Σ(owner balances) + reserve + settlement account == Σ(minted)
//! ```

use std::collections::HashMap;

use quorumclear_types::{AssetKind, Direction, OwnerId, Price, QuorumClearError, Result};

use crate::{Ledger, SwapDelta};

fn slot(asset: AssetKind) -> usize {
    match asset {
        AssetKind::A => 0,
        AssetKind::B => 1,
    }
}

fn signed(amount: u128) -> Result<i128> {
    i128::try_from(amount).map_err(|_| QuorumClearError::ArithmeticOverflow {
        context: "ledger amount",
    })
}

#[derive(Debug, Clone, Default)]
struct State {
    owners: HashMap<(OwnerId, AssetKind), u128>,
    reserves: [u128; 2],
    account: [i128; 2],
}

impl State {
    fn credit_account(&mut self, asset: AssetKind, amount: i128) -> Result<()> {
        let cell = &mut self.account[slot(asset)];
        *cell = cell
            .checked_add(amount)
            .ok_or(QuorumClearError::ArithmeticOverflow {
                context: "settlement account",
            })?;
        Ok(())
    }
}

/// Simulated venue for tests and local runs.
#[derive(Debug, Clone)]
pub struct InMemoryLedger {
    price: Price,
    state: State,
    snapshot: Option<State>,
    minted: [u128; 2],
    swap_count: u64,
}

impl InMemoryLedger {
    /// A venue quoting `price` (B per A) with no liquidity yet.
    #[must_use]
    pub fn new(price: Price) -> Self {
        Self {
            price,
            state: State::default(),
            snapshot: None,
            minted: [0; 2],
            swap_count: 0,
        }
    }

    /// Seed the venue's own reserves.
    #[must_use]
    pub fn with_liquidity(mut self, reserve_a: u128, reserve_b: u128) -> Self {
        self.state.reserves = [reserve_a, reserve_b];
        self.minted = [reserve_a, reserve_b];
        self
    }

    #[must_use]
    pub fn price(&self) -> Price {
        self.price
    }

    pub fn set_price(&mut self, price: Price) {
        self.price = price;
    }

    /// Credit an owner with freshly minted funds.
    ///
    /// # Errors
    /// `LedgerTransaction` inside an open transaction, `ArithmeticOverflow`
    /// if the balance or the minted total would leave `u128`.
    pub fn deposit(&mut self, owner: OwnerId, asset: AssetKind, amount: u128) -> Result<()> {
        if self.in_transaction() {
            return Err(QuorumClearError::LedgerTransaction {
                reason: "deposit inside an open transaction".to_string(),
            });
        }
        let balance = self.balance(owner, asset).checked_add(amount).ok_or(
            QuorumClearError::ArithmeticOverflow {
                context: "owner balance",
            },
        )?;
        let minted = self.minted[slot(asset)].checked_add(amount).ok_or(
            QuorumClearError::ArithmeticOverflow {
                context: "minted supply",
            },
        )?;
        self.state.owners.insert((owner, asset), balance);
        self.minted[slot(asset)] = minted;
        Ok(())
    }

    #[must_use]
    pub fn balance(&self, owner: OwnerId, asset: AssetKind) -> u128 {
        self.state.owners.get(&(owner, asset)).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn reserve(&self, asset: AssetKind) -> u128 {
        self.state.reserves[slot(asset)]
    }

    /// Balance left in the settlement account (rounding dust).
    #[must_use]
    pub fn retained(&self, asset: AssetKind) -> i128 {
        self.state.account[slot(asset)]
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Number of committed or pending swaps executed so far.
    #[must_use]
    pub fn swap_count(&self) -> u64 {
        self.swap_count
    }

    /// Check that no funds were created or destroyed.
    ///
    /// # Errors
    /// `Internal` describing the mismatch.
    pub fn verify_supply(&self, asset: AssetKind) -> Result<()> {
        let held: u128 = self
            .state
            .owners
            .iter()
            .filter(|((_, a), _)| *a == asset)
            .map(|(_, amount)| *amount)
            .sum();
        let actual = signed(held)?
            .checked_add(signed(self.state.reserves[slot(asset)])?)
            .and_then(|v| v.checked_add(self.state.account[slot(asset)]))
            .ok_or(QuorumClearError::ArithmeticOverflow {
                context: "supply total",
            })?;
        let expected = signed(self.minted[slot(asset)])?;
        if actual != expected {
            return Err(QuorumClearError::Internal(format!(
                "{asset}: actual supply {actual} != minted {expected}"
            )));
        }
        Ok(())
    }

    fn require_transaction(&self, op: &str) -> Result<()> {
        if self.in_transaction() {
            Ok(())
        } else {
            Err(QuorumClearError::LedgerTransaction {
                reason: format!("{op} outside a transaction"),
            })
        }
    }
}

impl Ledger for InMemoryLedger {
    fn begin(&mut self) -> Result<()> {
        if self.in_transaction() {
            return Err(QuorumClearError::LedgerTransaction {
                reason: "transaction already open".to_string(),
            });
        }
        self.snapshot = Some(self.state.clone());
        Ok(())
    }

    fn swap(
        &mut self,
        direction: Direction,
        amount: u128,
        price_limit: Price,
    ) -> Result<SwapDelta> {
        self.require_transaction("swap")?;
        if amount == 0 {
            return Err(QuorumClearError::SwapFailed {
                reason: "zero amount".to_string(),
            });
        }
        let price = self.price;
        let breached = !price_limit.is_unlimited()
            && match direction {
                Direction::Sell => price < price_limit,
                Direction::Buy => price > price_limit,
            };
        if breached {
            return Err(QuorumClearError::PriceLimitBreached {
                reason: format!("{direction} at {price} against limit {price_limit}"),
            });
        }

        let [reserve_a, reserve_b] = self.state.reserves;
        let (reserves, delta) = match direction {
            Direction::Sell => {
                let out_b = price.quote(amount)?;
                if out_b > reserve_b {
                    return Err(QuorumClearError::SwapFailed {
                        reason: format!("insufficient B liquidity for {out_b}"),
                    });
                }
                let reserves = [
                    reserve_a.checked_add(amount).ok_or(
                        QuorumClearError::ArithmeticOverflow {
                            context: "venue reserve",
                        },
                    )?,
                    reserve_b - out_b,
                ];
                let delta = SwapDelta {
                    delta_a: -signed(amount)?,
                    delta_b: signed(out_b)?,
                };
                (reserves, delta)
            }
            Direction::Buy => {
                if amount > reserve_a {
                    return Err(QuorumClearError::SwapFailed {
                        reason: format!("insufficient A liquidity for {amount}"),
                    });
                }
                let cost_b = price.quote_ceil(amount)?;
                let reserves = [
                    reserve_a - amount,
                    reserve_b.checked_add(cost_b).ok_or(
                        QuorumClearError::ArithmeticOverflow {
                            context: "venue reserve",
                        },
                    )?,
                ];
                let delta = SwapDelta {
                    delta_a: signed(amount)?,
                    delta_b: -signed(cost_b)?,
                };
                (reserves, delta)
            }
        };
        let mut account = self.state.account;
        for asset in [AssetKind::A, AssetKind::B] {
            let cell = &mut account[slot(asset)];
            *cell = cell
                .checked_add(delta.of(asset))
                .ok_or(QuorumClearError::ArithmeticOverflow {
                    context: "settlement account",
                })?;
        }
        self.state.reserves = reserves;
        self.state.account = account;
        self.swap_count += 1;
        tracing::debug!(
            side = %direction,
            amount,
            delta_a = delta.delta_a,
            delta_b = delta.delta_b,
            "Venue swap"
        );
        Ok(delta)
    }

    fn quote_input(&self, direction: Direction, amount: u128) -> Result<u128> {
        match direction {
            Direction::Sell => Ok(amount),
            Direction::Buy => self.price.quote_ceil(amount),
        }
    }

    fn take(&mut self, asset: AssetKind, from: OwnerId, amount: u128) -> Result<()> {
        self.require_transaction("take")?;
        let held = self.balance(from, asset);
        if held < amount {
            return Err(QuorumClearError::TakeFailed {
                reason: format!("{from} holds {held} {asset}, needs {amount}"),
            });
        }
        self.state.owners.insert((from, asset), held - amount);
        self.state.credit_account(asset, signed(amount)?)
    }

    fn transfer(&mut self, asset: AssetKind, to: OwnerId, amount: u128) -> Result<()> {
        self.require_transaction("transfer")?;
        let updated = self
            .balance(to, asset)
            .checked_add(amount)
            .ok_or(QuorumClearError::TransferFailed {
                reason: format!("{to} balance overflow"),
            })?;
        self.state.credit_account(asset, -signed(amount)?)?;
        self.state.owners.insert((to, asset), updated);
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.require_transaction("commit")?;
        let [a, b] = self.state.account;
        if a < 0 || b < 0 {
            self.rollback();
            return Err(QuorumClearError::LedgerShortfall {
                reason: format!("settlement account short: A={a}, B={b}"),
            });
        }
        self.snapshot = None;
        Ok(())
    }

    fn rollback(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.state = snapshot;
        }
    }
}

#[cfg(test)]
mod tests {
    use quorumclear_types::SCALE;

    use super::*;

    fn venue() -> InMemoryLedger {
        InMemoryLedger::new(Price::from_units(2)).with_liquidity(1_000, 1_000)
    }

    #[test]
    fn operations_require_transaction() {
        let mut ledger = venue();
        let err = ledger
            .swap(Direction::Sell, 10, Price::ZERO)
            .unwrap_err();
        assert!(matches!(err, QuorumClearError::LedgerTransaction { .. }));
        assert!(ledger.commit().is_err());
    }

    #[test]
    fn sell_swap_moves_reserves() {
        let mut ledger = venue();
        ledger.begin().unwrap();
        let delta = ledger.swap(Direction::Sell, 10, Price::ZERO).unwrap();
        assert_eq!(delta, SwapDelta { delta_a: -10, delta_b: 20 });
        assert_eq!(ledger.reserve(AssetKind::A), 1_010);
        assert_eq!(ledger.reserve(AssetKind::B), 980);
        // Account is short 10 A until someone pays it in.
        assert!(ledger.commit().is_err());
        assert_eq!(ledger.reserve(AssetKind::A), 1_000);
    }

    #[test]
    fn take_swap_transfer_round_trip() {
        let mut ledger = venue();
        let owner = OwnerId::new();
        ledger.deposit(owner, AssetKind::A, 10).unwrap();

        ledger.begin().unwrap();
        ledger.take(AssetKind::A, owner, 10).unwrap();
        let delta = ledger.swap(Direction::Sell, 10, Price::ZERO).unwrap();
        ledger
            .transfer(AssetKind::B, owner, delta.delta_b.unsigned_abs())
            .unwrap();
        ledger.commit().unwrap();

        assert_eq!(ledger.balance(owner, AssetKind::A), 0);
        assert_eq!(ledger.balance(owner, AssetKind::B), 20);
        ledger.verify_supply(AssetKind::A).unwrap();
        ledger.verify_supply(AssetKind::B).unwrap();
    }

    #[test]
    fn buy_rounds_cost_up() {
        let mut ledger = InMemoryLedger::new(Price(SCALE / 3)).with_liquidity(100, 100);
        ledger.begin().unwrap();
        let delta = ledger.swap(Direction::Buy, 1, Price::ZERO).unwrap();
        assert_eq!(delta, SwapDelta { delta_a: 1, delta_b: -1 });
        ledger.rollback();
        assert_eq!(ledger.reserve(AssetKind::A), 100);
    }

    #[test]
    fn price_limits_enforced() {
        let mut ledger = venue();
        ledger.begin().unwrap();
        assert!(matches!(
            ledger.swap(Direction::Sell, 1, Price::from_units(3)),
            Err(QuorumClearError::PriceLimitBreached { .. })
        ));
        assert!(matches!(
            ledger.swap(Direction::Buy, 1, Price::from_units(1)),
            Err(QuorumClearError::PriceLimitBreached { .. })
        ));
        assert!(ledger.swap(Direction::Buy, 1, Price::from_units(2)).is_ok());
    }

    #[test]
    fn take_requires_funds() {
        let mut ledger = venue();
        let owner = OwnerId::new();
        ledger.deposit(owner, AssetKind::B, 5).unwrap();
        ledger.begin().unwrap();
        assert!(matches!(
            ledger.take(AssetKind::B, owner, 6),
            Err(QuorumClearError::TakeFailed { .. })
        ));
    }

    #[test]
    fn insufficient_liquidity() {
        let mut ledger = venue();
        ledger.begin().unwrap();
        assert!(matches!(
            ledger.swap(Direction::Buy, 1_001, Price::ZERO),
            Err(QuorumClearError::SwapFailed { .. })
        ));
        assert!(matches!(
            ledger.swap(Direction::Sell, 501, Price::ZERO),
            Err(QuorumClearError::SwapFailed { .. })
        ));
    }

    #[test]
    fn rollback_restores_everything() {
        let mut ledger = venue();
        let owner = OwnerId::new();
        ledger.deposit(owner, AssetKind::A, 50).unwrap();
        ledger.begin().unwrap();
        ledger.take(AssetKind::A, owner, 50).unwrap();
        ledger.transfer(AssetKind::B, owner, 7).unwrap();
        ledger.rollback();
        assert!(!ledger.in_transaction());
        assert_eq!(ledger.balance(owner, AssetKind::A), 50);
        assert_eq!(ledger.balance(owner, AssetKind::B), 0);
        assert_eq!(ledger.retained(AssetKind::A), 0);
    }

    #[test]
    fn deposit_blocked_inside_transaction() {
        let mut ledger = venue();
        ledger.begin().unwrap();
        assert!(ledger.deposit(OwnerId::new(), AssetKind::A, 1).is_err());
        assert!(ledger.begin().is_err());
    }

    #[test]
    fn deposit_overflow_leaves_balances_untouched() {
        let mut ledger = InMemoryLedger::new(Price::ONE);
        let owner = OwnerId::new();
        ledger.deposit(owner, AssetKind::A, u128::MAX - 5).unwrap();
        assert!(matches!(
            ledger.deposit(owner, AssetKind::A, 10),
            Err(QuorumClearError::ArithmeticOverflow { .. })
        ));
        assert_eq!(ledger.balance(owner, AssetKind::A), u128::MAX - 5);

        // The owner's balance fits, the minted total does not.
        let other = OwnerId::new();
        assert!(ledger.deposit(other, AssetKind::A, 10).is_err());
        assert_eq!(ledger.balance(other, AssetKind::A), 0);
    }

    #[test]
    fn quote_input_matches_swap() {
        let mut ledger =
            InMemoryLedger::new(Price::ratio(3, 2).unwrap()).with_liquidity(1_000, 1_000);
        assert_eq!(ledger.quote_input(Direction::Sell, 7).unwrap(), 7);
        let cost = ledger.quote_input(Direction::Buy, 7).unwrap();
        assert_eq!(cost, 11);
        ledger.begin().unwrap();
        let delta = ledger.swap(Direction::Buy, 7, Price::ZERO).unwrap();
        assert_eq!(delta.delta_b, -11);
    }
}
