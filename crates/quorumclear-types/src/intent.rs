//! Intent types.
//!
//! An [`Intent`] is stored exactly as submitted: an opaque [`Ciphertext`]
//! plus public metadata. Only the computation quorum and the fallback path
//! ever see the decrypted [`IntentParams`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{OwnerId, Price, QuorumClearError, Result};

/// Trade direction, from the owner's point of view on asset A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Direction {
    /// Give asset B, receive asset A.
    Buy,
    /// Give asset A, receive asset B.
    Sell,
}

impl Direction {
    /// Asset the owner gives up for this direction.
    #[must_use]
    pub fn input_asset(self) -> AssetKind {
        match self {
            Self::Buy => AssetKind::B,
            Self::Sell => AssetKind::A,
        }
    }

    /// Asset the owner receives for this direction.
    #[must_use]
    pub fn output_asset(self) -> AssetKind {
        match self {
            Self::Buy => AssetKind::A,
            Self::Sell => AssetKind::B,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// The two assets of the market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum AssetKind {
    A,
    B,
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "ASSET_A"),
            Self::B => write!(f, "ASSET_B"),
        }
    }
}

/// Opaque encrypted intent payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ciphertext(pub Vec<u8>);

impl Ciphertext {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Decrypted intent parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntentParams {
    pub direction: Direction,
    /// Quantity of asset A to sell or to buy.
    pub amount: u128,
    /// Tolerated slippage in basis points when executed individually.
    pub max_slippage_bps: u16,
    /// Worst acceptable price (B per A). [`Price::ZERO`] means no limit.
    pub price_limit: Price,
}

impl IntentParams {
    #[must_use]
    pub fn sell(amount: u128) -> Self {
        Self {
            direction: Direction::Sell,
            amount,
            max_slippage_bps: 0,
            price_limit: Price::ZERO,
        }
    }

    #[must_use]
    pub fn buy(amount: u128) -> Self {
        Self {
            direction: Direction::Buy,
            amount,
            max_slippage_bps: 0,
            price_limit: Price::ZERO,
        }
    }

    /// Structural checks applied after decryption.
    ///
    /// # Errors
    /// `MalformedIntent` for a zero amount or a slippage above 100%.
    pub fn validate(&self) -> Result<()> {
        if self.amount == 0 {
            return Err(QuorumClearError::MalformedIntent {
                reason: "zero amount".to_string(),
            });
        }
        if self.max_slippage_bps > 10_000 {
            return Err(QuorumClearError::MalformedIntent {
                reason: format!("slippage {} bps exceeds 10000", self.max_slippage_bps),
            });
        }
        Ok(())
    }

    /// Price limit widened by the allowed slippage in the owner's disfavor.
    ///
    /// A seller accepts a lower price, a buyer a higher one.
    #[must_use]
    pub fn effective_limit(&self) -> Price {
        if self.price_limit.is_unlimited() {
            return Price::ZERO;
        }
        let bps = i32::from(self.max_slippage_bps);
        match self.direction {
            Direction::Sell => self.price_limit.shifted_bps(-bps),
            Direction::Buy => self.price_limit.shifted_bps(bps),
        }
    }
}

/// One submitted intent. Immutable once appended to a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub owner: OwnerId,
    pub ciphertext: Ciphertext,
    pub submitted_at: DateTime<Utc>,
    /// SHA-256 over owner, ciphertext and submission time.
    pub commitment: [u8; 32],
}

impl Intent {
    /// Build an intent and compute its commitment.
    #[must_use]
    pub fn new(owner: OwnerId, ciphertext: Ciphertext, submitted_at: DateTime<Utc>) -> Self {
        let commitment = Self::compute_commitment(&owner, &ciphertext, submitted_at);
        Self {
            owner,
            ciphertext,
            submitted_at,
            commitment,
        }
    }

    /// `SHA-256("quorumclear:intent:v1:" || owner || len || ciphertext || ts_micros)`
    #[must_use]
    pub fn compute_commitment(
        owner: &OwnerId,
        ciphertext: &Ciphertext,
        submitted_at: DateTime<Utc>,
    ) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(b"quorumclear:intent:v1:");
        hasher.update(owner.as_bytes());
        hasher.update((ciphertext.0.len() as u64).to_le_bytes());
        hasher.update(&ciphertext.0);
        hasher.update(submitted_at.timestamp_micros().to_le_bytes());
        hasher.finalize().into()
    }

    /// Recompute the commitment and compare.
    #[must_use]
    pub fn verify_commitment(&self) -> bool {
        Self::compute_commitment(&self.owner, &self.ciphertext, self.submitted_at)
            == self.commitment
    }
}

/// Hash committing to a batch's intent sequence, in order.
///
/// Quorum members sign over this value so that a result computed for one
/// set of intents cannot be replayed against another.
#[must_use]
pub fn compute_intents_hash(batch_id: crate::BatchId, intents: &[Intent]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"quorumclear:batch-intents:v1:");
    hasher.update(batch_id.0.to_le_bytes());
    hasher.update((intents.len() as u64).to_le_bytes());
    for intent in intents {
        hasher.update(intent.commitment);
    }
    hasher.finalize().into()
}
