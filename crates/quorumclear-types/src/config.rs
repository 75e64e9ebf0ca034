//! Configuration types for the QuorumClear engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{OwnerId, QuorumClearError, Result, constants};

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scheduler: SchedulerConfig,
    pub auction: AuctionConfig,
    pub quorum: QuorumConfig,
    pub settlement: SettlementConfig,
    /// Identity allowed to force-finalize and force-complete batches.
    /// `None` disables the operator surface.
    pub operator: Option<OwnerId>,
}

impl EngineConfig {
    /// Parse a JSON document and validate it. Missing fields take defaults.
    ///
    /// # Errors
    /// `Serialization` on malformed JSON, `Configuration` on invalid values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.scheduler.validate()?;
        self.quorum.validate()?;
        self.settlement.validate()
    }
}

/// Batch finalization triggers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Size trigger.
    pub max_batch_size: usize,
    /// Age trigger.
    pub batch_timeout: Duration,
    /// The age trigger only fires once the batch holds this many intents.
    pub min_batch_size_for_timeout: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_batch_size: constants::DEFAULT_MAX_BATCH_SIZE,
            batch_timeout: Duration::from_secs(constants::DEFAULT_BATCH_TIMEOUT_SECS),
            min_batch_size_for_timeout: constants::DEFAULT_MIN_BATCH_SIZE_FOR_TIMEOUT,
        }
    }
}

impl SchedulerConfig {
    /// Defaults with the single-intent-batch protection enabled.
    #[must_use]
    pub fn hardened() -> Self {
        Self {
            min_batch_size_for_timeout: constants::HARDENED_MIN_BATCH_SIZE_FOR_TIMEOUT,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            return Err(QuorumClearError::Configuration(
                "scheduler.max_batch_size must be > 0".to_string(),
            ));
        }
        if self.min_batch_size_for_timeout == 0 {
            return Err(QuorumClearError::Configuration(
                "scheduler.min_batch_size_for_timeout must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fill allocation when one side of the book is oversubscribed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchingRule {
    /// Greedy walk in arrival order.
    #[default]
    FirstComeFirstServed,
    /// Each fill scaled by its share of the side's total volume.
    ProRata,
}

/// Auction parameters. Every quorum member must run identical values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuctionConfig {
    pub matching_rule: MatchingRule,
}

/// Which verification scheme admits results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuorumScheme {
    /// Fixed count of distinct members.
    Threshold { threshold: usize },
    /// Combined stake of distinct members.
    StakeWeighted { min_stake: u128 },
}

impl Default for QuorumScheme {
    fn default() -> Self {
        Self::Threshold {
            threshold: constants::DEFAULT_QUORUM_THRESHOLD,
        }
    }
}

/// Quorum verification parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuorumConfig {
    pub scheme: QuorumScheme,
}

impl QuorumConfig {
    pub fn validate(&self) -> Result<()> {
        match self.scheme {
            QuorumScheme::Threshold { threshold: 0 } => Err(QuorumClearError::Configuration(
                "quorum threshold must be > 0".to_string(),
            )),
            QuorumScheme::StakeWeighted { min_stake: 0 } => Err(
                QuorumClearError::Configuration("quorum min_stake must be > 0".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

/// Settlement parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    /// Slippage tolerated on the net swap relative to the clearing price.
    pub net_swap_slippage_bps: u16,
    /// Delay after finalization before a fallback-only completion may be forced.
    pub force_complete_after: Duration,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            net_swap_slippage_bps: constants::DEFAULT_NET_SWAP_SLIPPAGE_BPS,
            force_complete_after: Duration::from_secs(
                constants::DEFAULT_FORCE_COMPLETE_AFTER_SECS,
            ),
        }
    }
}

impl SettlementConfig {
    pub fn validate(&self) -> Result<()> {
        if u128::from(self.net_swap_slippage_bps) > constants::BPS_DENOMINATOR {
            return Err(QuorumClearError::Configuration(
                "settlement.net_swap_slippage_bps must be <= 10000".to_string(),
            ));
        }
        Ok(())
    }
}
