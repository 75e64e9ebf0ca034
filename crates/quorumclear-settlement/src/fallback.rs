//! Per-intent fallback execution.
//!
//! Every intent not resolved by the batch match is executed on its own
//! against the venue, with its own direction, amount and slippage-adjusted
//! limit:
//!
//! 1. Decrypt the intent (failure → `Voided`, nothing moves)
//! 2. `take` the quoted input from the owner (short → `Unfilled`)
//! 3. Swap on the venue (limit breached or venue short → refund, `Unfilled`)
//! 4. Square the input against what the swap consumed
//! 5. `transfer` what the swap produced to the owner
//!
//! An owner who cannot pay only affects their own intent. Any other ledger
//! failure is returned to the caller, which aborts the enclosing settlement
//! transaction.

use quorumclear_types::{
    BatchId, Intent, IntentCipher, IntentParams, IntentResolution, QuorumClearError, Result,
    open_intent,
};

use crate::{Ledger, SwapDelta};

/// Executes leftover intents individually.
pub struct FallbackExecutor<'a> {
    cipher: &'a dyn IntentCipher,
}

impl<'a> FallbackExecutor<'a> {
    #[must_use]
    pub fn new(cipher: &'a dyn IntentCipher) -> Self {
        Self { cipher }
    }

    /// Resolve one intent. Must run inside an open ledger transaction.
    ///
    /// # Errors
    /// Ledger errors that are not specific to this intent.
    pub fn execute<L: Ledger + ?Sized>(
        &self,
        ledger: &mut L,
        batch_id: BatchId,
        index: u64,
        intent: &Intent,
    ) -> Result<IntentResolution> {
        let opened = if intent.verify_commitment() {
            open_intent(self.cipher, &intent.ciphertext)
        } else {
            Err(QuorumClearError::MalformedIntent {
                reason: "commitment mismatch".to_string(),
            })
        };
        let params = match opened {
            Ok(params) => params,
            Err(err) => {
                tracing::warn!(batch = batch_id.0, index, owner = %intent.owner, error = %err, "Intent voided");
                return Ok(IntentResolution::Voided {
                    reason: err.to_string(),
                });
            }
        };

        match run_swap(ledger, intent, &params) {
            Ok(delta) => {
                tracing::debug!(
                    batch = batch_id.0,
                    index,
                    side = %params.direction,
                    amount = params.amount,
                    delta_a = delta.delta_a,
                    delta_b = delta.delta_b,
                    "Fallback executed"
                );
                Ok(IntentResolution::FallbackExecuted)
            }
            Err(err) if is_intent_local(&err) => {
                tracing::warn!(batch = batch_id.0, index, owner = %intent.owner, error = %err, "Fallback unfilled");
                Ok(IntentResolution::Unfilled {
                    reason: err.to_string(),
                })
            }
            Err(err) => Err(err),
        }
    }
}

/// Failures confined to one intent: the owner cannot pay, the venue cannot
/// fill this size, or the price is outside the intent's limit.
fn is_intent_local(err: &QuorumClearError) -> bool {
    matches!(
        err,
        QuorumClearError::TakeFailed { .. }
            | QuorumClearError::SwapFailed { .. }
            | QuorumClearError::PriceLimitBreached { .. }
            | QuorumClearError::ArithmeticOverflow { .. }
    )
}

/// Take, swap and pay out one intent.
///
/// Returns an intent-local error only while nothing of this intent remains
/// in the settlement account.
fn run_swap<L: Ledger + ?Sized>(
    ledger: &mut L,
    intent: &Intent,
    params: &IntentParams,
) -> Result<SwapDelta> {
    let input = params.direction.input_asset();
    let quoted = ledger.quote_input(params.direction, params.amount)?;
    ledger.take(input, intent.owner, quoted)?;

    match ledger.swap(params.direction, params.amount, params.effective_limit()) {
        Ok(delta) => {
            pay_out(ledger, intent, params, quoted, delta).map_err(|err| escalate(intent, err))?;
            Ok(delta)
        }
        Err(err) if is_intent_local(&err) => {
            ledger
                .transfer(input, intent.owner, quoted)
                .map_err(|refund| escalate(intent, refund))?;
            Err(err)
        }
        Err(err) => Err(err),
    }
}

/// Square the taken input against the swap, then pay the output.
fn pay_out<L: Ledger + ?Sized>(
    ledger: &mut L,
    intent: &Intent,
    params: &IntentParams,
    quoted: u128,
    delta: SwapDelta,
) -> Result<()> {
    let input = params.direction.input_asset();
    let output = params.direction.output_asset();
    let consumed = delta.of(input).unsigned_abs();
    if consumed < quoted {
        ledger.transfer(input, intent.owner, quoted - consumed)?;
    } else if consumed > quoted {
        ledger.take(input, intent.owner, consumed - quoted)?;
    }
    let produced = delta.of(output).unsigned_abs();
    if produced > 0 {
        ledger.transfer(output, intent.owner, produced)?;
    }
    Ok(())
}

/// Once the owner's funds sit in the settlement account, any failure
/// aborts the whole settlement.
fn escalate(intent: &Intent, err: QuorumClearError) -> QuorumClearError {
    if is_intent_local(&err) {
        QuorumClearError::LedgerShortfall {
            reason: format!("fallback for {} left unbalanced: {err}", intent.owner),
        }
    } else {
        err
    }
}
