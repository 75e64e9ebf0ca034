//! Confidentiality collaborator interface.
//!
//! The engine never inspects ciphertext on the submission path. Decryption
//! is available only to the computation quorum and the fallback executor,
//! both of which receive an [`IntentCipher`] explicitly.

use crate::{Ciphertext, IntentParams, QuorumClearError, Result};

/// Encrypts and decrypts intent payloads.
pub trait IntentCipher: Send + Sync {
    fn encrypt(&self, params: &IntentParams) -> Result<Ciphertext>;

    /// # Errors
    /// `DecryptionFailed` when the payload cannot be opened.
    fn decrypt(&self, ciphertext: &Ciphertext) -> Result<IntentParams>;
}

/// Plain JSON "encryption" for tests and local simulation.
///
/// Offers no confidentiality at all; it exists so the full pipeline can run
/// without a real confidentiality layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransparentCipher;

impl IntentCipher for TransparentCipher {
    fn encrypt(&self, params: &IntentParams) -> Result<Ciphertext> {
        Ok(Ciphertext(serde_json::to_vec(params)?))
    }

    fn decrypt(&self, ciphertext: &Ciphertext) -> Result<IntentParams> {
        serde_json::from_slice(ciphertext.as_bytes()).map_err(|e| {
            QuorumClearError::DecryptionFailed {
                reason: e.to_string(),
            }
        })
    }
}

/// Decrypt and structurally validate in one step.
///
/// # Errors
/// `DecryptionFailed` or `MalformedIntent`.
pub fn open_intent(cipher: &dyn IntentCipher, ciphertext: &Ciphertext) -> Result<IntentParams> {
    let params = cipher.decrypt(ciphertext)?;
    params.validate()?;
    Ok(params)
}
