//! Attestation signing and signer recovery.
//!
//! A signature envelope is the attestor's 32-byte Ed25519 verifying key
//! followed by the 64-byte signature. Recovery checks the signature and
//! returns the account derived from the embedded key, so the ledger only
//! has to compare accounts.

use crate::core::account::AccountId;
use crate::core::ids::DealId;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub const ENVELOPE_LEN: usize = 32 + 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature envelope must be {ENVELOPE_LEN} bytes, got {0}")]
    BadLength(usize),
    #[error("invalid verifying key: {0}")]
    BadKey(String),
    #[error("signature does not verify: {0}")]
    Mismatch(String),
}

/// The fields an attestor signs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationPayload {
    pub deal_id: DealId,
    pub collateral_usd: u128,
    pub drawn_fiat: u128,
    pub fx_rate: u128,
    pub nonce: u64,
    pub chain_id: u64,
}

impl AttestationPayload {
    /// SHA-256 over the fields in fixed order, big-endian.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update((self.deal_id.as_bytes().len() as u64).to_be_bytes());
        hasher.update(self.deal_id.as_bytes());
        hasher.update(self.collateral_usd.to_be_bytes());
        hasher.update(self.drawn_fiat.to_be_bytes());
        hasher.update(self.fx_rate.to_be_bytes());
        hasher.update(self.nonce.to_be_bytes());
        hasher.update(self.chain_id.to_be_bytes());
        hasher.finalize().into()
    }
}

/// Recover the account that produced `envelope` over `message`.
pub fn recover_signer(message: &[u8], envelope: &[u8]) -> Result<AccountId, SignatureError> {
    if envelope.len() != ENVELOPE_LEN {
        return Err(SignatureError::BadLength(envelope.len()));
    }
    let (key_bytes, sig_bytes) = envelope.split_at(32);
    let key: [u8; 32] = key_bytes
        .try_into()
        .map_err(|_| SignatureError::BadLength(envelope.len()))?;
    let sig: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| SignatureError::BadLength(envelope.len()))?;

    let verifying_key =
        VerifyingKey::from_bytes(&key).map_err(|e| SignatureError::BadKey(e.to_string()))?;
    verifying_key
        .verify(message, &Signature::from_bytes(&sig))
        .map_err(|e| SignatureError::Mismatch(e.to_string()))?;
    Ok(AccountId::from_public_key(&key))
}

/// Signing key held by an attestor.
#[derive(Debug, Clone)]
pub struct AttestorKey {
    signing_key: SigningKey,
}

impl AttestorKey {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            signing_key: SigningKey::generate(rng),
        }
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    pub fn account_id(&self) -> AccountId {
        AccountId::from_public_key(&self.signing_key.verifying_key().to_bytes())
    }

    /// Sign `message`, returning the envelope `recover_signer` expects.
    pub fn sign_message(&self, message: &[u8]) -> Vec<u8> {
        let signature = self.signing_key.sign(message);
        let mut envelope = Vec::with_capacity(ENVELOPE_LEN);
        envelope.extend_from_slice(&self.signing_key.verifying_key().to_bytes());
        envelope.extend_from_slice(&signature.to_bytes());
        envelope
    }

    pub fn sign(&self, payload: &AttestationPayload) -> Vec<u8> {
        self.sign_message(&payload.digest())
    }
}
