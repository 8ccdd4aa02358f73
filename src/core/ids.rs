use crate::core::account::AccountId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length-prefixed SHA-256 over a sequence of fields.
///
/// Length prefixes keep `("ab", "c")` and `("a", "bc")` apart.
fn digest_fields(fields: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field);
    }
    hex::encode(hasher.finalize())
}

/// Identifier of a funding request, derived from (creator, creation time, amount).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn derive(creator: &AccountId, created_at: DateTime<Utc>, amount: u128) -> Self {
        Self(digest_fields(&[
            creator.as_str().as_bytes(),
            &created_at.timestamp().to_be_bytes(),
            &amount.to_be_bytes(),
        ]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a deal, derived from (request id, lender, acceptance time).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DealId(String);

impl DealId {
    pub fn derive(request: &RequestId, lender: &AccountId, accepted_at: DateTime<Utc>) -> Self {
        Self(digest_fields(&[
            request.as_str().as_bytes(),
            lender.as_str().as_bytes(),
            &accepted_at.timestamp().to_be_bytes(),
        ]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bytes of the hex form, as mixed into signed attestation payloads.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for DealId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
