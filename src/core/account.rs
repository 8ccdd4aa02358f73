use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an account that can call into the ledger or hold funds.
///
/// Borrowers, lenders, attestors and the administrator are all accounts.
/// Attestor accounts are conventionally the hex encoding of their Ed25519
/// verifying key, so a recovered signer compares directly against the caller.
///
/// # Examples
///
/// ```
/// use lending_engine::core::account::AccountId;
///
/// let borrower = AccountId::new("NG-ACME-IMPORTS");
/// let lender = AccountId::new("GB-NORTHWIND-CAPITAL");
/// assert_ne!(borrower, lender);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Account derived from a 32-byte public key.
    pub fn from_public_key(key: &[u8; 32]) -> Self {
        Self(hex::encode(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_equality() {
        let a = AccountId::new("NG-ACME");
        let b = AccountId::new("NG-ACME");
        let c = AccountId::new("GB-LENDER");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_account_from_public_key_is_hex() {
        let key = [0xabu8; 32];
        let account = AccountId::from_public_key(&key);
        assert_eq!(account.as_str().len(), 64);
        assert!(account.as_str().starts_with("abab"));
    }
}
