use crate::core::account::AccountId;
use thiserror::Error;

/// Failure reported by an external collaborator (custody, vault, rate reference).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExternalError {
    #[error("insufficient funds in {account}: needed {needed}, available {available}")]
    InsufficientFunds {
        account: AccountId,
        needed: u128,
        available: u128,
    },
    #[error("allowance of {spender} over {owner} is {allowance}, needed {needed}")]
    InsufficientAllowance {
        owner: AccountId,
        spender: AccountId,
        allowance: u128,
        needed: u128,
    },
    #[error("no reference rate for {pair}")]
    RateUnavailable { pair: String },
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Every way a ledger call can be rejected.
///
/// A rejected call never leaves partial state behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("{caller} lacks the {role} role")]
    Unauthorized { caller: AccountId, role: &'static str },

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("derived identifier {0} already exists")]
    IdCollision(String),

    #[error("quote rejected: {0}")]
    QuoteRejected(String),

    #[error("unknown request {0}")]
    UnknownRequest(String),

    #[error("unknown deal {0}")]
    UnknownDeal(String),

    #[error("request {0} is not open")]
    NotOpen(String),

    #[error("quote expired at {valid_until}")]
    Expired { valid_until: i64 },

    #[error("{0} is not the borrower")]
    NotBorrower(AccountId),

    #[error("deal {deal} is {actual}, expected {expected}")]
    WrongState {
        deal: String,
        expected: &'static str,
        actual: String,
    },

    #[error("deal {deal} holds {actual} collateral")]
    WrongCollateralKind { deal: String, actual: String },

    #[error("rate already locked for deal {0}")]
    AlreadyLocked(String),

    #[error("no rate locked for deal {0}")]
    NoRateLocked(String),

    #[error("reference rate is zero")]
    ZeroRate,

    #[error("reference rate is {age_secs}s old, limit is {limit_secs}s")]
    StaleRate { age_secs: i64, limit_secs: u64 },

    #[error("vault minted zero units for {0}")]
    ConversionFailed(u128),

    #[error("collateral for deal {0} already released")]
    AlreadyRedeemed(String),

    #[error("nonce {got} does not match expected {expected}")]
    BadNonce { expected: u64, got: u64 },

    #[error("signature does not recover to {0}")]
    BadSignature(AccountId),

    #[error("arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    External(#[from] ExternalError),
}

impl LedgerError {
    /// True for the idempotency guards, which callers may treat as
    /// "already happened".
    pub fn is_idempotency_guard(&self) -> bool {
        matches!(self, Self::AlreadyLocked(_) | Self::AlreadyRedeemed(_))
    }
}

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotency_guards() {
        assert!(LedgerError::AlreadyLocked("d".into()).is_idempotency_guard());
        assert!(LedgerError::AlreadyRedeemed("d".into()).is_idempotency_guard());
        assert!(!LedgerError::ZeroRate.is_idempotency_guard());
    }

    #[test]
    fn test_external_error_converts() {
        let err: LedgerError = ExternalError::Unavailable("vault".into()).into();
        assert_eq!(err.to_string(), "collaborator unavailable: vault");
    }
}
