use crate::core::account::AccountId;
use crate::core::ids::RequestId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What backs a deal.
///
/// Only the first two kinds have on-ledger custody. The fiat kinds are
/// settled by an out-of-band banking partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollateralKind {
    /// Stable asset converted into yield-bearing vault units.
    YieldBearing,
    /// Stable asset held as-is in escrow.
    RawStable,
    FiatGbp,
    FiatUsd,
    FiatEur,
}

impl CollateralKind {
    pub fn is_fiat(&self) -> bool {
        matches!(self, Self::FiatGbp | Self::FiatUsd | Self::FiatEur)
    }
}

impl fmt::Display for CollateralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::YieldBearing => "yield-bearing",
            Self::RawStable => "raw-stable",
            Self::FiatGbp => "fiat-gbp",
            Self::FiatUsd => "fiat-usd",
            Self::FiatEur => "fiat-eur",
        };
        f.write_str(s)
    }
}

/// An open funding request (RFQ) from a borrower.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub creator: AccountId,
    /// Requested amount in fiat micro-units.
    pub amount_fiat: u128,
    pub tenor_days: u32,
    pub max_fee_bps: u32,
    pub collateral_kind: CollateralKind,
    /// Declared collateral value in USD micro-units.
    pub collateral_usd: u128,
    pub created_at: DateTime<Utc>,
    pub open: bool,
}

/// A lender's offer against a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub lender: AccountId,
    pub fee_bps: u32,
    pub valid_until: DateTime<Utc>,
    pub accepted: bool,
}

impl Quote {
    /// A quote can still be accepted at its exact expiry instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.valid_until
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_quote_expiry_is_inclusive() {
        let valid_until = Utc.timestamp_opt(1_000, 0).unwrap();
        let quote = Quote {
            lender: AccountId::new("L"),
            fee_bps: 100,
            valid_until,
            accepted: false,
        };
        assert!(!quote.is_expired_at(valid_until));
        assert!(quote.is_expired_at(valid_until + Duration::seconds(1)));
    }

    #[test]
    fn test_collateral_kind_serde() {
        let json = serde_json::to_string(&CollateralKind::YieldBearing).unwrap();
        assert_eq!(json, "\"yield_bearing\"");
        assert!(CollateralKind::FiatEur.is_fiat());
        assert!(!CollateralKind::RawStable.is_fiat());
    }
}
