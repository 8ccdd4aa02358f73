use crate::core::account::AccountId;
use crate::core::ids::{DealId, RequestId};
use crate::matching::request::CollateralKind;
use crate::risk::health::{HealthFactor, HealthState};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Deal lifecycle: `Matched → Active → {Repaid | Liquidated}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    Matched,
    Active,
    Repaid,
    Liquidated,
}

impl DealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::Active => "active",
            Self::Repaid => "repaid",
            Self::Liquidated => "liquidated",
        }
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A matched borrower/lender contract.
///
/// Terms are fixed at creation. Only the status, health fields, the
/// attested collateral value and the two settlement references change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub request_id: RequestId,
    pub borrower: AccountId,
    pub lender: AccountId,
    /// Principal in fiat micro-units.
    pub amount_fiat: u128,
    pub collateral_kind: CollateralKind,
    /// Collateral value in USD micro-units, refreshed by deposits and attestations.
    pub collateral_usd: u128,
    pub fee_bps: u32,
    pub opened_at: DateTime<Utc>,
    pub tenor_days: u32,
    pub health_factor: HealthFactor,
    pub health_state: HealthState,
    pub status: DealStatus,
    pub payout_ref: Option<String>,
    pub repayment_ref: Option<String>,
}

impl Deal {
    /// `None` when the tenor runs past the last representable instant.
    pub fn maturity(&self) -> Option<DateTime<Utc>> {
        self.opened_at
            .checked_add_signed(Duration::days(i64::from(self.tenor_days)))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, DealStatus::Repaid | DealStatus::Liquidated)
    }
}
