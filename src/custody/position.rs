use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Collateral held against one deal.
///
/// Created on the first deposit and zeroed exactly once on release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollateralPosition {
    /// Vault units bought with the borrower's stable deposit.
    YieldBearing {
        units: u128,
        /// Stable value deposited, in micro-units.
        value_at_lock: u128,
        deposited_at: DateTime<Utc>,
    },
    /// Stable asset held in escrow.
    RawEscrow {
        amount: u128,
        value_at_lock: u128,
        deposited_at: DateTime<Utc>,
    },
}

impl CollateralPosition {
    pub fn value_at_lock(&self) -> u128 {
        match self {
            Self::YieldBearing { value_at_lock, .. } | Self::RawEscrow { value_at_lock, .. } => {
                *value_at_lock
            }
        }
    }

    pub fn deposited_at(&self) -> DateTime<Utc> {
        match self {
            Self::YieldBearing { deposited_at, .. } | Self::RawEscrow { deposited_at, .. } => {
                *deposited_at
            }
        }
    }

    /// Vault units, or escrowed amount.
    pub fn held(&self) -> u128 {
        match self {
            Self::YieldBearing { units, .. } => *units,
            Self::RawEscrow { amount, .. } => *amount,
        }
    }

    pub fn is_released(&self) -> bool {
        self.held() == 0
    }

    /// Yield units if this is a live yield-bearing position.
    pub fn yield_units(&self) -> Option<u128> {
        match self {
            Self::YieldBearing { units, .. } if *units > 0 => Some(*units),
            _ => None,
        }
    }

    pub(crate) fn zero(&mut self) {
        match self {
            Self::YieldBearing { units, .. } => *units = 0,
            Self::RawEscrow { amount, .. } => *amount = 0,
        }
    }
}
