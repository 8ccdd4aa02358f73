use crate::core::error::Result;
use crate::core::units::{self, BPS, PRECISION};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Health factor, "ratio × 10^18".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HealthFactor(u128);

impl HealthFactor {
    /// Sentinel for a deal with nothing drawn.
    pub const MAX: HealthFactor = HealthFactor(u128::MAX);
    /// At or above this a deal is healthy (1.10).
    pub const HEALTHY: HealthFactor = HealthFactor(PRECISION / 100 * 110);
    /// Below this a deal is under water (1.00).
    pub const UNDERWATER: HealthFactor = HealthFactor(PRECISION);

    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    /// `collateral × ltv × 10^18 / (drawn × 10^4)`, saturating to
    /// [`HealthFactor::MAX`] when nothing is drawn.
    pub fn compute(collateral_usd: u128, drawn_usd: u128, ltv_bps: u32) -> Result<Self> {
        if drawn_usd == 0 {
            return Ok(Self::MAX);
        }
        let numerator = units::checked_product(
            &[collateral_usd, u128::from(ltv_bps), PRECISION],
            "health factor",
        )?;
        let denominator = units::checked_product(&[drawn_usd, BPS], "health factor")?;
        Ok(Self(numerator / denominator))
    }

    /// The ratio as a Decimal, or `None` for values beyond Decimal's range.
    pub fn to_decimal(&self) -> Option<Decimal> {
        units::to_decimal(self.0, 18)
    }
}

impl fmt::Display for HealthFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            Some(d) => write!(f, "{}", d.round_dp(4)),
            None => f.write_str("max"),
        }
    }
}

/// Health bands, in worsening order. `Liquidating` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Warning,
    MarginCall,
    Liquidating,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::MarginCall => "margin-call",
            Self::Liquidating => "liquidating",
        };
        f.write_str(s)
    }
}

/// Outcome of evaluating one attestation against the margin-call clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub state: HealthState,
    /// Margin-call clock after the transition; `None` means not distressed.
    pub margin_call_since: Option<DateTime<Utc>>,
}

/// Next health state for `hf`.
///
/// Healthy resets the clock, Warning leaves it untouched. Under water, the
/// first observation starts the clock and liquidation follows only once
/// more than `grace` has passed since.
pub fn transition(
    hf: HealthFactor,
    margin_call_since: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    grace: Duration,
) -> Transition {
    if hf >= HealthFactor::HEALTHY {
        return Transition {
            state: HealthState::Healthy,
            margin_call_since: None,
        };
    }
    if hf >= HealthFactor::UNDERWATER {
        return Transition {
            state: HealthState::Warning,
            margin_call_since,
        };
    }
    match margin_call_since {
        None => Transition {
            state: HealthState::MarginCall,
            margin_call_since: Some(now),
        },
        Some(since) if since.checked_add_signed(grace).is_some_and(|end| now > end) => {
            Transition {
                state: HealthState::Liquidating,
                margin_call_since: Some(since),
            }
        }
        Some(since) => Transition {
            state: HealthState::MarginCall,
            margin_call_since: Some(since),
        },
    }
}
