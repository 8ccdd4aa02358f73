use crate::core::error::Result;
use crate::core::ids::DealId;
use crate::core::units::{self, BPS, SCALE, SECONDS_PER_DAY};
use crate::ledger::Ledger;
use crate::matching::deal::Deal;
use crate::matching::request::CollateralKind;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fee owed on a deal, net of the collateral's yield.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub days_elapsed: u64,
    /// Fiat micro-units.
    pub gross_fee: u128,
    /// Stable micro-units gained by the collateral since deposit.
    pub yield_accrued: u128,
    /// `yield_accrued` at the locked rate, fiat micro-units.
    pub yield_in_fiat: u128,
    pub net_fee: u128,
    /// Annualized yield in basis points. Reporting only.
    pub effective_yield_bps: Option<Decimal>,
}

/// What the fee depends on besides the deal itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YieldInputs {
    /// Stable value deposited.
    pub value_at_lock: u128,
    /// Current vault redemption value of the position.
    pub current_value: u128,
    /// Locked FX rate; yield is only offset when one exists.
    pub locked_rate: Option<u128>,
    pub days_locked: i64,
}

/// Compute the fee breakdown for `deal` at `now`.
///
/// `yield_inputs` is `None` when the deal has no yield-bearing position.
pub fn compute(
    deal: &Deal,
    yield_inputs: Option<YieldInputs>,
    now: DateTime<Utc>,
) -> Result<FeeBreakdown> {
    let elapsed_secs = (now - deal.opened_at).num_seconds().max(0);
    let days_elapsed = (elapsed_secs / SECONDS_PER_DAY) as u64;
    let gross_fee = units::checked_product(
        &[deal.amount_fiat, u128::from(deal.fee_bps), u128::from(days_elapsed)],
        "gross fee",
    )? / BPS;

    let offset = yield_inputs
        .filter(|_| deal.collateral_kind == CollateralKind::YieldBearing)
        .and_then(|inputs| inputs.locked_rate.map(|rate| (inputs, rate)));

    let Some((inputs, rate)) = offset else {
        return Ok(FeeBreakdown {
            days_elapsed,
            gross_fee,
            yield_accrued: 0,
            yield_in_fiat: 0,
            net_fee: gross_fee,
            effective_yield_bps: None,
        });
    };

    let yield_accrued = inputs.current_value.saturating_sub(inputs.value_at_lock);
    let yield_in_fiat = units::mul_div(yield_accrued, rate, SCALE, "yield in fiat")?;
    let net_fee = gross_fee.saturating_sub(yield_in_fiat);

    Ok(FeeBreakdown {
        days_elapsed,
        gross_fee,
        yield_accrued,
        yield_in_fiat,
        net_fee,
        effective_yield_bps: effective_yield_bps(yield_accrued, inputs.value_at_lock, inputs.days_locked),
    })
}

/// `yield × 10^4 × 365 / (value_at_lock × days_locked)`.
pub fn effective_yield_bps(yield_accrued: u128, value_at_lock: u128, days_locked: i64) -> Option<Decimal> {
    if days_locked <= 0 || value_at_lock == 0 {
        return None;
    }
    let numerator = units::micros_to_decimal(yield_accrued)? * Decimal::from(10_000 * 365);
    let denominator = units::micros_to_decimal(value_at_lock)? * Decimal::from(days_locked);
    numerator.checked_div(denominator)
}

impl Ledger {
    /// Current fee breakdown for a deal.
    pub fn fee_breakdown(&self, deal_id: &DealId) -> Result<FeeBreakdown> {
        self.fee_breakdown_at(deal_id, self.now())
    }

    pub(crate) fn fee_breakdown_at(&self, deal_id: &DealId, now: DateTime<Utc>) -> Result<FeeBreakdown> {
        let deal = self.deal_ref(deal_id)?;
        let inputs = match self.state.positions.get(deal_id) {
            Some(position) => match position.yield_units() {
                Some(units) => Some(YieldInputs {
                    value_at_lock: position.value_at_lock(),
                    current_value: self.collaborators.vault.current_redemption_value(units)?,
                    locked_rate: self
                        .state
                        .locks
                        .get(deal_id)
                        .filter(|l| l.active)
                        .map(|l| l.rate),
                    days_locked: self.days_locked(deal_id, now).unwrap_or(0),
                }),
                None => None,
            },
            None => None,
        };
        compute(deal, inputs, now)
    }
}
