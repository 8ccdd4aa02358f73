//! FX stress runs.
//!
//! Opens a single raw-collateral deal on a [`Harness`] and walks the
//! USD/NGN rate randomly, one attestation per step, until the steps run out
//! or the deal is liquidated.

use crate::core::clock::Clock;
use crate::core::error::{LedgerError, Result};
use crate::core::ids::DealId;
use crate::core::units::{self, BPS};
use crate::matching::request::CollateralKind;
use crate::risk::health::{HealthFactor, HealthState};
use crate::simulation::harness::{Harness, NGN_PER_USD};
use chrono::Duration;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parameters of a stress run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FxStressConfig {
    pub steps: usize,
    /// Starting rate, NGN per USD micro-scaled.
    pub start_rate: u128,
    /// Largest per-step move either way, in basis points.
    pub volatility_bps: u32,
    pub step_secs: i64,
    /// Fixes the walk; `None` draws from entropy.
    pub seed: Option<u64>,
    /// Escrowed collateral, USD micro-units.
    pub collateral_usd: u128,
    /// Outstanding draw, NGN micro-units.
    pub drawn_fiat: u128,
}

impl Default for FxStressConfig {
    fn default() -> Self {
        Self {
            steps: 90,
            start_rate: NGN_PER_USD,
            volatility_bps: 300,
            step_secs: 86_400,
            seed: None,
            collateral_usd: 100_000_000_000,
            // 60k USD at the starting rate
            drawn_fiat: 60_000 * NGN_PER_USD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StressPoint {
    pub step: usize,
    pub rate: u128,
    pub health_factor: HealthFactor,
    pub state: HealthState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FxStressReport {
    pub deal_id: DealId,
    pub start_rate: u128,
    pub path: Vec<StressPoint>,
    pub margin_call_steps: usize,
    pub liquidated_at_step: Option<usize>,
}

impl FxStressReport {
    pub fn final_rate(&self) -> u128 {
        self.path.last().map_or(self.start_rate, |p| p.rate)
    }

    /// Lowest health factor seen, as a plain ratio.
    pub fn worst_health(&self) -> Option<f64> {
        self.path
            .iter()
            .map(|p| p.health_factor)
            .min()
            .and_then(|hf| hf.to_decimal())
            .and_then(|d| d.to_f64())
    }
}

impl fmt::Display for FxStressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== FX Stress Run ===")?;
        writeln!(f, "Deal:        {}", self.deal_id)?;
        writeln!(f, "Steps run:   {}", self.path.len())?;
        writeln!(
            f,
            "Rate:        {} -> {}",
            fmt_rate(self.start_rate),
            fmt_rate(self.final_rate())
        )?;
        match self.worst_health() {
            Some(worst) => writeln!(f, "Worst hf:    {:.4}", worst)?,
            None => writeln!(f, "Worst hf:    max")?,
        }
        writeln!(f, "Margin call: {} step(s)", self.margin_call_steps)?;
        match self.liquidated_at_step {
            Some(step) => writeln!(f, "Liquidated:  step {}", step)?,
            None => writeln!(f, "Liquidated:  no")?,
        }
        Ok(())
    }
}

fn fmt_rate(rate: u128) -> String {
    units::micros_to_decimal(rate)
        .map(|d| d.to_string())
        .unwrap_or_else(|| rate.to_string())
}

/// Next rate after a move of `shock_bps`, floored at one micro-unit.
fn shocked_rate(rate: u128, shock_bps: i64) -> Result<u128> {
    let factor = (BPS as i64 + shock_bps) as u128;
    Ok(units::mul_div(rate, factor, BPS, "fx shock")?.max(1))
}

/// Run the walk described by `config`.
pub fn run(config: &FxStressConfig) -> Result<FxStressReport> {
    if config.volatility_bps as u128 >= BPS {
        return Err(LedgerError::InvalidParams(format!(
            "volatility {} bps must stay below {}",
            config.volatility_bps, BPS
        )));
    }
    if config.start_rate == 0 || config.step_secs <= 0 {
        return Err(LedgerError::InvalidParams(
            "start rate and step length must be positive".to_string(),
        ));
    }
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let step = Duration::try_seconds(config.step_secs).ok_or_else(|| {
        LedgerError::InvalidParams(format!("step of {}s is out of range", config.step_secs))
    })?;

    let mut fx = Harness::new();
    let horizon = i64::try_from(config.steps)
        .ok()
        .and_then(|steps| steps.checked_mul(config.step_secs))
        .and_then(Duration::try_seconds)
        .and_then(|span| fx.clock.now().checked_add_signed(span));
    if horizon.is_none() {
        return Err(LedgerError::InvalidParams(format!(
            "{} steps of {}s run past the end of time",
            config.steps, config.step_secs
        )));
    }
    let deal_id = fx.try_open_deal(CollateralKind::RawStable)?;
    fx.refresh_rate(config.start_rate);
    let borrower = fx.borrower.clone();
    let attestor = fx.attestor.account_id();
    fx.custody.mint(&borrower, config.collateral_usd);
    fx.ledger
        .deposit_raw_collateral(&borrower, &deal_id, config.collateral_usd)?;
    fx.ledger.confirm_payout(&attestor, &deal_id, "STRESS-PAYOUT")?;

    let vol = i64::from(config.volatility_bps);
    let mut rate = config.start_rate;
    let mut path = Vec::with_capacity(config.steps);
    let mut margin_call_steps = 0;
    let mut liquidated_at_step = None;

    for step_no in 1..=config.steps {
        fx.clock.advance(step);
        let shock = if vol == 0 { 0 } else { rng.gen_range(-vol..=vol) };
        rate = shocked_rate(rate, shock)?;
        fx.refresh_rate(rate);

        let record = fx.attest(&deal_id, config.collateral_usd, config.drawn_fiat, rate)?;
        path.push(StressPoint {
            step: step_no,
            rate,
            health_factor: record.health_factor,
            state: record.health_state,
        });
        match record.health_state {
            HealthState::MarginCall => margin_call_steps += 1,
            HealthState::Liquidating => {
                liquidated_at_step = Some(step_no);
                break;
            }
            _ => {}
        }
    }

    Ok(FxStressReport {
        deal_id,
        start_rate: config.start_rate,
        path,
        margin_call_steps,
        liquidated_at_step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_shocked_rate() {
        assert_eq!(shocked_rate(1_000_000, 100).unwrap(), 1_010_000);
        assert_eq!(shocked_rate(1_000_000, -100).unwrap(), 990_000);
        assert_eq!(shocked_rate(1, -9_999).unwrap(), 1);
    }

    #[test]
    fn test_flat_walk_stays_healthy() {
        let config = FxStressConfig {
            steps: 10,
            volatility_bps: 0,
            ..Default::default()
        };
        let report = run(&config).unwrap();
        assert_eq!(report.path.len(), 10);
        assert!(report.path.iter().all(|p| p.state == HealthState::Healthy));
        assert_eq!(report.final_rate(), NGN_PER_USD);
        assert_eq!(report.liquidated_at_step, None);
        // 100k × 0.8 / 60k
        assert_relative_eq!(report.worst_health().unwrap(), 1.3333, epsilon = 1e-4);
    }

    #[test]
    fn test_underwater_deal_liquidates_after_grace() {
        let config = FxStressConfig {
            steps: 10,
            volatility_bps: 0,
            drawn_fiat: 90_000 * NGN_PER_USD,
            ..Default::default()
        };
        let report = run(&config).unwrap();
        assert_eq!(report.margin_call_steps, 1);
        assert_eq!(report.liquidated_at_step, Some(2));
        assert_eq!(report.path.len(), 2);
        assert_eq!(report.path[1].state, HealthState::Liquidating);
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let config = FxStressConfig {
            steps: 30,
            seed: Some(7),
            ..Default::default()
        };
        let a = run(&config).unwrap();
        let b = run(&config).unwrap();
        assert_eq!(a.path, b.path);
        assert_eq!(a.liquidated_at_step, b.liquidated_at_step);
    }

    #[test]
    fn test_rejects_full_volatility() {
        let config = FxStressConfig {
            volatility_bps: 10_000,
            ..Default::default()
        };
        assert!(matches!(run(&config), Err(LedgerError::InvalidParams(_))));
    }

    #[test]
    fn test_rejects_steps_past_end_of_time() {
        for (steps, step_secs) in [(1, i64::MAX), (90, i64::MAX / 1_000), (2, 10_000_000_000_000)] {
            let config = FxStressConfig {
                steps,
                step_secs,
                ..Default::default()
            };
            assert!(matches!(run(&config), Err(LedgerError::InvalidParams(_))));
        }
    }
}
