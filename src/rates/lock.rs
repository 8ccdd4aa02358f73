use crate::core::account::AccountId;
use crate::core::currency::CurrencyPair;
use crate::core::error::{LedgerError, Result};
use crate::core::ids::DealId;
use crate::core::units::{self, BPS, SCALE};
use crate::ledger::Ledger;
use crate::matching::deal::DealStatus;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

/// Exchange rate frozen for a deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedRate {
    pub pair: CurrencyPair,
    /// Quote units per base unit, scaled by `SCALE`.
    pub rate: u128,
    pub locked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub active: bool,
}

impl LockedRate {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// `collateral × rate × ltv / (SCALE² × 10^4)`, truncating.
///
/// With collateral in USD micro-units and a micro-scaled rate this is the
/// credit line in whole quote-currency units.
pub fn credit_line(collateral_usd: u128, rate: u128, ltv_bps: u32) -> Result<u128> {
    let numerator =
        units::checked_product(&[collateral_usd, rate, u128::from(ltv_bps)], "credit line")?;
    Ok(numerator / (SCALE * SCALE * BPS))
}

impl Ledger {
    /// Freeze the reference rate for a matched deal.
    ///
    /// A deal gets at most one lock; a second attempt fails `AlreadyLocked`.
    pub fn lock_rate(&mut self, caller: &AccountId, deal_id: &DealId) -> Result<LockedRate> {
        self.transact("lock_rate", |ledger, now| {
            ledger.lock_rate_inner(caller, deal_id, now)
        })
    }

    pub(crate) fn lock_rate_inner(
        &mut self,
        caller: &AccountId,
        deal_id: &DealId,
        now: DateTime<Utc>,
    ) -> Result<LockedRate> {
        let deal = self.deal_ref(deal_id)?;
        if &deal.borrower != caller {
            return Err(LedgerError::NotBorrower(caller.clone()));
        }
        if deal.status != DealStatus::Matched {
            return Err(LedgerError::WrongState {
                deal: deal_id.to_string(),
                expected: DealStatus::Matched.as_str(),
                actual: deal.status.to_string(),
            });
        }
        if self.state.locks.get(deal_id).is_some_and(|l| l.active) {
            return Err(LedgerError::AlreadyLocked(deal_id.to_string()));
        }

        let pair = self.state.rate_pair.clone();
        let observation = self.collaborators.rates.reference_rate(&pair)?;
        if observation.rate == 0 {
            return Err(LedgerError::ZeroRate);
        }
        let age = now - observation.last_updated;
        let limit = self.config.rate_freshness_secs;
        if age > self.config.rate_freshness()? {
            return Err(LedgerError::StaleRate {
                age_secs: age.num_seconds(),
                limit_secs: limit,
            });
        }

        let expires_at = now
            .checked_add_signed(self.config.rate_lock()?)
            .ok_or_else(|| LedgerError::InvalidConfig("rate lock expiry out of range".to_string()))?;
        let locked = LockedRate {
            pair,
            rate: observation.rate,
            locked_at: now,
            expires_at,
            active: true,
        };
        self.state.locks.insert(deal_id.clone(), locked.clone());
        info!("locked {} at {} for deal {}", locked.pair, locked.rate, deal_id);
        Ok(locked)
    }

    /// Credit available against the deal's collateral at the locked rate.
    pub fn credit_line(&self, deal_id: &DealId) -> Result<u128> {
        let deal = self.deal_ref(deal_id)?;
        let lock = self
            .state
            .locks
            .get(deal_id)
            .filter(|l| l.active)
            .ok_or_else(|| LedgerError::NoRateLocked(deal_id.to_string()))?;
        credit_line(deal.collateral_usd, lock.rate, self.state.ltv_bps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::Clock;
    use crate::matching::request::CollateralKind;
    use crate::simulation::harness::{terms, Harness, NGN_PER_USD};
    use chrono::Duration;

    fn matched_deal(fx: &mut Harness) -> DealId {
        let (borrower, lender) = (fx.borrower.clone(), fx.lender.clone());
        let id = fx
            .ledger
            .create_request(&borrower, terms(CollateralKind::YieldBearing))
            .unwrap();
        fx.ledger.submit_quote(&lender, &id, 10, 600).unwrap();
        fx.ledger.accept_quote(&borrower, &id, 0).unwrap()
    }

    #[test]
    fn test_credit_line_reference_values() {
        // 100,000 USD at 1,580 NGN/USD with 80% LTV
        let line = credit_line(100_000_000_000, 1_580_000_000, 8_000).unwrap();
        assert_eq!(line, 126_400_000);
        assert_eq!(credit_line(100_000_000_000, 1_580_000_000, 8_000).unwrap(), line);
    }

    #[test]
    fn test_credit_line_truncates() {
        // 1 micro-USD never rounds up to a whole unit
        assert_eq!(credit_line(1, 1_580_000_000, 8_000).unwrap(), 0);
    }

    #[test]
    fn test_credit_line_overflow() {
        assert!(matches!(
            credit_line(u128::MAX, 2, 8_000),
            Err(LedgerError::ArithmeticOverflow(_))
        ));
    }

    #[test]
    fn test_lock_expiry() {
        let now = Utc::now();
        let lock = LockedRate {
            pair: CurrencyPair::default(),
            rate: 1,
            locked_at: now,
            expires_at: now + Duration::minutes(10),
            active: true,
        };
        assert!(!lock.is_expired_at(now + Duration::minutes(9)));
        assert!(lock.is_expired_at(now + Duration::minutes(10)));
    }

    #[test]
    fn test_zero_reference_rate() {
        let mut fx = Harness::new();
        fx.refresh_rate(0);
        let deal_id = matched_deal(&mut fx);
        assert_eq!(fx.ledger.deal(&deal_id).unwrap().status, DealStatus::Matched);
        assert!(fx.ledger.locked_rate(&deal_id).is_none());

        let borrower = fx.borrower.clone();
        assert_eq!(fx.ledger.lock_rate(&borrower, &deal_id), Err(LedgerError::ZeroRate));
        assert!(fx.ledger.locked_rate(&deal_id).is_none());

        fx.refresh_rate(NGN_PER_USD);
        assert_eq!(fx.ledger.lock_rate(&borrower, &deal_id).unwrap().rate, NGN_PER_USD);
    }

    #[test]
    fn test_lock_follows_rate_pair_change() {
        let mut fx = Harness::new();
        let (admin, borrower) = (fx.admin.clone(), fx.borrower.clone());
        let kes = CurrencyPair::new("USD", "KES");
        assert!(matches!(
            fx.ledger.set_rate_pair(&borrower, kes.clone()),
            Err(LedgerError::Unauthorized { .. })
        ));

        fx.ledger.set_rate_pair(&admin, kes.clone()).unwrap();
        fx.rates.set_rate(kes.clone(), 129_000_000, fx.clock.now());
        let deal_id = matched_deal(&mut fx);
        let lock = fx.ledger.locked_rate(&deal_id).unwrap();
        assert_eq!(lock.pair, kes);
        assert_eq!(lock.rate, 129_000_000);
    }

    #[test]
    fn test_lock_window_comes_from_config() {
        let mut fx = Harness::new();
        let deal_id = matched_deal(&mut fx);
        let lock = fx.ledger.locked_rate(&deal_id).unwrap();
        assert_eq!(lock.expires_at - lock.locked_at, Duration::minutes(10));
    }
}
