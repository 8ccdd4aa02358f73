use crate::access::roles::Role;
use crate::core::account::AccountId;
use crate::core::error::{LedgerError, Result};
use crate::core::ids::{DealId, RequestId};
use crate::ledger::Ledger;
use crate::matching::deal::{Deal, DealStatus};
use crate::matching::request::{CollateralKind, Quote, Request};
use crate::risk::health::{HealthFactor, HealthState};
use chrono::Duration;
use log::{info, warn};

/// Parameters of a new funding request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTerms {
    /// Fiat micro-units.
    pub amount_fiat: u128,
    pub tenor_days: u32,
    pub max_fee_bps: u32,
    pub collateral_kind: CollateralKind,
    /// USD micro-units.
    pub collateral_usd: u128,
}

impl Ledger {
    /// Open a request for funding.
    pub fn create_request(&mut self, caller: &AccountId, terms: RequestTerms) -> Result<RequestId> {
        self.transact("create_request", |ledger, now| {
            ledger.state.roles.require(caller, Role::Counterparty)?;
            if terms.amount_fiat == 0 {
                return Err(LedgerError::InvalidParams("amount must be positive".to_string()));
            }
            if terms.tenor_days == 0 {
                return Err(LedgerError::InvalidParams("tenor must be positive".to_string()));
            }
            if now
                .checked_add_signed(Duration::days(i64::from(terms.tenor_days)))
                .is_none()
            {
                return Err(LedgerError::InvalidParams(format!(
                    "tenor of {} days is out of range",
                    terms.tenor_days
                )));
            }
            if terms.max_fee_bps > ledger.config.max_fee_bps {
                return Err(LedgerError::InvalidParams(format!(
                    "max fee {} bps exceeds ceiling {}",
                    terms.max_fee_bps, ledger.config.max_fee_bps
                )));
            }

            let id = RequestId::derive(caller, now, terms.amount_fiat);
            if ledger.state.requests.contains_key(&id) {
                return Err(LedgerError::IdCollision(id.to_string()));
            }

            let request = Request {
                id: id.clone(),
                creator: caller.clone(),
                amount_fiat: terms.amount_fiat,
                tenor_days: terms.tenor_days,
                max_fee_bps: terms.max_fee_bps,
                collateral_kind: terms.collateral_kind,
                collateral_usd: terms.collateral_usd,
                created_at: now,
                open: true,
            };
            ledger.state.requests.insert(id.clone(), request);
            info!(
                "request {} by {}: {} over {} days, {} collateral",
                id, caller, terms.amount_fiat, terms.tenor_days, terms.collateral_kind
            );
            Ok(id)
        })
    }

    /// Offer funding at `fee_bps`. Returns the quote's index on the request.
    pub fn submit_quote(
        &mut self,
        caller: &AccountId,
        request_id: &RequestId,
        fee_bps: u32,
        valid_for_secs: u64,
    ) -> Result<usize> {
        self.transact("submit_quote", |ledger, now| {
            ledger.state.roles.require(caller, Role::Counterparty)?;
            let request = ledger
                .state
                .requests
                .get(request_id)
                .ok_or_else(|| LedgerError::UnknownRequest(request_id.to_string()))?;
            if !request.open {
                return Err(LedgerError::QuoteRejected(format!(
                    "request {} is closed",
                    request_id
                )));
            }
            if fee_bps > request.max_fee_bps {
                return Err(LedgerError::QuoteRejected(format!(
                    "fee {} bps above request maximum {}",
                    fee_bps, request.max_fee_bps
                )));
            }
            let valid_until = i64::try_from(valid_for_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .and_then(|window| now.checked_add_signed(window))
                .ok_or_else(|| {
                    LedgerError::InvalidParams(format!(
                        "validity window of {}s is out of range",
                        valid_for_secs
                    ))
                })?;

            let quotes = ledger.state.quotes.entry(request_id.clone()).or_default();
            quotes.push(Quote {
                lender: caller.clone(),
                fee_bps,
                valid_until,
                accepted: false,
            });
            Ok(quotes.len() - 1)
        })
    }

    /// Accept a quote, closing the request and creating a `Matched` deal.
    ///
    /// Also tries to lock the FX rate. A failed lock is logged and
    /// discarded; the deal stands either way.
    pub fn accept_quote(
        &mut self,
        caller: &AccountId,
        request_id: &RequestId,
        quote_index: usize,
    ) -> Result<DealId> {
        self.transact("accept_quote", |ledger, now| {
            let request = ledger
                .state
                .requests
                .get(request_id)
                .ok_or_else(|| LedgerError::UnknownRequest(request_id.to_string()))?
                .clone();
            if &request.creator != caller {
                return Err(LedgerError::NotBorrower(caller.clone()));
            }
            if !request.open {
                return Err(LedgerError::NotOpen(request_id.to_string()));
            }
            let quote = ledger
                .state
                .quotes
                .get_mut(request_id)
                .and_then(|q| q.get_mut(quote_index))
                .ok_or_else(|| {
                    LedgerError::InvalidParams(format!("no quote {} on {}", quote_index, request_id))
                })?;
            if quote.accepted {
                return Err(LedgerError::NotOpen(request_id.to_string()));
            }
            if quote.is_expired_at(now) {
                return Err(LedgerError::Expired {
                    valid_until: quote.valid_until.timestamp(),
                });
            }

            let deal_id = DealId::derive(request_id, &quote.lender, now);
            if ledger.state.deals.contains_key(&deal_id) {
                return Err(LedgerError::IdCollision(deal_id.to_string()));
            }
            quote.accepted = true;
            let deal = Deal {
                id: deal_id.clone(),
                request_id: request_id.clone(),
                borrower: request.creator.clone(),
                lender: quote.lender.clone(),
                amount_fiat: request.amount_fiat,
                collateral_kind: request.collateral_kind,
                collateral_usd: request.collateral_usd,
                fee_bps: quote.fee_bps,
                opened_at: now,
                tenor_days: request.tenor_days,
                health_factor: HealthFactor::MAX,
                health_state: HealthState::Healthy,
                status: DealStatus::Matched,
                payout_ref: None,
                repayment_ref: None,
            };
            if let Some(r) = ledger.state.requests.get_mut(request_id) {
                r.open = false;
            }
            info!("deal {} matched: {} borrows from {}", deal_id, deal.borrower, deal.lender);
            ledger.state.deals.insert(deal_id.clone(), deal);

            let rate_lock = ledger.transact("auto_lock_rate", |inner, now| {
                inner.lock_rate_inner(caller, &deal_id, now)
            });
            if let Err(e) = rate_lock {
                warn!("rate lock for deal {} deferred: {}", deal_id, e);
            }
            Ok(deal_id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::harness::{terms, Harness};

    #[test]
    fn test_create_request_stores_fields() {
        let mut fx = Harness::new();
        let borrower = fx.borrower.clone();
        let t = terms(CollateralKind::RawStable);
        let id = fx.ledger.create_request(&borrower, t.clone()).unwrap();
        let request = fx.ledger.request(&id).unwrap();
        assert!(request.open);
        assert_eq!(request.amount_fiat, t.amount_fiat);
        assert_eq!(request.tenor_days, t.tenor_days);
        assert_eq!(request.max_fee_bps, t.max_fee_bps);
        assert_eq!(request.collateral_kind, t.collateral_kind);
        assert_eq!(request.collateral_usd, t.collateral_usd);
        assert_eq!(&request.creator, &borrower);
    }

    #[test]
    fn test_create_request_validation() {
        let mut fx = Harness::new();
        let borrower = fx.borrower.clone();
        let mut t = terms(CollateralKind::RawStable);
        t.amount_fiat = 0;
        assert!(matches!(
            fx.ledger.create_request(&borrower, t),
            Err(LedgerError::InvalidParams(_))
        ));
        let mut t = terms(CollateralKind::RawStable);
        t.tenor_days = 0;
        assert!(fx.ledger.create_request(&borrower, t).is_err());
        let mut t = terms(CollateralKind::RawStable);
        t.max_fee_bps = 5_001;
        assert!(fx.ledger.create_request(&borrower, t).is_err());
        assert!(matches!(
            fx.ledger
                .create_request(&AccountId::new("STRANGER"), terms(CollateralKind::RawStable)),
            Err(LedgerError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_same_second_same_amount_collides() {
        let mut fx = Harness::new();
        let borrower = fx.borrower.clone();
        fx.ledger
            .create_request(&borrower, terms(CollateralKind::RawStable))
            .unwrap();
        assert!(matches!(
            fx.ledger.create_request(&borrower, terms(CollateralKind::RawStable)),
            Err(LedgerError::IdCollision(_))
        ));
    }

    #[test]
    fn test_quote_fee_ceiling() {
        let mut fx = Harness::new();
        let (borrower, lender) = (fx.borrower.clone(), fx.lender.clone());
        let id = fx
            .ledger
            .create_request(&borrower, terms(CollateralKind::RawStable))
            .unwrap();
        let max = fx.ledger.request(&id).unwrap().max_fee_bps;
        assert!(matches!(
            fx.ledger.submit_quote(&lender, &id, max + 1, 600),
            Err(LedgerError::QuoteRejected(_))
        ));
        assert_eq!(fx.ledger.submit_quote(&lender, &id, max, 600).unwrap(), 0);
        assert_eq!(fx.ledger.quotes(&id).len(), 1);
    }

    #[test]
    fn test_accept_is_single_use() {
        let mut fx = Harness::new();
        let (borrower, lender) = (fx.borrower.clone(), fx.lender.clone());
        let id = fx
            .ledger
            .create_request(&borrower, terms(CollateralKind::RawStable))
            .unwrap();
        fx.ledger.submit_quote(&lender, &id, 100, 600).unwrap();
        fx.ledger.submit_quote(&lender, &id, 90, 600).unwrap();

        let deal_id = fx.ledger.accept_quote(&borrower, &id, 0).unwrap();
        assert_eq!(fx.ledger.deal(&deal_id).unwrap().status, DealStatus::Matched);
        assert!(!fx.ledger.request(&id).unwrap().open);
        assert!(matches!(
            fx.ledger.accept_quote(&borrower, &id, 1),
            Err(LedgerError::NotOpen(_))
        ));
        assert!(matches!(
            fx.ledger.submit_quote(&lender, &id, 80, 600),
            Err(LedgerError::QuoteRejected(_))
        ));
    }

    #[test]
    fn test_accept_requires_creator_and_fresh_quote() {
        let mut fx = Harness::new();
        let (borrower, lender) = (fx.borrower.clone(), fx.lender.clone());
        let id = fx
            .ledger
            .create_request(&borrower, terms(CollateralKind::RawStable))
            .unwrap();
        fx.ledger.submit_quote(&lender, &id, 100, 60).unwrap();
        assert!(matches!(
            fx.ledger.accept_quote(&lender, &id, 0),
            Err(LedgerError::NotBorrower(_))
        ));

        fx.clock.advance(Duration::seconds(60));
        assert!(fx.ledger.accept_quote(&borrower, &id, 0).is_ok());
    }

    #[test]
    fn test_expired_quote_rejected() {
        let mut fx = Harness::new();
        let (borrower, lender) = (fx.borrower.clone(), fx.lender.clone());
        let id = fx
            .ledger
            .create_request(&borrower, terms(CollateralKind::RawStable))
            .unwrap();
        fx.ledger.submit_quote(&lender, &id, 100, 60).unwrap();
        fx.clock.advance(Duration::seconds(61));
        assert!(matches!(
            fx.ledger.accept_quote(&borrower, &id, 0),
            Err(LedgerError::Expired { .. })
        ));
        assert!(fx.ledger.request(&id).unwrap().open);
        assert!(!fx.ledger.quotes(&id)[0].accepted);
    }

    #[test]
    fn test_accept_locks_rate_when_reference_is_fresh() {
        let mut fx = Harness::new();
        let deal_id = fx.open_deal(CollateralKind::YieldBearing);
        let lock = fx.ledger.locked_rate(&deal_id).unwrap();
        assert!(lock.active);
        assert_eq!(lock.rate, crate::simulation::harness::NGN_PER_USD);
    }

    #[test]
    fn test_failed_rate_lock_does_not_undo_deal() {
        let mut fx = Harness::new();
        fx.rates.clear(&crate::core::currency::CurrencyPair::default());
        let deal_id = fx.open_deal(CollateralKind::YieldBearing);
        assert!(fx.ledger.deal(&deal_id).is_some());
        assert!(fx.ledger.locked_rate(&deal_id).is_none());
    }

    #[test]
    fn test_tenor_out_of_range_is_rejected() {
        let mut fx = Harness::new();
        let borrower = fx.borrower.clone();
        let mut t = terms(CollateralKind::RawStable);
        t.tenor_days = u32::MAX;
        assert!(matches!(
            fx.ledger.create_request(&borrower, t),
            Err(LedgerError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_quote_window_out_of_range_is_rejected() {
        let mut fx = Harness::new();
        let (borrower, lender) = (fx.borrower.clone(), fx.lender.clone());
        let id = fx
            .ledger
            .create_request(&borrower, terms(CollateralKind::RawStable))
            .unwrap();
        for window in [u64::MAX, u64::MAX / 2, i64::MAX as u64, 10_000_000_000_000] {
            assert!(matches!(
                fx.ledger.submit_quote(&lender, &id, 10, window),
                Err(LedgerError::InvalidParams(_))
            ));
        }
        assert!(fx.ledger.quotes(&id).is_empty());

        assert_eq!(fx.ledger.submit_quote(&lender, &id, 10, 600).unwrap(), 0);
        assert!(fx.ledger.accept_quote(&borrower, &id, 0).is_ok());
    }
}
