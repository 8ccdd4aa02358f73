use crate::access::roles::Role;
use crate::core::account::AccountId;
use crate::core::error::{LedgerError, Result};
use crate::core::ids::DealId;
use crate::core::units::{self, SCALE};
use crate::ledger::Ledger;
use crate::matching::deal::DealStatus;
use crate::risk::health::{self, HealthFactor, HealthState};
use crate::risk::signature::{recover_signer, AttestationPayload};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What an attestor reports about a deal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationReport {
    pub deal_id: DealId,
    /// USD micro-units; ignored for funded yield positions.
    pub collateral_usd: u128,
    /// Outstanding draw in fiat micro-units.
    pub drawn_fiat: u128,
    /// Fiat per USD, scaled by `SCALE`.
    pub fx_rate: u128,
    pub nonce: u64,
}

impl AttestationReport {
    pub fn payload(&self, chain_id: u64) -> AttestationPayload {
        AttestationPayload {
            deal_id: self.deal_id.clone(),
            collateral_usd: self.collateral_usd,
            drawn_fiat: self.drawn_fiat,
            fx_rate: self.fx_rate,
            nonce: self.nonce,
            chain_id,
        }
    }
}

/// One entry of a deal's attestation history. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationRecord {
    pub id: Uuid,
    /// Effective collateral value used, USD micro-units.
    pub collateral_usd: u128,
    /// Outstanding draw, USD micro-units.
    pub drawn_usd: u128,
    pub yield_accrued: u128,
    pub net_fee: u128,
    pub health_factor: HealthFactor,
    pub health_state: HealthState,
    pub timestamp: DateTime<Utc>,
    pub attestor: AccountId,
}

/// Fiat draw converted to USD at `fx_rate` (fiat per USD, scaled).
pub fn drawn_usd(drawn_fiat: u128, fx_rate: u128) -> Result<u128> {
    if fx_rate == 0 {
        return Err(LedgerError::InvalidParams("fx rate must be positive".to_string()));
    }
    units::mul_div(drawn_fiat, SCALE, fx_rate, "drawn usd")
}

impl Ledger {
    /// Apply a signed health report to a deal.
    ///
    /// The attestor's nonce is consumed as soon as it matches, and stays
    /// consumed even if the signature or any later step fails.
    pub fn attest(
        &mut self,
        caller: &AccountId,
        report: &AttestationReport,
        signature: &[u8],
    ) -> Result<AttestationRecord> {
        self.state.roles.require(caller, Role::Attestor)?;
        let expected = self.attestor_nonce(caller);
        if report.nonce != expected {
            return Err(LedgerError::BadNonce {
                expected,
                got: report.nonce,
            });
        }
        self.state.nonces.insert(caller.clone(), expected + 1);

        self.transact("attest", |ledger, now| {
            let digest = report.payload(ledger.config.chain_id).digest();
            match recover_signer(&digest, signature) {
                Ok(signer) if &signer == caller => {}
                Ok(_) | Err(_) => return Err(LedgerError::BadSignature(caller.clone())),
            }
            ledger.apply_attestation(caller, report, now)
        })
    }

    fn apply_attestation(
        &mut self,
        attestor: &AccountId,
        report: &AttestationReport,
        now: DateTime<Utc>,
    ) -> Result<AttestationRecord> {
        let deal_id = &report.deal_id;
        let deal = self.deal_ref(deal_id)?;
        if deal.is_terminal() {
            return Err(LedgerError::WrongState {
                deal: deal_id.to_string(),
                expected: "matched or active",
                actual: deal.status.to_string(),
            });
        }

        let collateral_usd = self.live_collateral_value(deal_id, report.collateral_usd)?;
        let drawn = drawn_usd(report.drawn_fiat, report.fx_rate)?;
        let hf = HealthFactor::compute(collateral_usd, drawn, self.state.ltv_bps)?;
        let grace = self.config.grace_period()?;
        let transition = health::transition(hf, self.margin_call_started(deal_id), now, grace);
        let fees = self.fee_breakdown_at(deal_id, now)?;

        match transition.margin_call_since {
            Some(since) => {
                if self.state.margin_calls.insert(deal_id.clone(), since).is_none() {
                    warn!("deal {} entered margin call at hf {}", deal_id, hf);
                }
            }
            None => {
                self.state.margin_calls.remove(deal_id);
            }
        }

        let record = AttestationRecord {
            id: Uuid::new_v4(),
            collateral_usd,
            drawn_usd: drawn,
            yield_accrued: fees.yield_accrued,
            net_fee: fees.net_fee,
            health_factor: hf,
            health_state: transition.state,
            timestamp: now,
            attestor: attestor.clone(),
        };
        self.state
            .history
            .entry(deal_id.clone())
            .or_default()
            .push(record.clone());

        let deal = self.deal_mut(deal_id)?;
        deal.health_factor = hf;
        deal.health_state = transition.state;
        deal.collateral_usd = collateral_usd;

        if transition.state == HealthState::Liquidating {
            deal.status = DealStatus::Liquidated;
            self.remove_active(deal_id);
            info!("deal {} liquidated at hf {}", deal_id, hf);
            let funded = self
                .state
                .positions
                .get(deal_id)
                .and_then(|p| p.yield_units())
                .is_some();
            if funded {
                self.redeem_yield_inner(deal_id)?;
            }
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::matching::request::CollateralKind;
    use crate::simulation::harness::{Harness, NGN_PER_USD};

    #[test]
    fn test_drawn_usd_conversion() {
        // 1,580,000 NGN at 1,580 NGN/USD = 1,000 USD
        assert_eq!(drawn_usd(1_580_000_000_000, NGN_PER_USD).unwrap(), 1_000_000_000);
        assert!(drawn_usd(1, 0).is_err());
    }

    #[test]
    fn test_attest_updates_deal_and_history() {
        let mut fx = Harness::new();
        let deal_id = fx.open_deal(CollateralKind::RawStable);
        // 100k USD collateral, 50k USD drawn → 1.6
        let record = fx
            .attest(&deal_id, 100_000_000_000, 50_000_000_000 * 1_580, NGN_PER_USD)
            .unwrap();
        assert_eq!(record.health_state, HealthState::Healthy);
        assert_eq!(record.health_factor.raw(), 1_600_000_000_000_000_000);
        let deal = fx.ledger.deal(&deal_id).unwrap();
        assert_eq!(deal.health_factor, record.health_factor);
        assert_eq!(fx.ledger.attestation_history(&deal_id), &[record]);
        assert_eq!(fx.ledger.attestor_nonce(&fx.attestor.account_id()), 1);
    }

    #[test]
    fn test_replayed_nonce_rejected() {
        let mut fx = Harness::new();
        let deal_id = fx.open_deal(CollateralKind::RawStable);
        let report = AttestationReport {
            deal_id: deal_id.clone(),
            collateral_usd: 100_000_000_000,
            drawn_fiat: 0,
            fx_rate: NGN_PER_USD,
            nonce: 0,
        };
        let sig = fx.attestor.sign(&report.payload(fx.ledger.config().chain_id));
        let attestor = fx.attestor.account_id();
        fx.ledger.attest(&attestor, &report, &sig).unwrap();
        assert_eq!(
            fx.ledger.attest(&attestor, &report, &sig),
            Err(LedgerError::BadNonce { expected: 1, got: 0 })
        );
        assert_eq!(fx.ledger.attestation_history(&deal_id).len(), 1);
    }

    #[test]
    fn test_forged_signature_burns_nonce() {
        let mut fx = Harness::new();
        let deal_id = fx.open_deal(CollateralKind::RawStable);
        let attestor = fx.attestor.account_id();
        let report = AttestationReport {
            deal_id: deal_id.clone(),
            collateral_usd: 1,
            drawn_fiat: 1,
            fx_rate: NGN_PER_USD,
            nonce: 0,
        };
        let forged = crate::risk::signature::AttestorKey::from_seed([9u8; 32])
            .sign(&report.payload(fx.ledger.config().chain_id));
        assert_eq!(
            fx.ledger.attest(&attestor, &report, &forged),
            Err(LedgerError::BadSignature(attestor.clone()))
        );
        assert_eq!(fx.ledger.attestor_nonce(&attestor), 1);
        assert!(fx.ledger.attestation_history(&deal_id).is_empty());
    }

    #[test]
    fn test_non_attestor_rejected_without_nonce_change() {
        let mut fx = Harness::new();
        let deal_id = fx.open_deal(CollateralKind::RawStable);
        let borrower = fx.borrower.clone();
        let report = AttestationReport {
            deal_id,
            collateral_usd: 1,
            drawn_fiat: 1,
            fx_rate: NGN_PER_USD,
            nonce: 0,
        };
        assert!(matches!(
            fx.ledger.attest(&borrower, &report, &[]),
            Err(LedgerError::Unauthorized { .. })
        ));
        assert_eq!(fx.ledger.attestor_nonce(&borrower), 0);
    }

    #[test]
    fn test_zero_draw_is_max_health() {
        let mut fx = Harness::new();
        let deal_id = fx.open_deal(CollateralKind::RawStable);
        let record = fx.attest(&deal_id, 1, 0, NGN_PER_USD).unwrap();
        assert_eq!(record.health_factor, HealthFactor::MAX);
        assert_eq!(record.health_state, HealthState::Healthy);
    }

    #[test]
    fn test_margin_call_then_liquidation() {
        let mut fx = Harness::new();
        let deal_id = fx.open_deal(CollateralKind::RawStable);
        // 0.8 × collateral < drawn
        let drawn = 100_000_000_000 * 1_580;
        let first = fx.attest(&deal_id, 100_000_000_000, drawn, NGN_PER_USD).unwrap();
        assert_eq!(first.health_state, HealthState::MarginCall);
        let since = fx.ledger.margin_call_started(&deal_id).unwrap();

        fx.clock.advance(Duration::seconds(4 * 3_600));
        let second = fx.attest(&deal_id, 100_000_000_000, drawn, NGN_PER_USD).unwrap();
        assert_eq!(second.health_state, HealthState::MarginCall);
        assert_eq!(fx.ledger.margin_call_started(&deal_id), Some(since));

        fx.clock.advance(Duration::seconds(1));
        let third = fx.attest(&deal_id, 100_000_000_000, drawn, NGN_PER_USD).unwrap();
        assert_eq!(third.health_state, HealthState::Liquidating);
        assert_eq!(fx.ledger.deal(&deal_id).unwrap().status, DealStatus::Liquidated);
        assert!(fx.attest(&deal_id, 100_000_000_000, drawn, NGN_PER_USD).is_err());
    }

    #[test]
    fn test_recovery_resets_clock() {
        let mut fx = Harness::new();
        let deal_id = fx.open_deal(CollateralKind::RawStable);
        let drawn = 100_000_000_000 * 1_580;
        fx.attest(&deal_id, 100_000_000_000, drawn, NGN_PER_USD).unwrap();
        assert!(fx.ledger.margin_call_started(&deal_id).is_some());
        fx.attest(&deal_id, 100_000_000_000, 0, NGN_PER_USD).unwrap();
        assert!(fx.ledger.margin_call_started(&deal_id).is_none());
    }

    #[test]
    fn test_revoked_attestor_rejected() {
        let mut fx = Harness::new();
        let deal_id = fx.open_deal(CollateralKind::RawStable);
        let admin = fx.admin.clone();
        let attestor = fx.attestor.account_id();
        fx.attest(&deal_id, 100_000_000_000, 0, NGN_PER_USD).unwrap();

        fx.ledger.revoke_attestor(&admin, &attestor).unwrap();
        assert!(matches!(
            fx.attest(&deal_id, 100_000_000_000, 0, NGN_PER_USD),
            Err(LedgerError::Unauthorized { .. })
        ));
        assert_eq!(fx.ledger.attestor_nonce(&attestor), 1);
        assert_eq!(fx.ledger.attestation_history(&deal_id).len(), 1);
    }

    #[test]
    fn test_unrepresentable_grace_rejected_up_front() {
        let config = crate::core::config::LedgerConfig {
            grace_period_secs: 10_000_000_000_000_000,
            ..Default::default()
        };
        let key = crate::risk::signature::AttestorKey::from_seed([1u8; 32]);
        assert!(matches!(
            Harness::with_config(config, key),
            Err(LedgerError::InvalidConfig(_))
        ));
    }
}
