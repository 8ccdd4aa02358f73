use crate::access::roles::Role;
use crate::core::account::AccountId;
use crate::core::error::{LedgerError, Result};
use crate::core::ids::DealId;
use crate::ledger::Ledger;
use crate::matching::deal::DealStatus;
use crate::matching::request::CollateralKind;
use log::info;

impl Ledger {
    fn require_status(&self, deal_id: &DealId, expected: DealStatus) -> Result<()> {
        let deal = self.deal_ref(deal_id)?;
        if deal.status != expected {
            return Err(LedgerError::WrongState {
                deal: deal_id.to_string(),
                expected: expected.as_str(),
                actual: deal.status.to_string(),
            });
        }
        Ok(())
    }

    /// Record the fiat payout to the borrower; the deal becomes `Active`.
    pub fn confirm_payout(
        &mut self,
        caller: &AccountId,
        deal_id: &DealId,
        fiat_ref: impl Into<String>,
    ) -> Result<()> {
        let fiat_ref = fiat_ref.into();
        self.transact("confirm_payout", |ledger, _| {
            ledger.state.roles.require(caller, Role::Attestor)?;
            ledger.require_status(deal_id, DealStatus::Matched)?;
            let deal = ledger.deal_mut(deal_id)?;
            deal.status = DealStatus::Active;
            deal.payout_ref = Some(fiat_ref);
            ledger.state.active.push(deal_id.clone());
            info!("deal {} active", deal_id);
            Ok(())
        })
    }

    /// Record the borrower's fiat repayment; the deal becomes `Repaid` and
    /// on-ledger collateral goes back to the borrower.
    ///
    /// Fiat collateral kinds are released by the banking partner, not here.
    pub fn confirm_repayment(
        &mut self,
        caller: &AccountId,
        deal_id: &DealId,
        fiat_ref: impl Into<String>,
    ) -> Result<()> {
        let fiat_ref = fiat_ref.into();
        self.transact("confirm_repayment", |ledger, _| {
            ledger.state.roles.require(caller, Role::Attestor)?;
            ledger.require_status(deal_id, DealStatus::Active)?;
            let deal = ledger.deal_mut(deal_id)?;
            deal.status = DealStatus::Repaid;
            deal.repayment_ref = Some(fiat_ref);
            let kind = deal.collateral_kind;
            ledger.remove_active(deal_id);
            ledger.state.margin_calls.remove(deal_id);
            info!("deal {} repaid", deal_id);

            let funded = ledger
                .state
                .positions
                .get(deal_id)
                .is_some_and(|p| !p.is_released());
            match kind {
                CollateralKind::YieldBearing if funded => {
                    ledger.redeem_yield_inner(deal_id)?;
                }
                CollateralKind::RawStable if funded => {
                    ledger.release_raw_inner(deal_id)?;
                }
                _ => {}
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::harness::Harness;

    #[test]
    fn test_payout_and_repayment_flow() {
        let mut fx = Harness::new();
        let deal_id = fx.open_deal(CollateralKind::RawStable);
        let borrower = fx.borrower.clone();
        let attestor = fx.attestor.account_id();
        fx.custody.mint(&borrower, 1_000_000);
        fx.ledger
            .deposit_raw_collateral(&borrower, &deal_id, 1_000_000)
            .unwrap();

        fx.ledger.confirm_payout(&attestor, &deal_id, "NIP-001").unwrap();
        assert_eq!(fx.ledger.active_deals(), &[deal_id.clone()]);
        assert_eq!(
            fx.ledger.deal(&deal_id).unwrap().payout_ref.as_deref(),
            Some("NIP-001")
        );

        fx.ledger.confirm_repayment(&attestor, &deal_id, "NIP-002").unwrap();
        let deal = fx.ledger.deal(&deal_id).unwrap();
        assert_eq!(deal.status, DealStatus::Repaid);
        assert_eq!(deal.repayment_ref.as_deref(), Some("NIP-002"));
        assert!(fx.ledger.active_deals().is_empty());
        assert_eq!(fx.custody.balance_of(&borrower), 1_000_000);
        assert!(fx.ledger.position(&deal_id).unwrap().is_released());
        assert!(matches!(
            fx.ledger.release_raw_collateral(&attestor, &deal_id),
            Err(LedgerError::AlreadyRedeemed(_))
        ));
    }

    #[test]
    fn test_repayment_requires_active() {
        let mut fx = Harness::new();
        let deal_id = fx.open_deal(CollateralKind::FiatGbp);
        let attestor = fx.attestor.account_id();
        assert!(matches!(
            fx.ledger.confirm_repayment(&attestor, &deal_id, "X"),
            Err(LedgerError::WrongState { .. })
        ));
        fx.ledger.confirm_payout(&attestor, &deal_id, "P").unwrap();
        assert!(matches!(
            fx.ledger.confirm_payout(&attestor, &deal_id, "P"),
            Err(LedgerError::WrongState { .. })
        ));
        fx.ledger.confirm_repayment(&attestor, &deal_id, "R").unwrap();
        assert!(fx.ledger.position(&deal_id).is_none());
    }

    #[test]
    fn test_settlement_is_attestor_only() {
        let mut fx = Harness::new();
        let deal_id = fx.open_deal(CollateralKind::FiatUsd);
        let lender = fx.lender.clone();
        assert!(matches!(
            fx.ledger.confirm_payout(&lender, &deal_id, "P"),
            Err(LedgerError::Unauthorized { .. })
        ));
    }
}
