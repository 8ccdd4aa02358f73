use crate::access::roles::Role;
use crate::core::account::AccountId;
use crate::core::error::{LedgerError, Result};
use crate::core::ids::DealId;
use crate::custody::position::CollateralPosition;
use crate::ledger::Ledger;
use crate::matching::deal::{Deal, DealStatus};
use crate::matching::request::CollateralKind;
use chrono::{DateTime, Utc};
use log::info;

fn wrong_state(deal: &Deal, expected: &'static str) -> LedgerError {
    LedgerError::WrongState {
        deal: deal.id.to_string(),
        expected,
        actual: deal.status.to_string(),
    }
}

impl Ledger {
    /// Validation shared by both deposit paths.
    fn check_deposit(
        &self,
        caller: &AccountId,
        deal_id: &DealId,
        kind: CollateralKind,
        amount: u128,
    ) -> Result<()> {
        let deal = self.deal_ref(deal_id)?;
        if deal.status != DealStatus::Matched {
            return Err(wrong_state(deal, DealStatus::Matched.as_str()));
        }
        if &deal.borrower != caller {
            return Err(LedgerError::NotBorrower(caller.clone()));
        }
        self.state.roles.require(caller, Role::Counterparty)?;
        if deal.collateral_kind != kind {
            return Err(LedgerError::WrongCollateralKind {
                deal: deal_id.to_string(),
                actual: deal.collateral_kind.to_string(),
            });
        }
        if amount == 0 {
            return Err(LedgerError::InvalidParams("deposit must be positive".to_string()));
        }
        if self.state.positions.contains_key(deal_id) {
            return Err(LedgerError::WrongState {
                deal: deal_id.to_string(),
                expected: "uncollateralized",
                actual: "collateralized".to_string(),
            });
        }
        Ok(())
    }

    /// Convert the borrower's stable deposit into vault units held for the deal.
    ///
    /// The position and the deal's collateral value are recorded before any
    /// funds move; the minted unit count is filled in afterwards.
    pub fn deposit_yield_collateral(
        &mut self,
        caller: &AccountId,
        deal_id: &DealId,
        stable_amount: u128,
    ) -> Result<u128> {
        self.transact("deposit_yield_collateral", |ledger, now| {
            ledger.check_deposit(caller, deal_id, CollateralKind::YieldBearing, stable_amount)?;

            ledger.state.positions.insert(
                deal_id.clone(),
                CollateralPosition::YieldBearing {
                    units: 0,
                    value_at_lock: stable_amount,
                    deposited_at: now,
                },
            );
            ledger.deal_mut(deal_id)?.collateral_usd = stable_amount;

            let spender = ledger.collaborators.vault.spender();
            ledger.collaborators.custody.pull(caller, stable_amount)?;
            ledger.collaborators.custody.authorize(&spender, stable_amount)?;
            let minted = ledger.collaborators.vault.convert(stable_amount)?;
            if minted == 0 {
                return Err(LedgerError::ConversionFailed(stable_amount));
            }

            if let Some(CollateralPosition::YieldBearing { units, .. }) =
                ledger.state.positions.get_mut(deal_id)
            {
                *units = minted;
            }
            info!("deal {}: {} stable → {} vault units", deal_id, stable_amount, minted);
            Ok(minted)
        })
    }

    /// Hold the borrower's stable deposit in escrow.
    pub fn deposit_raw_collateral(
        &mut self,
        caller: &AccountId,
        deal_id: &DealId,
        amount: u128,
    ) -> Result<()> {
        self.transact("deposit_raw_collateral", |ledger, now| {
            ledger.check_deposit(caller, deal_id, CollateralKind::RawStable, amount)?;

            ledger.state.positions.insert(
                deal_id.clone(),
                CollateralPosition::RawEscrow {
                    amount,
                    value_at_lock: amount,
                    deposited_at: now,
                },
            );
            ledger.deal_mut(deal_id)?.collateral_usd = amount;

            ledger.collaborators.custody.pull(caller, amount)?;
            info!("deal {}: {} stable in escrow", deal_id, amount);
            Ok(())
        })
    }

    /// Redeem the deal's vault units and pay out: to the borrower once
    /// repaid, to the lender once liquidated.
    pub fn redeem_yield_collateral(&mut self, caller: &AccountId, deal_id: &DealId) -> Result<u128> {
        self.transact("redeem_yield_collateral", |ledger, _| {
            ledger.state.roles.require(caller, Role::Attestor)?;
            ledger.redeem_yield_inner(deal_id)
        })
    }

    pub(crate) fn redeem_yield_inner(&mut self, deal_id: &DealId) -> Result<u128> {
        let deal = self.deal_ref(deal_id)?;
        let recipient = match deal.status {
            DealStatus::Repaid => deal.borrower.clone(),
            DealStatus::Liquidated => deal.lender.clone(),
            _ => return Err(wrong_state(deal, "repaid or liquidated")),
        };
        if deal.collateral_kind != CollateralKind::YieldBearing {
            return Err(LedgerError::WrongCollateralKind {
                deal: deal_id.to_string(),
                actual: deal.collateral_kind.to_string(),
            });
        }
        let position = self
            .state
            .positions
            .get_mut(deal_id)
            .ok_or_else(|| LedgerError::AlreadyRedeemed(deal_id.to_string()))?;
        let units = position.held();
        if units == 0 {
            return Err(LedgerError::AlreadyRedeemed(deal_id.to_string()));
        }
        position.zero();

        let proceeds = self.collaborators.vault.redeem(units)?;
        self.collaborators.custody.push(&recipient, proceeds)?;
        info!("deal {}: redeemed {} units, {} paid to {}", deal_id, units, proceeds, recipient);
        Ok(proceeds)
    }

    /// Return escrowed collateral to the borrower of a repaid deal.
    pub fn release_raw_collateral(&mut self, caller: &AccountId, deal_id: &DealId) -> Result<u128> {
        self.transact("release_raw_collateral", |ledger, _| {
            ledger.state.roles.require(caller, Role::Attestor)?;
            ledger.release_raw_inner(deal_id)
        })
    }

    pub(crate) fn release_raw_inner(&mut self, deal_id: &DealId) -> Result<u128> {
        let deal = self.deal_ref(deal_id)?;
        if deal.status != DealStatus::Repaid {
            return Err(wrong_state(deal, DealStatus::Repaid.as_str()));
        }
        if deal.collateral_kind != CollateralKind::RawStable {
            return Err(LedgerError::WrongCollateralKind {
                deal: deal_id.to_string(),
                actual: deal.collateral_kind.to_string(),
            });
        }
        let borrower = deal.borrower.clone();
        let position = self
            .state
            .positions
            .get_mut(deal_id)
            .ok_or_else(|| LedgerError::AlreadyRedeemed(deal_id.to_string()))?;
        let amount = position.held();
        if amount == 0 {
            return Err(LedgerError::AlreadyRedeemed(deal_id.to_string()));
        }
        position.zero();

        self.collaborators.custody.push(&borrower, amount)?;
        info!("deal {}: released {} escrow to {}", deal_id, amount, borrower);
        Ok(amount)
    }

    /// Live value of the deal's collateral: the vault's redemption value
    /// for a funded yield position, otherwise the recorded value.
    pub(crate) fn live_collateral_value(&self, deal_id: &DealId, declared: u128) -> Result<u128> {
        match self.state.positions.get(deal_id).and_then(|p| p.yield_units()) {
            Some(units) => Ok(self.collaborators.vault.current_redemption_value(units)?),
            None => Ok(declared),
        }
    }

    /// Days since the position was deposited, floored.
    pub(crate) fn days_locked(&self, deal_id: &DealId, now: DateTime<Utc>) -> Option<i64> {
        self.state
            .positions
            .get(deal_id)
            .map(|p| (now - p.deposited_at()).num_days())
    }
}
