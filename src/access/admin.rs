use crate::access::roles::Role;
use crate::core::account::AccountId;
use crate::core::config::MAX_LTV_BPS;
use crate::core::currency::CurrencyPair;
use crate::core::error::{LedgerError, Result};
use crate::external::Collaborators;
use crate::ledger::Ledger;
use log::info;

impl Ledger {
    pub fn grant_attestor(&mut self, caller: &AccountId, account: AccountId) -> Result<()> {
        self.transact("grant_attestor", |ledger, _| {
            ledger.state.roles.require(caller, Role::Administrator)?;
            info!("granted attestor role to {}", account);
            ledger.state.roles.grant(account, Role::Attestor);
            Ok(())
        })
    }

    pub fn revoke_attestor(&mut self, caller: &AccountId, account: &AccountId) -> Result<bool> {
        self.transact("revoke_attestor", |ledger, _| {
            ledger.state.roles.require(caller, Role::Administrator)?;
            Ok(ledger.state.roles.revoke(account, Role::Attestor))
        })
    }

    pub fn approve_counterparty(&mut self, caller: &AccountId, account: AccountId) -> Result<()> {
        self.transact("approve_counterparty", |ledger, _| {
            ledger.state.roles.require(caller, Role::Administrator)?;
            info!("approved counterparty {}", account);
            ledger.state.roles.grant(account, Role::Counterparty);
            Ok(())
        })
    }

    pub fn revoke_counterparty(&mut self, caller: &AccountId, account: &AccountId) -> Result<bool> {
        self.transact("revoke_counterparty", |ledger, _| {
            ledger.state.roles.require(caller, Role::Administrator)?;
            Ok(ledger.state.roles.revoke(account, Role::Counterparty))
        })
    }

    /// Hand the administrator role to `account`. Only the current
    /// administrator can do this.
    pub fn transfer_admin(&mut self, caller: &AccountId, account: AccountId) -> Result<()> {
        self.transact("transfer_admin", |ledger, _| {
            ledger.state.roles.require(caller, Role::Administrator)?;
            info!("administrator {} -> {}", caller, account);
            ledger.state.roles.set_administrator(account);
            Ok(())
        })
    }

    pub fn set_ltv(&mut self, caller: &AccountId, ltv_bps: u32) -> Result<()> {
        self.transact("set_ltv", |ledger, _| {
            ledger.state.roles.require(caller, Role::Administrator)?;
            if ltv_bps > MAX_LTV_BPS {
                return Err(LedgerError::InvalidParams(format!(
                    "ltv {} bps exceeds {}",
                    ltv_bps, MAX_LTV_BPS
                )));
            }
            ledger.state.ltv_bps = ltv_bps;
            Ok(())
        })
    }

    /// Rewire custody, vault and rate reference.
    pub fn set_collaborators(
        &mut self,
        caller: &AccountId,
        collaborators: Collaborators,
    ) -> Result<()> {
        self.state.roles.require(caller, Role::Administrator)?;
        info!("collaborators replaced by {}", caller);
        self.collaborators = collaborators;
        Ok(())
    }

    pub fn set_rate_pair(&mut self, caller: &AccountId, pair: CurrencyPair) -> Result<()> {
        self.transact("set_rate_pair", |ledger, _| {
            ledger.state.roles.require(caller, Role::Administrator)?;
            ledger.state.rate_pair = pair;
            Ok(())
        })
    }

    pub fn administrator(&self) -> &AccountId {
        self.state.roles.administrator()
    }

    pub fn is_attestor(&self, account: &AccountId) -> bool {
        self.state.roles.has(account, Role::Attestor)
    }

    pub fn is_counterparty(&self, account: &AccountId) -> bool {
        self.state.roles.has(account, Role::Counterparty)
    }

    /// Current attestors, in account order.
    pub fn attestors(&self) -> impl Iterator<Item = &AccountId> {
        self.state.roles.attestors()
    }

    pub fn counterparties(&self) -> impl Iterator<Item = &AccountId> {
        self.state.roles.counterparties()
    }

    pub fn ltv_bps(&self) -> u32 {
        self.state.ltv_bps
    }
}

#[cfg(test)]
mod tests {
    use crate::core::account::AccountId;
    use crate::core::error::LedgerError;
    use crate::simulation::harness::Harness;

    #[test]
    fn test_only_admin_grants_roles() {
        let mut fx = Harness::new();
        let outsider = AccountId::new("OUTSIDER");
        let err = fx
            .ledger
            .grant_attestor(&outsider, AccountId::new("X"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));
        assert!(!fx.ledger.is_attestor(&AccountId::new("X")));
    }

    #[test]
    fn test_set_ltv_ceiling() {
        let mut fx = Harness::new();
        let admin = fx.admin.clone();
        assert!(fx.ledger.set_ltv(&admin, 9_500).is_ok());
        assert_eq!(fx.ledger.ltv_bps(), 9_500);
        assert!(matches!(
            fx.ledger.set_ltv(&admin, 9_501),
            Err(LedgerError::InvalidParams(_))
        ));
        assert_eq!(fx.ledger.ltv_bps(), 9_500);
    }

    #[test]
    fn test_transfer_admin_moves_role() {
        let mut fx = Harness::new();
        let admin = fx.admin.clone();
        let next = AccountId::new("NEXT-ADMIN");
        fx.ledger.transfer_admin(&admin, next.clone()).unwrap();
        assert_eq!(fx.ledger.administrator(), &next);
        assert!(fx.ledger.set_ltv(&admin, 7_000).is_err());
        assert!(fx.ledger.set_ltv(&next, 7_000).is_ok());
    }

    #[test]
    fn test_revoke_counterparty() {
        let mut fx = Harness::new();
        let admin = fx.admin.clone();
        let borrower = fx.borrower.clone();
        assert!(fx.ledger.revoke_counterparty(&admin, &borrower).unwrap());
        assert!(!fx.ledger.is_counterparty(&borrower));
    }

    #[test]
    fn test_role_listings() {
        let mut fx = Harness::new();
        let admin = fx.admin.clone();
        let lender = fx.lender.clone();
        let attestors: Vec<_> = fx.ledger.attestors().cloned().collect();
        assert_eq!(attestors, vec![fx.attestor.account_id()]);
        let mut expected = vec![fx.borrower.clone(), lender.clone()];
        expected.sort();
        assert_eq!(fx.ledger.counterparties().cloned().collect::<Vec<_>>(), expected);

        fx.ledger.revoke_counterparty(&admin, &lender).unwrap();
        assert_eq!(
            fx.ledger.counterparties().cloned().collect::<Vec<_>>(),
            vec![fx.borrower.clone()]
        );
    }

    #[test]
    fn test_set_collaborators_requires_admin_and_rewires() {
        use crate::core::clock::Clock;
        use crate::external::mock::{MockCustody, MockRateReference, MockVault};
        use crate::external::Collaborators;
        use crate::matching::request::CollateralKind;

        let mut fx = Harness::new();
        let (admin, borrower) = (fx.admin.clone(), fx.borrower.clone());
        let fresh = || {
            let custody = MockCustody::new("LEDGER-2");
            let vault = MockVault::new("VAULT-2", custody.clone());
            let rates = MockRateReference::new();
            (custody, vault, rates)
        };

        let (custody, vault, rates) = fresh();
        let err = fx
            .ledger
            .set_collaborators(&borrower, Collaborators::new(custody, vault, rates))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));

        let (custody, vault, rates) = fresh();
        let pair = fx.ledger.config().rate_pair.clone();
        rates.set_rate(pair, 1_600_000_000, fx.clock.now());
        fx.ledger
            .set_collaborators(&admin, Collaborators::new(custody, vault, rates))
            .unwrap();

        let deal_id = fx.open_deal(CollateralKind::RawStable);
        assert_eq!(fx.ledger.locked_rate(&deal_id).unwrap().rate, 1_600_000_000);
    }

    #[test]
    fn test_revoke_attestor_requires_admin() {
        let mut fx = Harness::new();
        let (admin, borrower) = (fx.admin.clone(), fx.borrower.clone());
        let attestor = fx.attestor.account_id();
        assert!(matches!(
            fx.ledger.revoke_attestor(&borrower, &attestor),
            Err(LedgerError::Unauthorized { .. })
        ));
        assert!(fx.ledger.is_attestor(&attestor));
        assert!(fx.ledger.revoke_attestor(&admin, &attestor).unwrap());
        assert!(!fx.ledger.is_attestor(&attestor));
        assert!(!fx.ledger.revoke_attestor(&admin, &attestor).unwrap());
    }
}
