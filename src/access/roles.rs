use crate::core::account::AccountId;
use crate::core::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Privileged role a caller can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Administrator,
    Attestor,
    Counterparty,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::Attestor => "attestor",
            Role::Counterparty => "counterparty",
        }
    }
}

/// Role registry. There is always exactly one administrator: the role is
/// replaced on transfer, never added to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roles {
    administrator: AccountId,
    attestors: BTreeSet<AccountId>,
    counterparties: BTreeSet<AccountId>,
}

impl Roles {
    pub fn new(administrator: AccountId) -> Self {
        Self {
            administrator,
            attestors: BTreeSet::new(),
            counterparties: BTreeSet::new(),
        }
    }

    pub fn administrator(&self) -> &AccountId {
        &self.administrator
    }

    pub fn has(&self, account: &AccountId, role: Role) -> bool {
        match role {
            Role::Administrator => &self.administrator == account,
            Role::Attestor => self.attestors.contains(account),
            Role::Counterparty => self.counterparties.contains(account),
        }
    }

    /// Fail with `Unauthorized` unless `account` holds `role`.
    pub fn require(&self, account: &AccountId, role: Role) -> Result<()> {
        if self.has(account, role) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized {
                caller: account.clone(),
                role: role.as_str(),
            })
        }
    }

    pub(crate) fn set_administrator(&mut self, account: AccountId) {
        self.administrator = account;
    }

    pub(crate) fn grant(&mut self, account: AccountId, role: Role) {
        match role {
            Role::Administrator => self.administrator = account,
            Role::Attestor => {
                self.attestors.insert(account);
            }
            Role::Counterparty => {
                self.counterparties.insert(account);
            }
        }
    }

    /// Returns whether the account held the role. The administrator cannot
    /// be revoked, only transferred.
    pub(crate) fn revoke(&mut self, account: &AccountId, role: Role) -> bool {
        match role {
            Role::Administrator => false,
            Role::Attestor => self.attestors.remove(account),
            Role::Counterparty => self.counterparties.remove(account),
        }
    }

    pub fn attestors(&self) -> impl Iterator<Item = &AccountId> {
        self.attestors.iter()
    }

    pub fn counterparties(&self) -> impl Iterator<Item = &AccountId> {
        self.counterparties.iter()
    }
}
