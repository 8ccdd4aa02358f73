//! Contracts the ledger requires from the outside world.
//!
//! The ledger never trusts these boundaries: it validates and records its
//! own bookkeeping before calling out, and any failure aborts the whole
//! enclosing call.

pub mod mock;

use crate::core::account::AccountId;
use crate::core::currency::CurrencyPair;
use crate::core::error::ExternalError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Nestable savepoints around a ledger call.
///
/// The ledger opens a savepoint before each mutating call and commits or
/// rolls it back when the call finishes. Collaborators that cannot undo
/// work keep the no-op defaults and must then be atomic per call.
pub trait Transactional {
    fn begin(&mut self) {}
    fn commit(&mut self) {}
    fn rollback(&mut self) {}
}

/// Custody of the stable asset. `pull` and `push` move funds between an
/// account and the ledger's own custody account.
pub trait StableCustody: Transactional {
    fn pull(&mut self, from: &AccountId, amount: u128) -> Result<(), ExternalError>;
    fn push(&mut self, to: &AccountId, amount: u128) -> Result<(), ExternalError>;
    /// Let `spender` draw up to `amount` from the ledger's custody account.
    fn authorize(&mut self, spender: &AccountId, amount: u128) -> Result<(), ExternalError>;
    fn balance_of(&self, account: &AccountId) -> u128;
}

/// Yield-bearing vault that converts the stable asset into yield units.
pub trait YieldVault: Transactional {
    /// Account the ledger authorizes before calling `convert`.
    fn spender(&self) -> AccountId;
    fn convert(&mut self, stable_amount: u128) -> Result<u128, ExternalError>;
    fn redeem(&mut self, units: u128) -> Result<u128, ExternalError>;
    fn current_redemption_value(&self, units: u128) -> Result<u128, ExternalError>;
}

/// A rate observation: quote units per base unit, scaled by `SCALE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateObservation {
    pub rate: u128,
    pub last_updated: DateTime<Utc>,
}

/// FX rate reference.
pub trait RateReference {
    fn reference_rate(&self, pair: &CurrencyPair) -> Result<RateObservation, ExternalError>;
}

/// The collaborators a ledger is wired to. Replaceable by the administrator.
pub struct Collaborators {
    pub custody: Box<dyn StableCustody>,
    pub vault: Box<dyn YieldVault>,
    pub rates: Box<dyn RateReference>,
}

impl Collaborators {
    pub fn new(
        custody: impl StableCustody + 'static,
        vault: impl YieldVault + 'static,
        rates: impl RateReference + 'static,
    ) -> Self {
        Self {
            custody: Box::new(custody),
            vault: Box::new(vault),
            rates: Box::new(rates),
        }
    }

    pub(crate) fn begin(&mut self) {
        self.custody.begin();
        self.vault.begin();
    }

    pub(crate) fn commit(&mut self) {
        self.vault.commit();
        self.custody.commit();
    }

    pub(crate) fn rollback(&mut self) {
        self.vault.rollback();
        self.custody.rollback();
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("vault", &self.vault.spender())
            .finish_non_exhaustive()
    }
}
