//! The ledger: the single authoritative store every operation runs against.

pub mod settlement;

use crate::access::roles::Roles;
use crate::core::account::AccountId;
use crate::core::clock::Clock;
use crate::core::config::LedgerConfig;
use crate::core::currency::CurrencyPair;
use crate::core::error::{LedgerError, Result};
use crate::core::ids::{DealId, RequestId};
use crate::custody::position::CollateralPosition;
use crate::external::Collaborators;
use crate::matching::deal::Deal;
use crate::matching::request::{Quote, Request};
use crate::rates::lock::LockedRate;
use crate::risk::attestation::AttestationRecord;
use chrono::{DateTime, Utc};
use log::debug;
use std::collections::HashMap;

/// Everything the ledger owns. Cloned as the rollback snapshot of a call.
#[derive(Debug, Clone)]
pub(crate) struct LedgerState {
    pub(crate) roles: Roles,
    pub(crate) ltv_bps: u32,
    pub(crate) rate_pair: CurrencyPair,
    pub(crate) requests: HashMap<RequestId, Request>,
    pub(crate) quotes: HashMap<RequestId, Vec<Quote>>,
    pub(crate) deals: HashMap<DealId, Deal>,
    pub(crate) positions: HashMap<DealId, CollateralPosition>,
    pub(crate) locks: HashMap<DealId, LockedRate>,
    pub(crate) history: HashMap<DealId, Vec<AttestationRecord>>,
    /// Present while a deal is distressed.
    pub(crate) margin_calls: HashMap<DealId, DateTime<Utc>>,
    pub(crate) nonces: HashMap<AccountId, u64>,
    /// Deals currently `Active`, in activation order.
    pub(crate) active: Vec<DealId>,
}

/// Collateralized lending ledger.
///
/// Calls execute one at a time to completion. Each mutating call either
/// commits all of its effects, including those on the collaborators, or
/// none of them.
///
/// # Examples
///
/// ```
/// use lending_engine::prelude::*;
///
/// let custody = MockCustody::new("LEDGER");
/// let vault = MockVault::new("VAULT", custody.clone());
/// let rates = MockRateReference::new();
/// let admin = AccountId::new("ADMIN");
///
/// let mut ledger = Ledger::new(
///     admin.clone(),
///     LedgerConfig::default(),
///     Collaborators::new(custody, vault, rates),
///     ManualClock::starting_at(1_700_000_000),
/// )
/// .unwrap();
///
/// ledger.approve_counterparty(&admin, AccountId::new("NG-ACME")).unwrap();
/// assert!(ledger.is_counterparty(&AccountId::new("NG-ACME")));
/// ```
pub struct Ledger {
    pub(crate) config: LedgerConfig,
    pub(crate) state: LedgerState,
    pub(crate) collaborators: Collaborators,
    clock: Box<dyn Clock>,
}

impl Ledger {
    pub fn new(
        administrator: AccountId,
        config: LedgerConfig,
        collaborators: Collaborators,
        clock: impl Clock + 'static,
    ) -> Result<Self> {
        config.validate()?;
        let state = LedgerState {
            roles: Roles::new(administrator),
            ltv_bps: config.default_ltv_bps,
            rate_pair: config.rate_pair.clone(),
            requests: HashMap::new(),
            quotes: HashMap::new(),
            deals: HashMap::new(),
            positions: HashMap::new(),
            locks: HashMap::new(),
            history: HashMap::new(),
            margin_calls: HashMap::new(),
            nonces: HashMap::new(),
            active: Vec::new(),
        };
        Ok(Self {
            config,
            state,
            collaborators,
            clock: Box::new(clock),
        })
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Run `body` atomically. On error the ledger state is restored and the
    /// collaborators roll back to the savepoint opened here. Nested calls
    /// open nested savepoints.
    pub(crate) fn transact<T>(
        &mut self,
        op: &'static str,
        body: impl FnOnce(&mut Self, DateTime<Utc>) -> Result<T>,
    ) -> Result<T> {
        let snapshot = self.state.clone();
        let now = self.now();
        self.collaborators.begin();
        match body(self, now) {
            Ok(value) => {
                self.collaborators.commit();
                Ok(value)
            }
            Err(e) => {
                self.collaborators.rollback();
                self.state = snapshot;
                debug!("{} rolled back: {}", op, e);
                Err(e)
            }
        }
    }

    pub(crate) fn deal_ref(&self, deal_id: &DealId) -> Result<&Deal> {
        self.state
            .deals
            .get(deal_id)
            .ok_or_else(|| LedgerError::UnknownDeal(deal_id.to_string()))
    }

    pub(crate) fn deal_mut(&mut self, deal_id: &DealId) -> Result<&mut Deal> {
        self.state
            .deals
            .get_mut(deal_id)
            .ok_or_else(|| LedgerError::UnknownDeal(deal_id.to_string()))
    }

    pub(crate) fn remove_active(&mut self, deal_id: &DealId) {
        self.state.active.retain(|id| id != deal_id);
    }

    // --- Queries ---

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn request(&self, id: &RequestId) -> Option<&Request> {
        self.state.requests.get(id)
    }

    pub fn quotes(&self, id: &RequestId) -> &[Quote] {
        self.state.quotes.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn deal(&self, id: &DealId) -> Option<&Deal> {
        self.state.deals.get(id)
    }

    pub fn position(&self, id: &DealId) -> Option<&CollateralPosition> {
        self.state.positions.get(id)
    }

    pub fn locked_rate(&self, id: &DealId) -> Option<&LockedRate> {
        self.state.locks.get(id)
    }

    pub fn attestation_history(&self, id: &DealId) -> &[AttestationRecord] {
        self.state.history.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// When the deal entered the distressed band, if it is there now.
    pub fn margin_call_started(&self, id: &DealId) -> Option<DateTime<Utc>> {
        self.state.margin_calls.get(id).copied()
    }

    pub fn active_deals(&self) -> &[DealId] {
        &self.state.active
    }

    /// Nonce the attestor must present next.
    pub fn attestor_nonce(&self, attestor: &AccountId) -> u64 {
        self.state.nonces.get(attestor).copied().unwrap_or(0)
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("config", &self.config)
            .field("deals", &self.state.deals.len())
            .field("active", &self.state.active.len())
            .finish_non_exhaustive()
    }
}
