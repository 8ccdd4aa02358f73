//! In-memory collaborators for tests, demos and simulation.
//!
//! Each mock is a cheap handle over shared state: clone it before moving
//! it into a ledger and the clone keeps observing (and steering) the same
//! books.

use crate::core::account::AccountId;
use crate::core::currency::CurrencyPair;
use crate::core::error::ExternalError;
use crate::core::units::SCALE;
use crate::external::{RateObservation, RateReference, StableCustody, Transactional, YieldVault};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Books with a savepoint stack.
#[derive(Debug, Default)]
struct Journaled<B: Clone> {
    book: B,
    savepoints: Vec<B>,
}

impl<B: Clone> Journaled<B> {
    fn begin(&mut self) {
        self.savepoints.push(self.book.clone());
    }

    fn commit(&mut self) {
        self.savepoints.pop();
    }

    fn rollback(&mut self) {
        if let Some(saved) = self.savepoints.pop() {
            self.book = saved;
        }
    }
}

#[derive(Debug, Clone, Default)]
struct CustodyBook {
    balances: HashMap<AccountId, u128>,
    allowances: HashMap<(AccountId, AccountId), u128>,
}

impl CustodyBook {
    fn balance(&self, account: &AccountId) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: u128) -> Result<(), ExternalError> {
        let available = self.balance(from);
        if available < amount {
            return Err(ExternalError::InsufficientFunds {
                account: from.clone(),
                needed: amount,
                available,
            });
        }
        self.balances.insert(from.clone(), available - amount);
        *self.balances.entry(to.clone()).or_insert(0) += amount;
        Ok(())
    }
}

/// Stable-asset custody keyed by account.
#[derive(Debug, Clone)]
pub struct MockCustody {
    ledger_account: AccountId,
    state: Arc<Mutex<Journaled<CustodyBook>>>,
}

impl MockCustody {
    pub fn new(ledger_account: impl Into<AccountId>) -> Self {
        Self {
            ledger_account: ledger_account.into(),
            state: Arc::new(Mutex::new(Journaled::default())),
        }
    }

    /// The account holding everything the ledger has in custody.
    pub fn ledger_account(&self) -> &AccountId {
        &self.ledger_account
    }

    /// Credit `account` out of thin air.
    pub fn mint(&self, account: &AccountId, amount: u128) {
        *lock(&self.state).book.balances.entry(account.clone()).or_insert(0) += amount;
    }

    pub fn balance_of(&self, account: &AccountId) -> u128 {
        lock(&self.state).book.balance(account)
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> u128 {
        lock(&self.state)
            .book
            .allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub fn transfer(&self, from: &AccountId, to: &AccountId, amount: u128) -> Result<(), ExternalError> {
        lock(&self.state).book.transfer(from, to, amount)
    }

    /// Move funds out of `owner` on behalf of `spender`, consuming allowance.
    pub fn transfer_from(
        &self,
        owner: &AccountId,
        spender: &AccountId,
        to: &AccountId,
        amount: u128,
    ) -> Result<(), ExternalError> {
        let mut state = lock(&self.state);
        let key = (owner.clone(), spender.clone());
        let allowance = state.book.allowances.get(&key).copied().unwrap_or(0);
        if allowance < amount {
            return Err(ExternalError::InsufficientAllowance {
                owner: owner.clone(),
                spender: spender.clone(),
                allowance,
                needed: amount,
            });
        }
        state.book.transfer(owner, to, amount)?;
        state.book.allowances.insert(key, allowance - amount);
        Ok(())
    }
}

impl Transactional for MockCustody {
    fn begin(&mut self) {
        lock(&self.state).begin();
    }

    fn commit(&mut self) {
        lock(&self.state).commit();
    }

    fn rollback(&mut self) {
        lock(&self.state).rollback();
    }
}

impl StableCustody for MockCustody {
    fn pull(&mut self, from: &AccountId, amount: u128) -> Result<(), ExternalError> {
        let ledger = self.ledger_account.clone();
        lock(&self.state).book.transfer(from, &ledger, amount)
    }

    fn push(&mut self, to: &AccountId, amount: u128) -> Result<(), ExternalError> {
        let ledger = self.ledger_account.clone();
        lock(&self.state).book.transfer(&ledger, to, amount)
    }

    fn authorize(&mut self, spender: &AccountId, amount: u128) -> Result<(), ExternalError> {
        let key = (self.ledger_account.clone(), spender.clone());
        lock(&self.state).book.allowances.insert(key, amount);
        Ok(())
    }

    fn balance_of(&self, account: &AccountId) -> u128 {
        MockCustody::balance_of(self, account)
    }
}

#[derive(Debug, Clone)]
struct VaultBook {
    /// Stable value of one unit, scaled by `SCALE`.
    price: u128,
    total_units: u128,
    paused: bool,
}

impl Default for VaultBook {
    fn default() -> Self {
        Self {
            price: SCALE,
            total_units: 0,
            paused: false,
        }
    }
}

/// Yield vault that starts at a 1:1 unit price and accrues on demand.
#[derive(Debug, Clone)]
pub struct MockVault {
    account: AccountId,
    custody: MockCustody,
    state: Arc<Mutex<Journaled<VaultBook>>>,
}

impl MockVault {
    pub fn new(account: impl Into<AccountId>, custody: MockCustody) -> Self {
        Self {
            account: account.into(),
            custody,
            state: Arc::new(Mutex::new(Journaled::default())),
        }
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn price(&self) -> u128 {
        lock(&self.state).book.price
    }

    pub fn total_units(&self) -> u128 {
        lock(&self.state).book.total_units
    }

    /// Raise the unit price by `bps` and mint the backing into the vault.
    pub fn accrue(&self, bps: u128) {
        let mut state = lock(&self.state);
        let before = state.book.total_units * state.book.price / SCALE;
        state.book.price = state.book.price * (10_000 + bps) / 10_000;
        let after = state.book.total_units * state.book.price / SCALE;
        self.custody.mint(&self.account, after - before);
    }

    /// While paused, `convert` takes nothing and mints zero units.
    pub fn pause(&self, paused: bool) {
        lock(&self.state).book.paused = paused;
    }

    fn value_of(price: u128, units: u128) -> Result<u128, ExternalError> {
        units
            .checked_mul(price)
            .map(|v| v / SCALE)
            .ok_or_else(|| ExternalError::Unavailable("vault value overflow".to_string()))
    }
}

impl Transactional for MockVault {
    fn begin(&mut self) {
        lock(&self.state).begin();
    }

    fn commit(&mut self) {
        lock(&self.state).commit();
    }

    fn rollback(&mut self) {
        lock(&self.state).rollback();
    }
}

impl YieldVault for MockVault {
    fn spender(&self) -> AccountId {
        self.account.clone()
    }

    fn convert(&mut self, stable_amount: u128) -> Result<u128, ExternalError> {
        let mut state = lock(&self.state);
        if state.book.paused {
            return Ok(0);
        }
        self.custody.transfer_from(
            self.custody.ledger_account(),
            &self.account,
            &self.account,
            stable_amount,
        )?;
        let units = stable_amount
            .checked_mul(SCALE)
            .map(|v| v / state.book.price)
            .ok_or_else(|| ExternalError::Unavailable("vault unit overflow".to_string()))?;
        state.book.total_units += units;
        Ok(units)
    }

    fn redeem(&mut self, units: u128) -> Result<u128, ExternalError> {
        let mut state = lock(&self.state);
        if units > state.book.total_units {
            return Err(ExternalError::Unavailable(format!(
                "redeeming {} units, vault holds {}",
                units, state.book.total_units
            )));
        }
        let stable = Self::value_of(state.book.price, units)?;
        self.custody
            .transfer(&self.account, self.custody.ledger_account(), stable)?;
        state.book.total_units -= units;
        Ok(stable)
    }

    fn current_redemption_value(&self, units: u128) -> Result<u128, ExternalError> {
        Self::value_of(lock(&self.state).book.price, units)
    }
}

/// Settable FX reference.
#[derive(Debug, Clone, Default)]
pub struct MockRateReference {
    rates: Arc<Mutex<HashMap<CurrencyPair, RateObservation>>>,
}

impl MockRateReference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rate(&self, pair: CurrencyPair, rate: u128, last_updated: DateTime<Utc>) {
        lock(&self.rates).insert(pair, RateObservation { rate, last_updated });
    }

    pub fn has_rate(&self, pair: &CurrencyPair) -> bool {
        lock(&self.rates).contains_key(pair)
    }

    pub fn clear(&self, pair: &CurrencyPair) {
        lock(&self.rates).remove(pair);
    }
}

impl RateReference for MockRateReference {
    fn reference_rate(&self, pair: &CurrencyPair) -> Result<RateObservation, ExternalError> {
        lock(&self.rates)
            .get(pair)
            .copied()
            .ok_or_else(|| ExternalError::RateUnavailable {
                pair: pair.to_string(),
            })
    }
}
