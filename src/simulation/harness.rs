//! A ledger wired to in-memory collaborators, with handles kept for
//! steering: the clock, custody balances, vault accrual and the FX feed.

use crate::core::account::AccountId;
use crate::core::clock::{Clock, ManualClock};
use crate::core::config::LedgerConfig;
use crate::core::error::Result;
use crate::core::ids::DealId;
use crate::external::mock::{MockCustody, MockRateReference, MockVault};
use crate::external::Collaborators;
use crate::ledger::Ledger;
use crate::matching::engine::RequestTerms;
use crate::matching::request::CollateralKind;
use crate::risk::attestation::{AttestationRecord, AttestationReport};
use crate::risk::signature::AttestorKey;
use chrono::Duration;

/// NGN per USD used by default, micro-scaled.
pub const NGN_PER_USD: u128 = 1_580_000_000;

pub const START_UNIX: i64 = 1_700_000_000;

/// A 10M NGN, 30-day request backed by 100k USD, fee ceiling 50 bps.
pub fn terms(kind: CollateralKind) -> RequestTerms {
    RequestTerms {
        amount_fiat: 10_000_000_000_000,
        tenor_days: 30,
        max_fee_bps: 50,
        collateral_kind: kind,
        collateral_usd: 100_000_000_000,
    }
}

pub struct Harness {
    pub ledger: Ledger,
    pub admin: AccountId,
    pub borrower: AccountId,
    pub lender: AccountId,
    pub attestor: AttestorKey,
    pub clock: ManualClock,
    pub custody: MockCustody,
    pub vault: MockVault,
    pub rates: MockRateReference,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default(), AttestorKey::from_seed([42u8; 32]))
            .expect("default config is valid")
    }

    /// Build a harness with roles granted and a fresh USD/NGN rate published.
    pub fn with_config(config: LedgerConfig, attestor: AttestorKey) -> Result<Self> {
        let clock = ManualClock::starting_at(START_UNIX);
        let custody = MockCustody::new("LEDGER");
        let vault = MockVault::new("YIELD-VAULT", custody.clone());
        let rates = MockRateReference::new();
        rates.set_rate(config.rate_pair.clone(), NGN_PER_USD, clock.now());

        let admin = AccountId::new("ADMIN");
        let borrower = AccountId::new("NG-ACME-IMPORTS");
        let lender = AccountId::new("GB-NORTHWIND-CAPITAL");

        let mut ledger = Ledger::new(
            admin.clone(),
            config,
            Collaborators::new(custody.clone(), vault.clone(), rates.clone()),
            clock.clone(),
        )?;
        ledger.approve_counterparty(&admin, borrower.clone())?;
        ledger.approve_counterparty(&admin, lender.clone())?;
        ledger.grant_attestor(&admin, attestor.account_id())?;

        Ok(Self {
            ledger,
            admin,
            borrower,
            lender,
            attestor,
            clock,
            custody,
            vault,
            rates,
        })
    }

    /// Republish the current rate so it is fresh at the current instant.
    pub fn refresh_rate(&self, rate: u128) {
        self.rates
            .set_rate(self.ledger.config().rate_pair.clone(), rate, self.clock.now());
    }

    /// Create, quote (10 bps) and accept a request. Advances the clock one
    /// second first so consecutive deals get distinct identifiers.
    pub fn open_deal(&mut self, kind: CollateralKind) -> DealId {
        self.try_open_deal(kind).expect("harness deal opens")
    }

    pub fn try_open_deal(&mut self, kind: CollateralKind) -> Result<DealId> {
        self.clock.advance(Duration::seconds(1));
        if self.rates.has_rate(&self.ledger.config().rate_pair) {
            self.refresh_rate(NGN_PER_USD);
        }
        let request = self.ledger.create_request(&self.borrower, terms(kind))?;
        let index = self.ledger.submit_quote(&self.lender, &request, 10, 3_600)?;
        self.ledger.accept_quote(&self.borrower, &request, index)
    }

    /// Sign and submit a report at the attestor's current nonce.
    pub fn attest(
        &mut self,
        deal_id: &DealId,
        collateral_usd: u128,
        drawn_fiat: u128,
        fx_rate: u128,
    ) -> Result<AttestationRecord> {
        let attestor = self.attestor.account_id();
        let report = AttestationReport {
            deal_id: deal_id.clone(),
            collateral_usd,
            drawn_fiat,
            fx_rate,
            nonce: self.ledger.attestor_nonce(&attestor),
        };
        let signature = self.attestor.sign(&report.payload(self.ledger.config().chain_id));
        self.ledger.attest(&attestor, &report, &signature)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
