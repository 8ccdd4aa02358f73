//! # lending-engine
//!
//! Collateralized cross-border credit ledger.
//!
//! Borrowers post funding requests in a local fiat currency, approved
//! lenders quote fees, and an accepted quote becomes a deal backed by
//! stable-value collateral, either held in escrow or converted into
//! yield-bearing vault units. Attestors sign periodic health reports; a
//! deal that stays under water past the grace period is liquidated and its
//! collateral paid to the lender.
//!
//! ## Architecture
//!
//! - **core** — Accounts, currencies, identifiers, fixed-point units, clock, config, errors
//! - **access** — Administrator, attestor and counterparty roles
//! - **matching** — Requests, quotes and deals
//! - **custody** — Collateral deposits and releases
//! - **rates** — FX rate locks and credit lines
//! - **risk** — Signed attestations, health factor and the margin-call clock
//! - **fees** — Gross fee net of collateral yield
//! - **ledger** — The store every operation runs against, plus settlement
//! - **external** — Custody, vault and rate-reference contracts, with in-memory versions
//! - **simulation** — Test harness and FX stress runs

pub mod access;
pub mod core;
pub mod custody;
pub mod external;
pub mod fees;
pub mod ledger;
pub mod matching;
pub mod rates;
pub mod risk;
pub mod simulation;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::core::account::AccountId;
    pub use crate::core::clock::{Clock, ManualClock, SystemClock};
    pub use crate::core::config::LedgerConfig;
    pub use crate::core::currency::{CurrencyCode, CurrencyPair};
    pub use crate::core::error::{LedgerError, Result};
    pub use crate::core::ids::{DealId, RequestId};
    pub use crate::custody::position::CollateralPosition;
    pub use crate::external::mock::{MockCustody, MockRateReference, MockVault};
    pub use crate::external::Collaborators;
    pub use crate::fees::calculator::FeeBreakdown;
    pub use crate::ledger::Ledger;
    pub use crate::matching::deal::{Deal, DealStatus};
    pub use crate::matching::engine::RequestTerms;
    pub use crate::matching::request::CollateralKind;
    pub use crate::risk::attestation::{AttestationRecord, AttestationReport};
    pub use crate::risk::health::{HealthFactor, HealthState};
    pub use crate::risk::signature::AttestorKey;
}
