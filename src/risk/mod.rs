//! Attestation and risk: signed health reports and the liquidation state machine.

pub mod attestation;
pub mod health;
pub mod signature;
