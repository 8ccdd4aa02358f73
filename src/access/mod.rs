//! Access control: administrator, attestors and approved counterparties.

pub mod admin;
pub mod roles;
