//! Rate lock: one frozen exchange rate per deal.

pub mod lock;
