//! Collateral custody: yield-bearing conversion or raw escrow, one path per deal.

pub mod ops;
pub mod position;
