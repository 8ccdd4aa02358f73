pub mod account;
pub mod clock;
pub mod config;
pub mod currency;
pub mod error;
pub mod ids;
pub mod units;
