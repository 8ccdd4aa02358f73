//! Matching engine: request → quote → deal.

pub mod deal;
pub mod engine;
pub mod request;
