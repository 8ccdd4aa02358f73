pub mod fx_stress;
pub mod harness;
