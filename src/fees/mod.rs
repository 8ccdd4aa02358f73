//! Fee and yield calculator. Pure over deal, position and lock state.

pub mod calculator;
