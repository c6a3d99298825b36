//! Scheduling core
//!
//! - `spacing`: checkpoint ladder, outcome classification, difficulty EWMA
//! - `reducer`: deterministic replay of review events into item state
//! - `assessment`: one-shot derivation of per-user scheduling parameters
//! - `queue`: today-queue planning (debt, warm-up, mode, lists)
//! - `protocol`: 3x3 step-sequence state machine
//! - `rollup`: daily session aggregate on completion
//! - `analytics`: calendar / achievements / progress / stats read models

pub mod analytics;
pub mod assessment;
pub mod protocol;
pub mod queue;
pub mod reducer;
pub mod rollup;
pub mod spacing;
