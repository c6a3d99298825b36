//! Orchestration services
//!
//! Write paths that compose validation, the event store, the reducer and the
//! planner. Handlers stay thin; everything testable lives here or in
//! `scheduler`.

pub mod fluency;
pub mod ingest;
pub mod session;
