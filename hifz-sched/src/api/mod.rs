//! HTTP API
//!
//! Route builders per module, merged in `build_router`. Handlers extract
//! shared state plus the authenticated user and delegate to `services` /
//! `scheduler`; every response body is JSON.

pub mod assessment;
pub mod auth;
pub mod correlation;
pub mod events;
pub mod fluency;
pub mod health;
pub mod queue;
pub mod session;
pub mod user;

pub use auth::CurrentUser;
