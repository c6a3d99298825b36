//! Database access for the hifz backend
//!
//! Single shared SQLite database. Schema creation is idempotent and applied
//! at startup; tests connect to `sqlite::memory:` and call
//! [`init::create_schema`] directly.

pub mod init;

pub use init::{create_schema, init_database};
