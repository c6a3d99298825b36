//! Workspace-wide error type
//!
//! Infrastructure failures plus the data-integrity cases this system cares
//! about: the reducer replays stored rows, so a value that no longer decodes
//! (an enum string outside its set, a UUID or timestamp that will not parse)
//! is surfaced as corruption rather than a generic internal error.

use thiserror::Error;

/// Common result type for hifz operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad configuration: {0}")]
    Config(String),

    /// A stored timestamp that does not parse back. Replay determinism
    /// depends on timestamps round-tripping exactly.
    #[error("malformed timestamp '{value}': {source}")]
    Timestamp {
        value: String,
        source: chrono::ParseError,
    },

    /// A stored UTC-day string that does not parse back
    #[error("malformed UTC day '{value}': {source}")]
    Day {
        value: String,
        source: chrono::ParseError,
    },

    /// A stored row that no longer decodes into its domain type: an enum
    /// column outside its value set, an unparseable UUID, bad tag JSON.
    #[error("corrupt stored row: {0}")]
    Corrupt(String),

    /// A broken invariant that is not attributable to stored data
    #[error("internal error: {0}")]
    Internal(String),
}
