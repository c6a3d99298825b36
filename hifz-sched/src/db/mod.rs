//! Database access for hifz-sched
//!
//! One query module per entity. All SQL is inline; rows are mapped by hand
//! into the domain models. Timestamps round-trip through the fixed-width
//! RFC 3339 helpers in `hifz_common::time`.

pub mod ayahs;
pub mod daily_sessions;
pub mod events;
pub mod fluency;
pub mod item_states;
pub mod sessions;
pub mod transitions;
pub mod users;

use hifz_common::{Error, Result};
use uuid::Uuid;

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::Corrupt(format!("uuid '{}': {}", s, e)))
}

pub(crate) fn parse_uuid_opt(s: Option<String>) -> Result<Option<Uuid>> {
    s.map(|s| parse_uuid(&s)).transpose()
}

pub(crate) fn parse_ts_opt(
    s: Option<String>,
) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
    s.map(|s| hifz_common::time::parse_ts(&s)).transpose()
}
