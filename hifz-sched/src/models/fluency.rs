//! Fluency gate test lifecycle
//!
//! A page-read test: one page, reported duration and error count, scored
//! 0-100. Terminal statuses are immutable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FluencyTestStatus {
    InProgress,
    Passed,
    Failed,
}

impl FluencyTestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FluencyTestStatus::InProgress => "IN_PROGRESS",
            FluencyTestStatus::Passed => "PASSED",
            FluencyTestStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "IN_PROGRESS" => Some(FluencyTestStatus::InProgress),
            "PASSED" => Some(FluencyTestStatus::Passed),
            "FAILED" => Some(FluencyTestStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FluencyTestStatus::Passed | FluencyTestStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FluencyGateTest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: FluencyTestStatus,
    pub test_page: i64,
    pub duration_seconds: Option<i64>,
    pub error_count: Option<i64>,
    pub fluency_score: Option<f64>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
