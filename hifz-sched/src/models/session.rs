//! Session runs and daily aggregates

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Today-queue mode selected by the planner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueMode {
    Normal,
    Consolidation,
    ReviewOnly,
}

impl QueueMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueMode::Normal => "NORMAL",
            QueueMode::Consolidation => "CONSOLIDATION",
            QueueMode::ReviewOnly => "REVIEW_ONLY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NORMAL" => Some(QueueMode::Normal),
            "CONSOLIDATION" => Some(QueueMode::Consolidation),
            "REVIEW_ONLY" => Some(QueueMode::ReviewOnly),
            _ => None,
        }
    }
}

/// Session run lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    Active,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "ACTIVE",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::Abandoned => "ABANDONED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(SessionStatus::Active),
            "COMPLETED" => Some(SessionStatus::Completed),
            "ABANDONED" => Some(SessionStatus::Abandoned),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Abandoned)
    }
}

/// One user sitting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRun {
    pub id: Uuid,
    pub user_id: Uuid,
    pub client_session_id: Option<Uuid>,
    pub mode: QueueMode,
    pub warmup_passed: bool,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub events_count: i64,
    pub minutes_total: i64,
}

/// Aggregate per (user, UTC day), written on session completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_date: NaiveDate,
    pub mode: QueueMode,
    pub retention_score: f64,
    pub backlog_minutes_estimate: i64,
    pub overdue_days_max: i64,
    pub minutes_total: i64,
    pub reviews_total: i64,
    pub reviews_successful: i64,
    pub new_ayahs_memorized: i64,
    pub warmup_passed: bool,
    pub sabaq_allowed: bool,
}
