//! Per-(user, ayah) learning state
//!
//! A `UserItemState` row is a pure function of the ordered REVIEW_ATTEMPTED
//! events for that pair; the reducer is the only writer. Rows are created
//! sparsely, when the first event for the pair is reduced.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Item lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemStatus {
    Learning,
    Memorized,
    Reviewing,
    Paused,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Learning => "LEARNING",
            ItemStatus::Memorized => "MEMORIZED",
            ItemStatus::Reviewing => "REVIEWING",
            ItemStatus::Paused => "PAUSED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LEARNING" => Some(ItemStatus::Learning),
            "MEMORIZED" => Some(ItemStatus::Memorized),
            "REVIEWING" => Some(ItemStatus::Reviewing),
            "PAUSED" => Some(ItemStatus::Paused),
            _ => None,
        }
    }
}

/// Review tier: new material, active review, long-term retention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReviewTier {
    Sabaq,
    Sabqi,
    Manzil,
}

impl ReviewTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewTier::Sabaq => "SABAQ",
            ReviewTier::Sabqi => "SABQI",
            ReviewTier::Manzil => "MANZIL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SABAQ" => Some(ReviewTier::Sabaq),
            "SABQI" => Some(ReviewTier::Sabqi),
            "MANZIL" => Some(ReviewTier::Manzil),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserItemState {
    pub user_id: Uuid,
    pub ayah_id: i64,
    pub status: ItemStatus,
    pub tier: ReviewTier,
    pub next_review_at: DateTime<Utc>,
    pub review_interval_seconds: i64,
    pub interval_checkpoint_index: i64,
    pub introduced_at: DateTime<Utc>,
    pub first_memorized_at: Option<DateTime<Utc>>,
    pub difficulty_score: f64,
    pub total_reviews: i64,
    pub successful_reviews: i64,
    pub lapses: i64,
    pub success_streak: i64,
    pub consecutive_perfect_days: i64,
    pub last_perfect_day: Option<NaiveDate>,
    pub average_duration_seconds: f64,
    pub last_errors_count: i64,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub last_event_occurred_at: Option<DateTime<Utc>>,
}

impl UserItemState {
    /// Seconds overdue relative to `now` (0 when not yet due)
    pub fn overdue_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.next_review_at).num_seconds().max(0)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at <= now
    }
}
