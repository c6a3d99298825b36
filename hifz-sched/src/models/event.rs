//! Review event log entries
//!
//! `ReviewEvent` is a sum type carried in one table with a discriminator
//! column; check constraints in the schema enforce the per-variant shape.
//! Events are append-only: inserted once, never updated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::item_state::ReviewTier;

/// Event discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    ReviewAttempted,
    TransitionAttempted,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ReviewAttempted => "REVIEW_ATTEMPTED",
            EventType::TransitionAttempted => "TRANSITION_ATTEMPTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "REVIEW_ATTEMPTED" => Some(EventType::ReviewAttempted),
            "TRANSITION_ATTEMPTED" => Some(EventType::TransitionAttempted),
            _ => None,
        }
    }
}

/// Protocol step kind for a review attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepType {
    Exposure,
    Guided,
    Blind,
    Link,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Exposure => "EXPOSURE",
            StepType::Guided => "GUIDED",
            StepType::Blind => "BLIND",
            StepType::Link => "LINK",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "EXPOSURE" => Some(StepType::Exposure),
            "GUIDED" => Some(StepType::Guided),
            "BLIND" => Some(StepType::Blind),
            "LINK" => Some(StepType::Link),
            _ => None,
        }
    }
}

/// Which part of the day's work produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionType {
    Sabaq,
    Sabqi,
    Manzil,
    Warmup,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Sabaq => "SABAQ",
            SessionType::Sabqi => "SABQI",
            SessionType::Manzil => "MANZIL",
            SessionType::Warmup => "WARMUP",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SABAQ" => Some(SessionType::Sabaq),
            "SABQI" => Some(SessionType::Sabqi),
            "MANZIL" => Some(SessionType::Manzil),
            "WARMUP" => Some(SessionType::Warmup),
            _ => None,
        }
    }
}

/// Stored event row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_run_id: Option<Uuid>,
    pub client_event_id: Option<Uuid>,
    pub event_type: EventType,
    pub session_type: Option<SessionType>,
    pub item_ayah_id: Option<i64>,
    pub tier: Option<ReviewTier>,
    pub step_type: Option<StepType>,
    pub attempt_number: Option<i64>,
    pub scaffolding_used: bool,
    pub linked_ayah_id: Option<i64>,
    pub from_ayah_id: Option<i64>,
    pub to_ayah_id: Option<i64>,
    pub success: bool,
    pub errors_count: Option<i64>,
    pub duration_seconds: Option<i64>,
    pub error_tags: Option<Vec<String>>,
    pub occurred_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
}

/// Event submitted for ingestion (id and received_at assigned by the store)
#[derive(Debug, Clone)]
pub struct NewReviewEvent {
    pub user_id: Uuid,
    pub session_run_id: Option<Uuid>,
    pub client_event_id: Option<Uuid>,
    pub event_type: EventType,
    pub session_type: Option<SessionType>,
    pub item_ayah_id: Option<i64>,
    pub tier: Option<ReviewTier>,
    pub step_type: Option<StepType>,
    pub attempt_number: Option<i64>,
    pub scaffolding_used: bool,
    pub linked_ayah_id: Option<i64>,
    pub from_ayah_id: Option<i64>,
    pub to_ayah_id: Option<i64>,
    pub success: bool,
    pub errors_count: Option<i64>,
    pub duration_seconds: Option<i64>,
    pub error_tags: Option<Vec<String>>,
    pub occurred_at: DateTime<Utc>,
}

impl NewReviewEvent {
    /// Shape validation mirroring the schema check constraints, so malformed
    /// submissions fail with a field-level message instead of a db error.
    pub fn validate(&self) -> Result<(), String> {
        match self.event_type {
            EventType::ReviewAttempted => {
                if self.item_ayah_id.is_none() {
                    return Err("item_ayah_id is required for REVIEW_ATTEMPTED".into());
                }
                if self.tier.is_none() {
                    return Err("tier is required for REVIEW_ATTEMPTED".into());
                }
                match self.errors_count {
                    None => return Err("errors_count is required for REVIEW_ATTEMPTED".into()),
                    Some(n) if n < 0 => return Err("errors_count must be >= 0".into()),
                    _ => {}
                }
                match self.duration_seconds {
                    None => return Err("duration_seconds is required for REVIEW_ATTEMPTED".into()),
                    Some(n) if n <= 0 => return Err("duration_seconds must be > 0".into()),
                    _ => {}
                }
            }
            EventType::TransitionAttempted => {
                if self.from_ayah_id.is_none() || self.to_ayah_id.is_none() {
                    return Err("from_ayah_id and to_ayah_id are required for TRANSITION_ATTEMPTED".into());
                }
            }
        }

        if let Some(n) = self.attempt_number {
            if !(1..=3).contains(&n) {
                return Err("attempt_number must be in 1..=3".into());
            }
        }

        if self.step_type == Some(StepType::Link) && self.linked_ayah_id.is_none() {
            return Err("linked_ayah_id is required when step_type is LINK".into());
        }

        for id in [self.item_ayah_id, self.linked_ayah_id, self.from_ayah_id, self.to_ayah_id]
            .into_iter()
            .flatten()
        {
            if !(1..=super::ayah::TOTAL_AYAHS).contains(&id) {
                return Err(format!("ayah id {} out of range", id));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn review_event() -> NewReviewEvent {
        NewReviewEvent {
            user_id: Uuid::new_v4(),
            session_run_id: None,
            client_event_id: None,
            event_type: EventType::ReviewAttempted,
            session_type: Some(SessionType::Sabqi),
            item_ayah_id: Some(1),
            tier: Some(ReviewTier::Sabqi),
            step_type: None,
            attempt_number: None,
            scaffolding_used: false,
            linked_ayah_id: None,
            from_ayah_id: None,
            to_ayah_id: None,
            success: true,
            errors_count: Some(0),
            duration_seconds: Some(20),
            error_tags: None,
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn test_valid_review_event() {
        assert!(review_event().validate().is_ok());
    }

    #[test]
    fn test_review_event_requires_duration() {
        let mut ev = review_event();
        ev.duration_seconds = None;
        assert!(ev.validate().is_err());
        ev.duration_seconds = Some(0);
        assert!(ev.validate().is_err());
    }

    #[test]
    fn test_link_step_requires_linked_ayah() {
        let mut ev = review_event();
        ev.step_type = Some(StepType::Link);
        assert!(ev.validate().is_err());
        ev.linked_ayah_id = Some(2);
        assert!(ev.validate().is_ok());
    }

    #[test]
    fn test_transition_event_requires_pair() {
        let mut ev = review_event();
        ev.event_type = EventType::TransitionAttempted;
        ev.item_ayah_id = None;
        ev.tier = None;
        assert!(ev.validate().is_err());
        ev.from_ayah_id = Some(1);
        ev.to_ayah_id = Some(2);
        assert!(ev.validate().is_ok());
    }

    #[test]
    fn test_ayah_id_range() {
        let mut ev = review_event();
        ev.item_ayah_id = Some(6237);
        assert!(ev.validate().is_err());
    }
}
