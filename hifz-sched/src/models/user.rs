//! User identity and scheduling parameters
//!
//! Scheduling parameters are mutated only by assessment submission or by
//! fluency-gate completion; everything else reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How much scaffolding the step protocol provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScaffoldingLevel {
    Beginner,
    Standard,
    Minimal,
}

impl ScaffoldingLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScaffoldingLevel::Beginner => "BEGINNER",
            ScaffoldingLevel::Standard => "STANDARD",
            ScaffoldingLevel::Minimal => "MINIMAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BEGINNER" => Some(ScaffoldingLevel::Beginner),
            "STANDARD" => Some(ScaffoldingLevel::Standard),
            "MINIMAL" => Some(ScaffoldingLevel::Minimal),
            _ => None,
        }
    }
}

/// Program pacing variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProgramVariant {
    Conservative,
    Standard,
    Momentum,
}

impl ProgramVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramVariant::Conservative => "CONSERVATIVE",
            ProgramVariant::Standard => "STANDARD",
            ProgramVariant::Momentum => "MOMENTUM",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CONSERVATIVE" => Some(ProgramVariant::Conservative),
            "STANDARD" => Some(ProgramVariant::Standard),
            "MOMENTUM" => Some(ProgramVariant::Momentum),
            _ => None,
        }
    }
}

/// Self-reported prior memorization experience, in juz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriorJuzBand {
    Zero,
    OneToFive,
    FivePlus,
}

impl PriorJuzBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorJuzBand::Zero => "ZERO",
            PriorJuzBand::OneToFive => "ONE_TO_FIVE",
            PriorJuzBand::FivePlus => "FIVE_PLUS",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ZERO" => Some(PriorJuzBand::Zero),
            "ONE_TO_FIVE" => Some(PriorJuzBand::OneToFive),
            "FIVE_PLUS" => Some(PriorJuzBand::FivePlus),
            _ => None,
        }
    }
}

/// Self-reported tajwid confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TajwidConfidence {
    Low,
    Medium,
    High,
}

impl TajwidConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            TajwidConfidence::Low => "LOW",
            TajwidConfidence::Medium => "MEDIUM",
            TajwidConfidence::High => "HIGH",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LOW" => Some(TajwidConfidence::Low),
            "MEDIUM" => Some(TajwidConfidence::Medium),
            "HIGH" => Some(TajwidConfidence::High),
            _ => None,
        }
    }
}

/// User row: identity plus the scheduling parameters the planner reads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub time_budget_minutes: i64,
    pub fluency_score: Option<f64>,
    pub fluency_gate_passed: bool,
    pub requires_pre_hifz: bool,
    pub scaffolding_level: ScaffoldingLevel,
    pub variant: ProgramVariant,
    pub daily_new_target_ayahs: i64,
    pub review_ratio_target: i64,
    pub retention_threshold: f64,
    pub backlog_freeze_ratio: f64,
    pub consolidation_retention_floor: f64,
    pub manzil_rotation_days: i64,
    pub avg_seconds_per_item: i64,
    pub overdue_cap_seconds: i64,
    pub prior_juz_band: Option<PriorJuzBand>,
    pub goal: Option<String>,
    pub has_teacher: bool,
    pub tajwid_confidence: Option<TajwidConfidence>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether the fluency gate still blocks this user from the queue
    pub fn gate_blocked(&self) -> bool {
        self.requires_pre_hifz || !self.fluency_gate_passed
    }
}
