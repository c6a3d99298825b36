//! Assessment planner
//!
//! One-shot derivation of per-user scheduling parameters from self-report
//! inputs. Pure: the handler persists the result onto the user row.

use serde::{Deserialize, Serialize};

use crate::models::{PriorJuzBand, ProgramVariant, ScaffoldingLevel, TajwidConfidence};

/// Self-report inputs
#[derive(Debug, Clone, Deserialize)]
pub struct AssessmentInput {
    pub time_budget_minutes: i64,
    pub fluency_score: f64,
    pub tajwid_confidence: TajwidConfidence,
    pub goal: Option<String>,
    pub has_teacher: bool,
    pub prior_juz_band: PriorJuzBand,
}

/// Computed scheduling parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentPlan {
    pub scaffolding_level: ScaffoldingLevel,
    pub variant: ProgramVariant,
    pub daily_new_target_ayahs: i64,
    pub review_ratio_target: i64,
    pub retention_threshold: f64,
    pub consolidation_retention_floor: f64,
    pub backlog_freeze_ratio: f64,
    pub manzil_rotation_days: i64,
    pub avg_seconds_per_item: i64,
    pub overdue_cap_seconds: i64,
    pub recommended_minutes: Option<i64>,
    pub warning: Option<String>,
}

/// Derive the full parameter set from assessment inputs
pub fn plan(input: &AssessmentInput) -> AssessmentPlan {
    let scaffolding_level = scaffolding(input);
    let variant = variant(input);
    let daily_new_target_ayahs = daily_new_target(input, variant);

    let retention_threshold = match variant {
        ProgramVariant::Conservative => 0.88,
        ProgramVariant::Momentum => 0.82,
        ProgramVariant::Standard => 0.85,
    };

    let avg_seconds_per_item = if input.fluency_score >= 75.0 {
        55
    } else if input.fluency_score >= 50.0 {
        70
    } else {
        90
    };

    let (recommended_minutes, warning) = if input.time_budget_minutes == 15 {
        (
            Some(30),
            Some(
                "A 15-minute budget leaves little room for review; 30 minutes daily is recommended."
                    .to_string(),
            ),
        )
    } else {
        (None, None)
    };

    AssessmentPlan {
        scaffolding_level,
        variant,
        daily_new_target_ayahs,
        review_ratio_target: 70,
        retention_threshold,
        consolidation_retention_floor: (retention_threshold - 0.08).max(0.70),
        backlog_freeze_ratio: 0.8,
        manzil_rotation_days: 30,
        avg_seconds_per_item,
        overdue_cap_seconds: 48 * 3600,
        recommended_minutes,
        warning,
    }
}

fn scaffolding(input: &AssessmentInput) -> ScaffoldingLevel {
    if input.fluency_score < 75.0 || input.prior_juz_band == PriorJuzBand::Zero {
        ScaffoldingLevel::Beginner
    } else if input.fluency_score > 85.0
        && input.prior_juz_band == PriorJuzBand::FivePlus
        && input.has_teacher
    {
        ScaffoldingLevel::Minimal
    } else {
        ScaffoldingLevel::Standard
    }
}

fn variant(input: &AssessmentInput) -> ProgramVariant {
    let low_confidence = input.fluency_score < 45.0
        || input.tajwid_confidence == TajwidConfidence::Low
        || !input.has_teacher;

    if input.time_budget_minutes == 15 || low_confidence {
        ProgramVariant::Conservative
    } else if input.time_budget_minutes >= 90
        && input.fluency_score >= 70.0
        && input.tajwid_confidence != TajwidConfidence::Low
        && input.has_teacher
    {
        ProgramVariant::Momentum
    } else {
        ProgramVariant::Standard
    }
}

fn daily_new_target(input: &AssessmentInput, variant: ProgramVariant) -> i64 {
    // 15-minute budgets hard-cap at 3 regardless of variant
    if input.time_budget_minutes == 15 {
        return 3;
    }

    let mut target = match variant {
        ProgramVariant::Momentum => 10,
        ProgramVariant::Conservative => 5,
        ProgramVariant::Standard => 7,
    };

    if input.time_budget_minutes == 30 {
        target = target.min(5);
    }
    if input.time_budget_minutes >= 90 {
        target = target.max(7);
    }

    target
}
