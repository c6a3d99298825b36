//! 3x3 step-sequence protocol
//!
//! The canonical memorization pass over one ayah is a fixed sequence of
//! steps (EXPOSURE, GUIDED, BLIND, LINK), each repeated a fixed number of
//! attempts. Scaffolding level selects the variant; optional steps may be
//! skipped once all mandatory pre-BLIND work is satisfied.
//!
//! Protocol state is never stored directly: it is the multiset of
//! (step, attempt) pairs already recorded as events in the session, so a
//! replay of the event log reproduces the same position.

use serde::Serialize;
use std::collections::HashMap;

use crate::models::{ScaffoldingLevel, StepType};

/// One step slot in a protocol
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProtocolStep {
    pub step: StepType,
    pub attempts: i64,
    pub optional: bool,
}

/// Ordered protocol for a scaffolding level
pub fn protocol_for(level: ScaffoldingLevel) -> &'static [ProtocolStep] {
    const BEGINNER: &[ProtocolStep] = &[
        ProtocolStep { step: StepType::Exposure, attempts: 3, optional: false },
        ProtocolStep { step: StepType::Guided, attempts: 3, optional: false },
        ProtocolStep { step: StepType::Blind, attempts: 3, optional: false },
        ProtocolStep { step: StepType::Link, attempts: 3, optional: false },
    ];
    const STANDARD: &[ProtocolStep] = &[
        ProtocolStep { step: StepType::Exposure, attempts: 3, optional: false },
        ProtocolStep { step: StepType::Guided, attempts: 1, optional: false },
        ProtocolStep { step: StepType::Blind, attempts: 3, optional: false },
        ProtocolStep { step: StepType::Link, attempts: 3, optional: false },
    ];
    const MINIMAL: &[ProtocolStep] = &[
        ProtocolStep { step: StepType::Exposure, attempts: 3, optional: true },
        ProtocolStep { step: StepType::Guided, attempts: 3, optional: true },
        ProtocolStep { step: StepType::Blind, attempts: 3, optional: false },
        ProtocolStep { step: StepType::Link, attempts: 3, optional: false },
    ];

    match level {
        ScaffoldingLevel::Beginner => BEGINNER,
        ScaffoldingLevel::Standard => STANDARD,
        ScaffoldingLevel::Minimal => MINIMAL,
    }
}

/// Where the protocol stands given observed attempt counts
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Expected {
    pub completed: bool,
    pub expected_step: Option<StepType>,
    pub expected_attempt: Option<i64>,
}

/// First non-optional step whose observed count is below its required
/// attempts; completed when every mandatory step is satisfied.
pub fn expected(protocol: &[ProtocolStep], counts: &HashMap<StepType, i64>) -> Expected {
    for slot in protocol {
        if slot.optional {
            continue;
        }
        let observed = counts.get(&slot.step).copied().unwrap_or(0);
        if observed < slot.attempts {
            return Expected {
                completed: false,
                expected_step: Some(slot.step),
                expected_attempt: Some(observed + 1),
            };
        }
    }
    Expected {
        completed: true,
        expected_step: None,
        expected_attempt: None,
    }
}

/// Why a submission was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepRejection {
    /// All mandatory steps already satisfied for this ayah
    AyahComplete,
    /// Step/attempt does not match the expected position
    OutOfSequence,
}

/// Validate a submitted (step, attempt) against the session's observed counts
pub fn validate_step(
    protocol: &[ProtocolStep],
    counts: &HashMap<StepType, i64>,
    step: StepType,
    attempt: i64,
) -> Result<(), StepRejection> {
    let exp = expected(protocol, counts);
    if exp.completed {
        return Err(StepRejection::AyahComplete);
    }

    if let Some(slot) = protocol.iter().find(|s| s.step == step && s.optional) {
        // Optional steps are allowed only once all mandatory pre-BLIND work
        // is met, and only in their own attempt order, within budget.
        if exp.expected_step != Some(StepType::Blind) {
            return Err(StepRejection::OutOfSequence);
        }
        let observed = counts.get(&step).copied().unwrap_or(0);
        if attempt != observed + 1 || attempt > slot.attempts {
            return Err(StepRejection::OutOfSequence);
        }
        return Ok(());
    }

    if Some(step) != exp.expected_step || Some(attempt) != exp.expected_attempt {
        return Err(StepRejection::OutOfSequence);
    }

    Ok(())
}

/// Step status reported back after a valid submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    InProgress,
    StepComplete,
    AyahComplete,
}

/// Classify the position after recording (step, attempt)
pub fn step_status(
    protocol: &[ProtocolStep],
    counts_after: &HashMap<StepType, i64>,
    step: StepType,
) -> StepStatus {
    let exp = expected(protocol, counts_after);
    if exp.completed {
        return StepStatus::AyahComplete;
    }
    let slot_attempts = protocol
        .iter()
        .find(|s| s.step == step)
        .map(|s| s.attempts)
        .unwrap_or(0);
    let observed = counts_after.get(&step).copied().unwrap_or(0);
    if observed >= slot_attempts {
        StepStatus::StepComplete
    } else {
        StepStatus::InProgress
    }
}

/// Per-step progress summary included in protocol responses
#[derive(Debug, Clone, Serialize)]
pub struct StepProgress {
    pub step: StepType,
    pub required_attempts: i64,
    pub observed_attempts: i64,
    pub optional: bool,
}

pub fn progress(protocol: &[ProtocolStep], counts: &HashMap<StepType, i64>) -> Vec<StepProgress> {
    protocol
        .iter()
        .map(|slot| StepProgress {
            step: slot.step,
            required_attempts: slot.attempts,
            observed_attempts: counts.get(&slot.step).copied().unwrap_or(0),
            optional: slot.optional,
        })
        .collect()
}

/// Mandatory attempts done vs required across the whole protocol
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProtocolProgress {
    pub completed_attempts: i64,
    pub required_attempts: i64,
}

pub fn completion(protocol: &[ProtocolStep], counts: &HashMap<StepType, i64>) -> ProtocolProgress {
    let mut completed = 0;
    let mut required = 0;
    for slot in protocol {
        if slot.optional {
            continue;
        }
        required += slot.attempts;
        completed += counts.get(&slot.step).copied().unwrap_or(0).min(slot.attempts);
    }
    ProtocolProgress {
        completed_attempts: completed,
        required_attempts: required,
    }
}
