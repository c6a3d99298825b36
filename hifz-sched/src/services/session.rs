//! Session lifecycle and step submission
//!
//! The session service never writes learning state directly: a valid step
//! becomes a review event with a deterministic client event id and goes
//! through the event store, so retries dedupe and a replay of the log lands
//! on the same protocol position.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use hifz_common::uuid_utils;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    EventType, NewReviewEvent, QueueMode, ReviewTier, SessionRun, SessionStatus, SessionType,
    StepType, User,
};
use crate::scheduler::protocol::{self, ProtocolProgress, StepProgress, StepStatus};
use crate::scheduler::queue::{self, QueueStatus};
use crate::services::ingest;

/// Session start request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartSessionRequest {
    pub client_session_id: Option<Uuid>,
    pub mode_override: Option<QueueMode>,
    pub warmup_override: Option<bool>,
}

/// Start (or idempotently rejoin) a session run
pub async fn start_session(
    pool: &SqlitePool,
    user: &User,
    request: StartSessionRequest,
    now: DateTime<Utc>,
) -> ApiResult<SessionRun> {
    let snapshot = queue::plan_today(pool, user, now).await?;
    if snapshot.status == QueueStatus::FluencyGateRequired {
        return Err(ApiError::GateBlocked(
            "complete the fluency gate before starting sessions".to_string(),
        ));
    }

    let abandoned = db::sessions::abandon_stale(pool, user.id, now).await?;
    if abandoned > 0 {
        info!(user_id = %user.id, abandoned, "stale active sessions abandoned");
    }

    let run = SessionRun {
        id: uuid_utils::generate(),
        user_id: user.id,
        client_session_id: request.client_session_id,
        mode: request.mode_override.unwrap_or(snapshot.mode),
        warmup_passed: request.warmup_override.unwrap_or(snapshot.warmup.passed),
        status: SessionStatus::Active,
        started_at: now,
        ended_at: None,
        events_count: 0,
        minutes_total: 0,
    };

    let run = db::sessions::start(pool, &run).await?;
    info!(user_id = %user.id, session_id = %run.id, mode = run.mode.as_str(), "session started");
    Ok(run)
}

/// Step submission request
#[derive(Debug, Clone, Deserialize)]
pub struct StepRequest {
    pub session_id: Uuid,
    pub ayah_id: i64,
    pub step_type: StepType,
    pub attempt_number: i64,
    pub success: bool,
    pub errors_count: i64,
    pub duration_seconds: i64,
    #[serde(default)]
    pub scaffolding_used: bool,
    pub linked_ayah_id: Option<i64>,
    pub error_tags: Option<Vec<String>>,
}

/// Step submission outcome
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub recorded: bool,
    pub deduplicated: bool,
    pub step_status: StepStatus,
    pub next_step: Option<StepType>,
    pub next_attempt: Option<i64>,
    pub protocol: Vec<StepProgress>,
    pub progress: ProtocolProgress,
}

/// Validate a step against the protocol position and record it
pub async fn submit_step(
    pool: &SqlitePool,
    user: &User,
    request: StepRequest,
    now: DateTime<Utc>,
) -> ApiResult<StepOutcome> {
    let run = db::sessions::find_by_id(pool, request.session_id)
        .await?
        .filter(|r| r.user_id == user.id)
        .ok_or_else(|| ApiError::NotFound(format!("session {} not found", request.session_id)))?;

    if run.status != SessionStatus::Active {
        return Err(ApiError::Conflict(format!(
            "session {} is {}, not ACTIVE",
            run.id,
            run.status.as_str()
        )));
    }

    if request.step_type == StepType::Link && request.linked_ayah_id.is_none() {
        return Err(ApiError::Validation(
            "linked_ayah_id is required for LINK steps".to_string(),
        ));
    }

    let proto = protocol::protocol_for(user.scaffolding_level);
    let counts = db::events::step_counts_for_session_ayah(pool, run.id, request.ayah_id).await?;

    if protocol::validate_step(proto, &counts, request.step_type, request.attempt_number).is_err() {
        let expected = protocol::expected(proto, &counts);
        return Err(ApiError::InvalidStepSequence {
            expected_step: expected.expected_step,
            expected_attempt: expected.expected_attempt,
            protocol: protocol::progress(proto, &counts),
        });
    }

    // Deterministic client event id: a retry of the same step dedupes, and
    // two racing submissions resolve to a single stored event.
    let client_event_id = uuid_utils::step_event_id(
        run.id,
        request.ayah_id,
        request.step_type.as_str(),
        request.attempt_number,
    );

    let outcome = ingest::ingest(
        pool,
        NewReviewEvent {
            user_id: user.id,
            session_run_id: Some(run.id),
            client_event_id: Some(client_event_id),
            event_type: EventType::ReviewAttempted,
            session_type: Some(SessionType::Sabaq),
            item_ayah_id: Some(request.ayah_id),
            tier: Some(ReviewTier::Sabaq),
            step_type: Some(request.step_type),
            attempt_number: Some(request.attempt_number),
            scaffolding_used: request.scaffolding_used,
            linked_ayah_id: request.linked_ayah_id,
            from_ayah_id: None,
            to_ayah_id: None,
            success: request.success,
            errors_count: Some(request.errors_count),
            duration_seconds: Some(request.duration_seconds),
            error_tags: request.error_tags,
            occurred_at: now,
        },
    )
    .await?;

    // Re-read the position: on a dedupe the event was already there, and on
    // a race the winning insert is what counts.
    let counts_after =
        db::events::step_counts_for_session_ayah(pool, run.id, request.ayah_id).await?;
    let expected_after = protocol::expected(proto, &counts_after);
    let step_status = protocol::step_status(proto, &counts_after, request.step_type);

    Ok(StepOutcome {
        recorded: !outcome.deduplicated,
        deduplicated: outcome.deduplicated,
        step_status,
        next_step: expected_after.expected_step,
        next_attempt: expected_after.expected_attempt,
        protocol: protocol::progress(proto, &counts_after),
        progress: protocol::completion(proto, &counts_after),
    })
}
