//! Daily session rollup
//!
//! Runs when a session completes: single-shot ACTIVE -> COMPLETED transition,
//! aggregates over the session's review events, and an upsert into the
//! per-(user, UTC day) daily_sessions row. On a same-day conflict the three
//! counters accumulate and the planner snapshot columns are overwritten.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use hifz_common::{time, uuid_utils};

use crate::db;
use crate::error::ApiError;
use crate::models::{DailySession, EventType, SessionStatus, User};
use crate::scheduler::queue::{self, QueueStatus, TodayQueue};

/// Aggregates computed from one session's events
#[derive(Debug, Clone, Copy)]
struct SessionTotals {
    reviews_total: i64,
    reviews_successful: i64,
    retention_score: f64,
    minutes_total: i64,
}

/// Complete a session run and upsert the day's aggregate.
///
/// Fails with `NotFound` when the run does not exist for this user,
/// `Conflict` when it is no longer ACTIVE, and `GateBlocked` when the user
/// has become fluency-gate-blocked since the session started.
pub async fn complete_session(
    pool: &SqlitePool,
    user: &User,
    session_id: Uuid,
    now: DateTime<Utc>,
) -> std::result::Result<DailySession, ApiError> {
    let run = db::sessions::find_by_id(pool, session_id)
        .await?
        .filter(|r| r.user_id == user.id)
        .ok_or_else(|| ApiError::NotFound(format!("session {} not found", session_id)))?;

    if run.status != SessionStatus::Active {
        return Err(ApiError::Conflict(format!(
            "session {} is {}, not ACTIVE",
            session_id,
            run.status.as_str()
        )));
    }

    // Completion-time queue re-evaluation: snapshot for the aggregate, and
    // the gate re-check that rejects completion for blocked users.
    let snapshot = queue::plan_today(pool, user, now).await?;
    if snapshot.status == QueueStatus::FluencyGateRequired {
        return Err(ApiError::GateBlocked(
            "fluency gate must be completed before closing sessions".to_string(),
        ));
    }

    let events = db::events::review_events_for_session(pool, session_id).await?;
    let totals = session_totals(
        events
            .iter()
            .filter(|e| e.event_type == EventType::ReviewAttempted),
    );

    // Single-shot transition; a concurrent completion loses the CAS
    let transitioned =
        db::sessions::complete(pool, session_id, now, totals.minutes_total).await?;
    if !transitioned {
        return Err(ApiError::Conflict(format!(
            "session {} was completed concurrently",
            session_id
        )));
    }

    let today = time::utc_day(&now);
    let new_ayahs_memorized =
        db::item_states::memorized_since(pool, user.id, time::day_start(today)).await?;

    let daily = build_daily(user.id, today, &snapshot, totals, new_ayahs_memorized);
    db::daily_sessions::upsert(pool, &daily).await?;

    info!(
        user_id = %user.id,
        session_id = %session_id,
        reviews = totals.reviews_total,
        retention = totals.retention_score,
        "session completed"
    );

    // Return the stored row so accumulated counters are reflected
    let stored = db::daily_sessions::find_by_day(pool, user.id, today)
        .await?
        .unwrap_or(daily);
    Ok(stored)
}

fn session_totals<'a, I>(events: I) -> SessionTotals
where
    I: Iterator<Item = &'a crate::models::ReviewEvent>,
{
    let mut reviews_total = 0;
    let mut reviews_successful = 0;
    let mut duration_seconds = 0;

    for event in events {
        reviews_total += 1;
        if event.success {
            reviews_successful += 1;
        }
        duration_seconds += event.duration_seconds.unwrap_or(0);
    }

    let retention_score = if reviews_total == 0 {
        1.0
    } else {
        reviews_successful as f64 / reviews_total as f64
    };

    SessionTotals {
        reviews_total,
        reviews_successful,
        retention_score,
        minutes_total: (duration_seconds + 59) / 60,
    }
}

fn build_daily(
    user_id: Uuid,
    today: chrono::NaiveDate,
    snapshot: &TodayQueue,
    totals: SessionTotals,
    new_ayahs_memorized: i64,
) -> DailySession {
    DailySession {
        id: uuid_utils::generate(),
        user_id,
        session_date: today,
        mode: snapshot.mode,
        retention_score: totals.retention_score,
        backlog_minutes_estimate: snapshot.debt.backlog_minutes_estimate,
        overdue_days_max: snapshot.debt.overdue_days_max,
        minutes_total: totals.minutes_total,
        reviews_total: totals.reviews_total,
        reviews_successful: totals.reviews_successful,
        new_ayahs_memorized,
        warmup_passed: snapshot.warmup.passed,
        sabaq_allowed: snapshot.sabaq_task.allowed,
    }
}
