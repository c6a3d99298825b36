//! Deterministic state reducer
//!
//! Replays all REVIEW_ATTEMPTED events for a (user, ayah) pair ordered by
//! `(occurred_at, id)` and folds them into a `UserItemState`. The stored row
//! is nothing but the result of this fold, so replaying the same log twice
//! always reproduces the same row.
//!
//! Concurrency: `reduce_and_store` reads the log and upserts the row inside
//! one transaction keyed on the `(user_id, ayah_id)` primary key, so two
//! concurrent ingests for the same pair serialize at the database and the
//! stored state always matches a fresh replay of whatever got persisted.

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use hifz_common::{time, Result};

use crate::db;
use crate::models::{ItemStatus, ReviewEvent, ReviewTier, UserItemState};
use crate::scheduler::spacing::{self, Outcome};

/// Consecutive perfect UTC days required before an item holds MANZIL
pub const PROMOTION_GATE_DAYS: i64 = 7;

/// Fold a chronologically ordered event log into item state.
///
/// Returns `None` for an empty log: no events, no row.
pub fn reduce(user_id: Uuid, ayah_id: i64, events: &[ReviewEvent]) -> Option<UserItemState> {
    let first = events.first()?;

    let mut state = UserItemState {
        user_id,
        ayah_id,
        status: ItemStatus::Learning,
        tier: ReviewTier::Sabaq,
        next_review_at: first.occurred_at,
        review_interval_seconds: spacing::interval_seconds(0),
        interval_checkpoint_index: 0,
        introduced_at: first.occurred_at,
        first_memorized_at: None,
        difficulty_score: 0.0,
        total_reviews: 0,
        successful_reviews: 0,
        lapses: 0,
        success_streak: 0,
        consecutive_perfect_days: 0,
        last_perfect_day: None,
        average_duration_seconds: 0.0,
        last_errors_count: 0,
        last_reviewed_at: None,
        last_event_occurred_at: None,
    };

    for event in events {
        apply(&mut state, event);
    }

    Some(state)
}

fn apply(state: &mut UserItemState, event: &ReviewEvent) {
    let errors_count = event.errors_count.unwrap_or(0);
    let outcome = spacing::classify(event.success, errors_count);

    let new_index = spacing::next_checkpoint(state.interval_checkpoint_index, outcome);
    let interval = spacing::interval_seconds(new_index);

    state.interval_checkpoint_index = new_index;
    state.review_interval_seconds = interval;
    state.next_review_at = event.occurred_at + chrono::Duration::seconds(interval);

    state.total_reviews += 1;
    if event.success {
        state.successful_reviews += 1;
        state.success_streak += 1;
    } else {
        state.lapses += 1;
        state.success_streak = 0;
    }

    state.difficulty_score = spacing::update_difficulty(state.difficulty_score, outcome);

    // Running mean over attempt durations
    if let Some(duration) = event.duration_seconds {
        let n = state.total_reviews as f64;
        state.average_duration_seconds =
            state.average_duration_seconds + (duration as f64 - state.average_duration_seconds) / n;
    }

    // Frozen once set
    if state.first_memorized_at.is_none() && new_index >= 2 {
        state.first_memorized_at = Some(event.occurred_at);
    }

    update_promotion_gate(state, outcome, time::utc_day(&event.occurred_at));

    state.tier = effective_tier(new_index, state.consecutive_perfect_days);
    state.status = if new_index >= 2 {
        ItemStatus::Memorized
    } else {
        ItemStatus::Learning
    };

    state.last_errors_count = errors_count;
    state.last_reviewed_at = Some(event.occurred_at);
    state.last_event_occurred_at = Some(event.occurred_at);
}

/// Promotion gate bookkeeping: consecutive perfect UTC days.
fn update_promotion_gate(state: &mut UserItemState, outcome: Outcome, day: NaiveDate) {
    if outcome != Outcome::Perfect {
        state.consecutive_perfect_days = 0;
        state.last_perfect_day = None;
        return;
    }

    match state.last_perfect_day {
        None => {
            state.consecutive_perfect_days = 1;
        }
        Some(last) => {
            let gap = time::days_between(last, day);
            if gap == 1 {
                state.consecutive_perfect_days += 1;
            } else if gap > 1 {
                state.consecutive_perfect_days = 1;
            }
            // gap == 0: same UTC day, counter unchanged
        }
    }
    state.last_perfect_day = Some(day);
}

/// Checkpoint-derived tier, demoted to SABQI while the promotion gate is unmet
fn effective_tier(checkpoint_index: i64, consecutive_perfect_days: i64) -> ReviewTier {
    let tier = spacing::checkpoint_tier(checkpoint_index);
    if tier == ReviewTier::Manzil && consecutive_perfect_days < PROMOTION_GATE_DAYS {
        ReviewTier::Sabqi
    } else {
        tier
    }
}

/// Replay the event log for a (user, ayah) pair and persist the result.
///
/// Transactional: the read and the upsert happen atomically, and the fold is
/// pure, so the operation is safe to re-run after any failure.
pub async fn reduce_and_store(pool: &SqlitePool, user_id: Uuid, ayah_id: i64) -> Result<()> {
    let mut tx = pool.begin().await?;

    let events = db::events::review_events_for_item(&mut *tx, user_id, ayah_id).await?;
    let Some(state) = reduce(user_id, ayah_id, &events) else {
        tx.commit().await?;
        return Ok(());
    };

    db::item_states::upsert(&mut *tx, &state).await?;
    tx.commit().await?;

    debug!(
        user_id = %user_id,
        ayah_id,
        checkpoint = state.interval_checkpoint_index,
        tier = state.tier.as_str(),
        "item state reduced"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventType, SessionType};
    use chrono::{DateTime, Utc};

    fn ts(s: &str) -> DateTime<Utc> {
        time::parse_ts(s).unwrap()
    }

    fn event(occurred_at: &str, success: bool, errors: i64) -> ReviewEvent {
        ReviewEvent {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            session_run_id: None,
            client_event_id: None,
            event_type: EventType::ReviewAttempted,
            session_type: Some(SessionType::Sabqi),
            item_ayah_id: Some(1),
            tier: Some(ReviewTier::Sabaq),
            step_type: None,
            attempt_number: None,
            scaffolding_used: false,
            linked_ayah_id: None,
            from_ayah_id: None,
            to_ayah_id: None,
            success,
            errors_count: Some(errors),
            duration_seconds: Some(30),
            error_tags: None,
            occurred_at: ts(occurred_at),
            received_at: ts(occurred_at),
        }
    }

    #[test]
    fn test_empty_log_yields_no_state() {
        assert!(reduce(Uuid::nil(), 1, &[]).is_none());
    }

    #[test]
    fn test_perfect_ladder_climb() {
        // Eight perfect reviews on consecutive UTC days
        let events: Vec<ReviewEvent> = (1..=8)
            .map(|d| event(&format!("2026-02-{:02}T10:00:00Z", d), true, 0))
            .collect();
        let state = reduce(Uuid::nil(), 1, &events).unwrap();

        assert_eq!(state.interval_checkpoint_index, 7);
        assert_eq!(state.review_interval_seconds, 7_776_000);
        assert_eq!(state.consecutive_perfect_days, 8);
        assert_eq!(state.tier, ReviewTier::Manzil);
        assert_eq!(state.status, ItemStatus::Memorized);
        // Third perfect review reaches checkpoint 2
        assert_eq!(state.first_memorized_at, Some(ts("2026-02-03T10:00:00Z")));
        assert_eq!(state.introduced_at, ts("2026-02-01T10:00:00Z"));
        assert_eq!(
            state.next_review_at,
            ts("2026-02-08T10:00:00Z") + chrono::Duration::seconds(7_776_000)
        );
    }

    #[test]
    fn test_fail_resets_ladder() {
        let mut events: Vec<ReviewEvent> = (1..=3)
            .map(|d| event(&format!("2026-02-{:02}T10:00:00Z", d), true, 0))
            .collect();
        events.push(event("2026-02-04T10:00:00Z", false, 3));
        let state = reduce(Uuid::nil(), 1, &events).unwrap();

        assert_eq!(state.interval_checkpoint_index, 0);
        assert_eq!(state.review_interval_seconds, 14_400);
        assert_eq!(state.consecutive_perfect_days, 0);
        assert_eq!(state.last_perfect_day, None);
        assert_eq!(state.tier, ReviewTier::Sabaq);
        assert_eq!(state.lapses, 1);
        assert_eq!(state.success_streak, 0);
        // firstMemorizedAt survives the reset
        assert_eq!(state.first_memorized_at, Some(ts("2026-02-03T10:00:00Z")));
    }

    #[test]
    fn test_minor_holds_checkpoint() {
        let events = vec![
            event("2026-02-01T10:00:00Z", true, 0),
            event("2026-02-02T10:00:00Z", true, 1),
        ];
        let state = reduce(Uuid::nil(), 1, &events).unwrap();
        assert_eq!(state.interval_checkpoint_index, 1);
        // Minor review is not perfect: the day chain breaks
        assert_eq!(state.consecutive_perfect_days, 0);
    }

    #[test]
    fn test_same_day_perfects_count_once() {
        let events = vec![
            event("2026-02-01T08:00:00Z", true, 0),
            event("2026-02-01T20:00:00Z", true, 0),
        ];
        let state = reduce(Uuid::nil(), 1, &events).unwrap();
        assert_eq!(state.consecutive_perfect_days, 1);
    }

    #[test]
    fn test_day_gap_restarts_chain() {
        let events = vec![
            event("2026-02-01T10:00:00Z", true, 0),
            event("2026-02-02T10:00:00Z", true, 0),
            event("2026-02-05T10:00:00Z", true, 0),
        ];
        let state = reduce(Uuid::nil(), 1, &events).unwrap();
        assert_eq!(state.consecutive_perfect_days, 1);
        assert_eq!(state.last_perfect_day, Some(time::parse_day("2026-02-05").unwrap()));
    }

    #[test]
    fn test_manzil_demoted_without_promotion_gate() {
        // Six perfect reviews within one UTC day climb the checkpoint ladder
        // to index 6, but the gate holds the item at SABQI.
        let events: Vec<ReviewEvent> = (0..6)
            .map(|h| event(&format!("2026-02-01T{:02}:00:00Z", 8 + h), true, 0))
            .collect();
        let state = reduce(Uuid::nil(), 1, &events).unwrap();
        assert_eq!(state.interval_checkpoint_index, 6);
        assert_eq!(state.consecutive_perfect_days, 1);
        assert_eq!(state.tier, ReviewTier::Sabqi);
    }

    #[test]
    fn test_replay_determinism() {
        let events: Vec<ReviewEvent> = (1..=5)
            .map(|d| event(&format!("2026-02-{:02}T10:00:00Z", d), d % 2 == 1, (d % 3) as i64))
            .collect();
        let a = reduce(Uuid::nil(), 1, &events).unwrap();
        let b = reduce(Uuid::nil(), 1, &events).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_average_duration_running_mean() {
        let mut e1 = event("2026-02-01T10:00:00Z", true, 0);
        e1.duration_seconds = Some(10);
        let mut e2 = event("2026-02-02T10:00:00Z", true, 0);
        e2.duration_seconds = Some(30);
        let state = reduce(Uuid::nil(), 1, &[e1, e2]).unwrap();
        assert!((state.average_duration_seconds - 20.0).abs() < 1e-9);
    }
}
