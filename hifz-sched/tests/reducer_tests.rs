//! Reducer integration tests
//!
//! Events flow through the ingest service into the store, the reducer
//! replays them, and the stored item state must always equal a fresh
//! replay of the log.

mod helpers;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use hifz_sched::db;
use hifz_sched::models::{
    EventType, ItemStatus, NewReviewEvent, ReviewTier, SessionType,
};
use hifz_sched::scheduler::reducer;
use hifz_sched::services::ingest;

use helpers::{insert_user, seed_ayahs, setup_pool, test_user, ts};

fn review_event(
    user_id: Uuid,
    ayah_id: i64,
    occurred_at: DateTime<Utc>,
    success: bool,
    errors_count: i64,
) -> NewReviewEvent {
    NewReviewEvent {
        user_id,
        session_run_id: None,
        client_event_id: Some(Uuid::new_v4()),
        event_type: EventType::ReviewAttempted,
        session_type: Some(SessionType::Sabqi),
        item_ayah_id: Some(ayah_id),
        tier: Some(ReviewTier::Sabqi),
        step_type: None,
        attempt_number: None,
        scaffolding_used: false,
        linked_ayah_id: None,
        from_ayah_id: None,
        to_ayah_id: None,
        success,
        errors_count: Some(errors_count),
        duration_seconds: Some(25),
        error_tags: None,
        occurred_at,
    }
}

async fn ingest_event(pool: &SqlitePool, event: NewReviewEvent) {
    ingest::ingest(pool, event).await.expect("Should ingest event");
}

// =============================================================================
// Ladder scenarios
// =============================================================================

#[tokio::test]
async fn test_perfect_ladder_climb_end_to_end() {
    let pool = setup_pool().await;
    let user = test_user();
    insert_user(&pool, &user).await;
    seed_ayahs(&pool, 1, 7, 1, 1).await;

    // Eight perfect reviews across consecutive UTC days
    for day in 1..=8 {
        let occurred = ts(&format!("2026-02-{:02}T10:00:00Z", day));
        ingest_event(&pool, review_event(user.id, 1, occurred, true, 0)).await;
    }

    let state = db::item_states::find(&pool, user.id, 1)
        .await
        .unwrap()
        .expect("Item state should exist");

    assert_eq!(state.interval_checkpoint_index, 7);
    assert_eq!(state.review_interval_seconds, 7_776_000);
    assert_eq!(state.consecutive_perfect_days, 8);
    assert_eq!(state.tier, ReviewTier::Manzil);
    assert_eq!(state.status, ItemStatus::Memorized);
    assert_eq!(state.first_memorized_at, Some(ts("2026-02-03T10:00:00Z")));
    assert_eq!(state.total_reviews, 8);
    assert_eq!(state.successful_reviews, 8);
    assert_eq!(state.lapses, 0);
}

#[tokio::test]
async fn test_fail_resets_to_base_of_ladder() {
    let pool = setup_pool().await;
    let user = test_user();
    insert_user(&pool, &user).await;
    seed_ayahs(&pool, 1, 7, 1, 1).await;

    for day in 1..=3 {
        let occurred = ts(&format!("2026-02-{:02}T10:00:00Z", day));
        ingest_event(&pool, review_event(user.id, 2, occurred, true, 0)).await;
    }
    ingest_event(
        &pool,
        review_event(user.id, 2, ts("2026-02-04T10:00:00Z"), false, 3),
    )
    .await;

    let state = db::item_states::find(&pool, user.id, 2)
        .await
        .unwrap()
        .expect("Item state should exist");

    assert_eq!(state.interval_checkpoint_index, 0);
    assert_eq!(state.review_interval_seconds, 14_400);
    assert_eq!(state.consecutive_perfect_days, 0);
    assert_eq!(state.last_perfect_day, None);
    assert_eq!(state.tier, ReviewTier::Sabaq);
    assert_eq!(state.lapses, 1);
    assert_eq!(state.status, ItemStatus::Learning);
}

// =============================================================================
// Replay invariants
// =============================================================================

#[tokio::test]
async fn test_stored_state_matches_fresh_replay() {
    let pool = setup_pool().await;
    let user = test_user();
    insert_user(&pool, &user).await;
    seed_ayahs(&pool, 1, 7, 1, 1).await;

    let outcomes = [(true, 0), (true, 1), (false, 4), (true, 0), (true, 2)];
    for (day, (success, errors)) in outcomes.iter().enumerate() {
        let occurred = ts(&format!("2026-02-{:02}T09:30:00Z", day + 1));
        ingest_event(&pool, review_event(user.id, 3, occurred, *success, *errors)).await;
    }

    let stored = db::item_states::find(&pool, user.id, 3)
        .await
        .unwrap()
        .expect("Item state should exist");

    let events = db::events::review_events_for_item(&pool, user.id, 3)
        .await
        .unwrap();
    let replayed = reducer::reduce(user.id, 3, &events).expect("Replay should produce state");

    assert_eq!(stored, replayed);

    // Re-running the reducer changes nothing
    reducer::reduce_and_store(&pool, user.id, 3).await.unwrap();
    let after = db::item_states::find(&pool, user.id, 3)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, after);
}

#[tokio::test]
async fn test_first_memorized_at_is_frozen() {
    let pool = setup_pool().await;
    let user = test_user();
    insert_user(&pool, &user).await;
    seed_ayahs(&pool, 1, 7, 1, 1).await;

    for day in 1..=3 {
        let occurred = ts(&format!("2026-02-{:02}T10:00:00Z", day));
        ingest_event(&pool, review_event(user.id, 4, occurred, true, 0)).await;
    }
    let first = db::item_states::find(&pool, user.id, 4)
        .await
        .unwrap()
        .unwrap()
        .first_memorized_at
        .expect("Should be memorized after third perfect review");

    // Fail, then climb back: the original timestamp must survive
    ingest_event(
        &pool,
        review_event(user.id, 4, ts("2026-02-04T10:00:00Z"), false, 5),
    )
    .await;
    for day in 5..=8 {
        let occurred = ts(&format!("2026-02-{:02}T10:00:00Z", day));
        ingest_event(&pool, review_event(user.id, 4, occurred, true, 0)).await;
    }

    let state = db::item_states::find(&pool, user.id, 4)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.first_memorized_at, Some(first));
    assert!(state.interval_checkpoint_index >= 2);
}

#[tokio::test]
async fn test_sparse_state_rows() {
    let pool = setup_pool().await;
    let user = test_user();
    insert_user(&pool, &user).await;
    seed_ayahs(&pool, 1, 7, 1, 1).await;

    ingest_event(&pool, review_event(user.id, 5, ts("2026-02-01T10:00:00Z"), true, 0)).await;

    // Only the reviewed ayah has a row
    assert!(db::item_states::find(&pool, user.id, 5).await.unwrap().is_some());
    assert!(db::item_states::find(&pool, user.id, 6).await.unwrap().is_none());
    let all = db::item_states::all_for_user(&pool, user.id).await.unwrap();
    assert_eq!(all.len(), 1);
}

// =============================================================================
// Idempotent ingest
// =============================================================================

#[tokio::test]
async fn test_duplicate_client_event_id_is_noop() {
    let pool = setup_pool().await;
    let user = test_user();
    insert_user(&pool, &user).await;
    seed_ayahs(&pool, 1, 7, 1, 1).await;

    let client_event_id = Uuid::parse_str("5a3c9566-617e-4ad0-80e8-81a4616d57a7").unwrap();
    let mut event = review_event(user.id, 1, ts("2026-02-01T10:00:00Z"), true, 0);
    event.client_event_id = Some(client_event_id);

    let first = ingest::ingest(&pool, event.clone()).await.unwrap();
    assert!(!first.deduplicated);
    assert!(first.event_id.is_some());

    let second = ingest::ingest(&pool, event).await.unwrap();
    assert!(second.deduplicated);
    assert!(second.event_id.is_none());

    assert_eq!(db::events::count_for_user(&pool, user.id).await.unwrap(), 1);

    // Side effects ran exactly once
    let state = db::item_states::find(&pool, user.id, 1).await.unwrap().unwrap();
    assert_eq!(state.total_reviews, 1);
}

// =============================================================================
// Transition scores
// =============================================================================

#[tokio::test]
async fn test_link_step_updates_transition_score() {
    let pool = setup_pool().await;
    let user = test_user();
    insert_user(&pool, &user).await;
    seed_ayahs(&pool, 1, 7, 1, 1).await;

    let mut event = review_event(user.id, 1, ts("2026-02-01T10:00:00Z"), true, 0);
    event.step_type = Some(hifz_sched::models::StepType::Link);
    event.linked_ayah_id = Some(2);
    ingest_event(&pool, event).await;

    let mut event = review_event(user.id, 1, ts("2026-02-01T10:05:00Z"), false, 3);
    event.step_type = Some(hifz_sched::models::StepType::Link);
    event.linked_ayah_id = Some(2);
    ingest_event(&pool, event).await;

    let score = db::transitions::find(&pool, user.id, 1, 2)
        .await
        .unwrap()
        .expect("Transition score should exist");
    assert_eq!(score.attempt_count, 2);
    assert_eq!(score.success_count, 1);
}

#[tokio::test]
async fn test_transition_attempted_event_updates_score() {
    let pool = setup_pool().await;
    let user = test_user();
    insert_user(&pool, &user).await;
    seed_ayahs(&pool, 1, 7, 1, 1).await;

    for success in [true, true, false] {
        let event = NewReviewEvent {
            user_id: user.id,
            session_run_id: None,
            client_event_id: Some(Uuid::new_v4()),
            event_type: EventType::TransitionAttempted,
            session_type: None,
            item_ayah_id: None,
            tier: None,
            step_type: None,
            attempt_number: None,
            scaffolding_used: false,
            linked_ayah_id: None,
            from_ayah_id: Some(3),
            to_ayah_id: Some(4),
            success,
            errors_count: None,
            duration_seconds: None,
            error_tags: None,
            occurred_at: ts("2026-02-01T10:00:00Z"),
        };
        ingest_event(&pool, event).await;
    }

    let score = db::transitions::find(&pool, user.id, 3, 4)
        .await
        .unwrap()
        .expect("Transition score should exist");
    assert_eq!(score.attempt_count, 3);
    assert_eq!(score.success_count, 2);
    assert!(score.success_count <= score.attempt_count);

    // No item state was created for a transition-only pair
    assert!(db::item_states::find(&pool, user.id, 3).await.unwrap().is_none());
}
