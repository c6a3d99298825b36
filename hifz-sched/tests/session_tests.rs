//! Session protocol and rollup integration tests

mod helpers;

use sqlx::SqlitePool;
use uuid::Uuid;

use hifz_sched::db;
use hifz_sched::error::ApiError;
use hifz_sched::models::{ScaffoldingLevel, SessionStatus, StepType, User};
use hifz_sched::scheduler::protocol::StepStatus;
use hifz_sched::scheduler::rollup;
use hifz_sched::services::session::{self, StartSessionRequest, StepRequest};

use helpers::{blocked_user, insert_user, seed_ayahs, setup_pool, test_user, ts};

fn step(session_id: Uuid, ayah_id: i64, step_type: StepType, attempt: i64) -> StepRequest {
    StepRequest {
        session_id,
        ayah_id,
        step_type,
        attempt_number: attempt,
        success: true,
        errors_count: 0,
        duration_seconds: 20,
        scaffolding_used: false,
        linked_ayah_id: if step_type == StepType::Link { Some(ayah_id + 1) } else { None },
        error_tags: None,
    }
}

async fn start_session(pool: &SqlitePool, user: &User) -> Uuid {
    session::start_session(pool, user, StartSessionRequest::default(), hifz_common::time::now())
        .await
        .expect("Should start session")
        .id
}

// =============================================================================
// Session start
// =============================================================================

#[tokio::test]
async fn test_session_start_idempotent_on_client_id() {
    let pool = setup_pool().await;
    let user = test_user();
    insert_user(&pool, &user).await;

    let client_session_id = Some(Uuid::new_v4());
    let now = hifz_common::time::now();

    let first = session::start_session(
        &pool,
        &user,
        StartSessionRequest { client_session_id, ..Default::default() },
        now,
    )
    .await
    .unwrap();

    let second = session::start_session(
        &pool,
        &user,
        StartSessionRequest { client_session_id, ..Default::default() },
        now,
    )
    .await
    .unwrap();

    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn test_session_start_rejected_for_blocked_user() {
    let pool = setup_pool().await;
    let user = blocked_user();
    insert_user(&pool, &user).await;

    let result = session::start_session(
        &pool,
        &user,
        StartSessionRequest::default(),
        hifz_common::time::now(),
    )
    .await;

    assert!(matches!(result, Err(ApiError::GateBlocked(_))));
}

#[tokio::test]
async fn test_stale_active_session_abandoned_on_new_start() {
    let pool = setup_pool().await;
    let user = test_user();
    insert_user(&pool, &user).await;

    let stale = start_session(&pool, &user).await;
    let fresh = start_session(&pool, &user).await;
    assert_ne!(stale, fresh);

    let stale_run = db::sessions::find_by_id(&pool, stale).await.unwrap().unwrap();
    assert_eq!(stale_run.status, SessionStatus::Abandoned);
    assert!(stale_run.ended_at.is_some());

    let fresh_run = db::sessions::find_by_id(&pool, fresh).await.unwrap().unwrap();
    assert_eq!(fresh_run.status, SessionStatus::Active);
}

// =============================================================================
// Step protocol
// =============================================================================

#[tokio::test]
async fn test_first_step_must_be_exposure() {
    let pool = setup_pool().await;
    let user = test_user();
    insert_user(&pool, &user).await;
    seed_ayahs(&pool, 1, 10, 1, 1).await;

    let session_id = start_session(&pool, &user).await;

    let result = session::submit_step(
        &pool,
        &user,
        step(session_id, 1, StepType::Link, 1),
        hifz_common::time::now(),
    )
    .await;

    match result {
        Err(ApiError::InvalidStepSequence { expected_step, expected_attempt, protocol }) => {
            assert_eq!(expected_step, Some(StepType::Exposure));
            assert_eq!(expected_attempt, Some(1));
            assert_eq!(protocol.len(), 4);
        }
        other => panic!("Expected InvalidStepSequence, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_standard_protocol_full_progression() {
    let pool = setup_pool().await;
    let user = test_user();
    assert_eq!(user.scaffolding_level, ScaffoldingLevel::Standard);
    insert_user(&pool, &user).await;
    seed_ayahs(&pool, 1, 10, 1, 1).await;

    let session_id = start_session(&pool, &user).await;
    let now = hifz_common::time::now();

    // EXPOSURE x3
    for attempt in 1..=3 {
        let outcome = session::submit_step(
            &pool,
            &user,
            step(session_id, 1, StepType::Exposure, attempt),
            now,
        )
        .await
        .unwrap();
        assert!(outcome.recorded);
        if attempt < 3 {
            assert_eq!(outcome.step_status, StepStatus::InProgress);
            assert_eq!(outcome.next_step, Some(StepType::Exposure));
            assert_eq!(outcome.next_attempt, Some(attempt + 1));
        } else {
            assert_eq!(outcome.step_status, StepStatus::StepComplete);
            assert_eq!(outcome.next_step, Some(StepType::Guided));
        }
    }

    // GUIDED x1 under STANDARD scaffolding
    let outcome = session::submit_step(&pool, &user, step(session_id, 1, StepType::Guided, 1), now)
        .await
        .unwrap();
    assert_eq!(outcome.step_status, StepStatus::StepComplete);
    assert_eq!(outcome.next_step, Some(StepType::Blind));

    // BLIND x3, LINK x3
    for attempt in 1..=3 {
        session::submit_step(&pool, &user, step(session_id, 1, StepType::Blind, attempt), now)
            .await
            .unwrap();
    }
    for attempt in 1..=2 {
        session::submit_step(&pool, &user, step(session_id, 1, StepType::Link, attempt), now)
            .await
            .unwrap();
    }
    let outcome = session::submit_step(&pool, &user, step(session_id, 1, StepType::Link, 3), now)
        .await
        .unwrap();
    assert_eq!(outcome.step_status, StepStatus::AyahComplete);
    assert_eq!(outcome.next_step, None);

    // Protocol exhausted: any further submission is rejected
    let result =
        session::submit_step(&pool, &user, step(session_id, 1, StepType::Link, 3), now).await;
    assert!(matches!(result, Err(ApiError::InvalidStepSequence { .. })));

    // LINK steps fed the transition score toward the next ayah
    let score = db::transitions::find(&pool, user.id, 1, 2).await.unwrap().unwrap();
    assert_eq!(score.attempt_count, 3);
}

#[tokio::test]
async fn test_step_retry_dedupes() {
    let pool = setup_pool().await;
    let user = test_user();
    insert_user(&pool, &user).await;
    seed_ayahs(&pool, 1, 10, 1, 1).await;

    let session_id = start_session(&pool, &user).await;
    let now = hifz_common::time::now();

    let first = session::submit_step(
        &pool,
        &user,
        step(session_id, 1, StepType::Exposure, 1),
        now,
    )
    .await
    .unwrap();
    assert!(first.recorded);
    assert!(!first.deduplicated);

    let run = db::sessions::find_by_id(&pool, session_id).await.unwrap().unwrap();
    assert_eq!(run.events_count, 1);

    // Two racing submissions of the same step both pass validation; the
    // derived client event id makes the second insert a no-op. Replay the
    // losing side directly through ingest.
    let outcome = hifz_sched::services::ingest::ingest(
        &pool,
        hifz_sched::models::NewReviewEvent {
            user_id: user.id,
            session_run_id: Some(session_id),
            client_event_id: Some(hifz_common::uuid_utils::step_event_id(
                session_id, 1, "EXPOSURE", 1,
            )),
            event_type: hifz_sched::models::EventType::ReviewAttempted,
            session_type: Some(hifz_sched::models::SessionType::Sabaq),
            item_ayah_id: Some(1),
            tier: Some(hifz_sched::models::ReviewTier::Sabaq),
            step_type: Some(StepType::Exposure),
            attempt_number: Some(1),
            scaffolding_used: false,
            linked_ayah_id: None,
            from_ayah_id: None,
            to_ayah_id: None,
            success: true,
            errors_count: Some(0),
            duration_seconds: Some(20),
            error_tags: None,
            occurred_at: now,
        },
    )
    .await
    .unwrap();
    assert!(outcome.deduplicated);

    let run = db::sessions::find_by_id(&pool, session_id).await.unwrap().unwrap();
    assert_eq!(run.events_count, 1);
}

#[tokio::test]
async fn test_link_step_requires_linked_ayah() {
    let pool = setup_pool().await;
    let user = test_user();
    insert_user(&pool, &user).await;
    seed_ayahs(&pool, 1, 10, 1, 1).await;

    let session_id = start_session(&pool, &user).await;
    let now = hifz_common::time::now();

    let mut request = step(session_id, 1, StepType::Link, 1);
    request.linked_ayah_id = None;

    let result = session::submit_step(&pool, &user, request, now).await;
    assert!(matches!(result, Err(ApiError::Validation(_))));
}

#[tokio::test]
async fn test_minimal_scaffolding_can_go_straight_to_blind() {
    let pool = setup_pool().await;
    let mut user = test_user();
    user.scaffolding_level = ScaffoldingLevel::Minimal;
    insert_user(&pool, &user).await;
    seed_ayahs(&pool, 1, 10, 1, 1).await;

    let session_id = start_session(&pool, &user).await;
    let now = hifz_common::time::now();

    let outcome = session::submit_step(
        &pool,
        &user,
        step(session_id, 1, StepType::Blind, 1),
        now,
    )
    .await
    .unwrap();
    assert!(outcome.recorded);

    // Optional exposure is still accepted before blind work finishes
    let outcome = session::submit_step(
        &pool,
        &user,
        step(session_id, 1, StepType::Exposure, 1),
        now,
    )
    .await
    .unwrap();
    assert!(outcome.recorded);
}

// =============================================================================
// Completion rollup
// =============================================================================

#[tokio::test]
async fn test_completion_rolls_up_daily_session() {
    let pool = setup_pool().await;
    let user = test_user();
    insert_user(&pool, &user).await;
    seed_ayahs(&pool, 1, 10, 1, 1).await;

    let session_id = start_session(&pool, &user).await;
    let now = hifz_common::time::now();

    // Three perfect exposures: 60 seconds of work
    for attempt in 1..=3 {
        session::submit_step(&pool, &user, step(session_id, 1, StepType::Exposure, attempt), now)
            .await
            .unwrap();
    }

    let daily = rollup::complete_session(&pool, &user, session_id, now).await.unwrap();

    assert_eq!(daily.reviews_total, 3);
    assert_eq!(daily.reviews_successful, 3);
    assert_eq!(daily.retention_score, 1.0);
    assert_eq!(daily.minutes_total, 1);
    // Three perfect attempts reach checkpoint 2: memorized today
    assert_eq!(daily.new_ayahs_memorized, 1);

    let run = db::sessions::find_by_id(&pool, session_id).await.unwrap().unwrap();
    assert_eq!(run.status, SessionStatus::Completed);
    assert!(run.ended_at.is_some());
    assert_eq!(run.events_count, 3);
}

#[tokio::test]
async fn test_second_completion_conflicts() {
    let pool = setup_pool().await;
    let user = test_user();
    insert_user(&pool, &user).await;

    let session_id = start_session(&pool, &user).await;
    let now = hifz_common::time::now();

    rollup::complete_session(&pool, &user, session_id, now).await.unwrap();
    let result = rollup::complete_session(&pool, &user, session_id, now).await;
    assert!(matches!(result, Err(ApiError::Conflict(_))));
}

#[tokio::test]
async fn test_unknown_session_not_found() {
    let pool = setup_pool().await;
    let user = test_user();
    insert_user(&pool, &user).await;

    let result =
        rollup::complete_session(&pool, &user, Uuid::new_v4(), hifz_common::time::now()).await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn test_same_day_completions_accumulate_counters() {
    let pool = setup_pool().await;
    let user = test_user();
    insert_user(&pool, &user).await;
    seed_ayahs(&pool, 1, 10, 1, 1).await;

    let now = ts("2026-02-11T09:00:00Z");

    // First sitting
    let first = session::start_session(&pool, &user, StartSessionRequest::default(), now)
        .await
        .unwrap();
    for attempt in 1..=3 {
        session::submit_step(&pool, &user, step(first.id, 1, StepType::Exposure, attempt), now)
            .await
            .unwrap();
    }
    rollup::complete_session(&pool, &user, first.id, now).await.unwrap();

    // Second sitting the same UTC day (the first is auto-abandoned only if
    // still active, which it is not)
    let later = ts("2026-02-11T18:00:00Z");
    let second = session::start_session(&pool, &user, StartSessionRequest::default(), later)
        .await
        .unwrap();
    for attempt in 1..=2 {
        session::submit_step(&pool, &user, step(second.id, 2, StepType::Exposure, attempt), later)
            .await
            .unwrap();
    }
    let daily = rollup::complete_session(&pool, &user, second.id, later).await.unwrap();

    // Counters accumulate across the day's sittings
    assert_eq!(daily.reviews_total, 5);
    assert_eq!(daily.reviews_successful, 5);
    assert_eq!(daily.minutes_total, 2);
}
