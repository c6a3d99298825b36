//! Event ingestion
//!
//! The single write path into the event store. Order matters: the event is
//! durable before any side effect runs, and every side effect is derived
//! from the stored log, so a crash between insert and side effects is
//! repaired by the next reduction of the same pair.

use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use hifz_common::{time, uuid_utils};

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{EventType, NewReviewEvent, ReviewEvent, StepType};
use crate::scheduler::reducer;

/// Ingestion result: `deduplicated` means the client event id had already
/// been stored and nothing happened.
#[derive(Debug, Clone, Copy)]
pub struct IngestOutcome {
    pub deduplicated: bool,
    pub event_id: Option<Uuid>,
}

/// Validate, persist and apply one event
pub async fn ingest(pool: &SqlitePool, new: NewReviewEvent) -> ApiResult<IngestOutcome> {
    new.validate().map_err(ApiError::Validation)?;

    let event = ReviewEvent {
        id: uuid_utils::generate(),
        user_id: new.user_id,
        session_run_id: new.session_run_id,
        client_event_id: new.client_event_id,
        event_type: new.event_type,
        session_type: new.session_type,
        item_ayah_id: new.item_ayah_id,
        tier: new.tier,
        step_type: new.step_type,
        attempt_number: new.attempt_number,
        scaffolding_used: new.scaffolding_used,
        linked_ayah_id: new.linked_ayah_id,
        from_ayah_id: new.from_ayah_id,
        to_ayah_id: new.to_ayah_id,
        success: new.success,
        errors_count: new.errors_count,
        duration_seconds: new.duration_seconds,
        error_tags: new.error_tags,
        occurred_at: new.occurred_at,
        received_at: time::now(),
    };

    let inserted = db::events::insert(pool, &event).await?;
    if !inserted {
        info!(
            user_id = %event.user_id,
            client_event_id = ?event.client_event_id,
            "duplicate event ignored"
        );
        return Ok(IngestOutcome {
            deduplicated: true,
            event_id: None,
        });
    }

    apply_side_effects(pool, &event).await?;

    Ok(IngestOutcome {
        deduplicated: false,
        event_id: Some(event.id),
    })
}

async fn apply_side_effects(pool: &SqlitePool, event: &ReviewEvent) -> ApiResult<()> {
    if let Some(session_run_id) = event.session_run_id {
        db::sessions::increment_events(pool, session_run_id).await?;
    }

    match event.event_type {
        EventType::ReviewAttempted => {
            if let Some(ayah_id) = event.item_ayah_id {
                reducer::reduce_and_store(pool, event.user_id, ayah_id).await?;

                // LINK steps also feed the transition score for (item, linked)
                if event.step_type == Some(StepType::Link) {
                    if let Some(linked) = event.linked_ayah_id {
                        db::transitions::record_attempt(
                            pool,
                            event.user_id,
                            ayah_id,
                            linked,
                            event.success,
                            event.occurred_at,
                        )
                        .await?;
                    }
                }
            }
        }
        EventType::TransitionAttempted => {
            if let (Some(from), Some(to)) = (event.from_ayah_id, event.to_ayah_id) {
                db::transitions::record_attempt(
                    pool,
                    event.user_id,
                    from,
                    to,
                    event.success,
                    event.occurred_at,
                )
                .await?;
            }
        }
    }

    Ok(())
}
