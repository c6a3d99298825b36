//! Review event store
//!
//! Append-only. The unique `(user_id, client_event_id)` index carries the
//! idempotency contract: re-inserting the same client event id is a no-op
//! reported as `deduplicated`.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use hifz_common::{time, Error, Result};

use crate::models::{EventType, ReviewEvent, SessionType, StepType};

use super::{parse_ts_opt, parse_uuid, parse_uuid_opt};

/// Insert an event. Returns `false` when the `(user_id, client_event_id)`
/// key already exists and nothing was written.
pub async fn insert<'e, E>(executor: E, event: &ReviewEvent) -> Result<bool>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let error_tags = event
        .error_tags
        .as_ref()
        .map(|tags| serde_json::to_string(tags))
        .transpose()
        .map_err(|e| Error::Internal(format!("serialize error_tags: {}", e)))?;

    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO review_events (
            id, user_id, session_run_id, client_event_id, event_type,
            session_type, item_ayah_id, tier, step_type, attempt_number,
            scaffolding_used, linked_ayah_id, from_ayah_id, to_ayah_id,
            success, errors_count, duration_seconds, error_tags,
            occurred_at, received_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(event.id.to_string())
    .bind(event.user_id.to_string())
    .bind(event.session_run_id.map(|id| id.to_string()))
    .bind(event.client_event_id.map(|id| id.to_string()))
    .bind(event.event_type.as_str())
    .bind(event.session_type.map(|t| t.as_str()))
    .bind(event.item_ayah_id)
    .bind(event.tier.map(|t| t.as_str()))
    .bind(event.step_type.map(|t| t.as_str()))
    .bind(event.attempt_number)
    .bind(event.scaffolding_used as i64)
    .bind(event.linked_ayah_id)
    .bind(event.from_ayah_id)
    .bind(event.to_ayah_id)
    .bind(event.success as i64)
    .bind(event.errors_count)
    .bind(event.duration_seconds)
    .bind(error_tags)
    .bind(time::fmt_ts(&event.occurred_at))
    .bind(time::fmt_ts(&event.received_at))
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// All REVIEW_ATTEMPTED events for one (user, ayah), in replay order
pub async fn review_events_for_item<'e, E>(
    executor: E,
    user_id: Uuid,
    ayah_id: i64,
) -> Result<Vec<ReviewEvent>>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let rows = sqlx::query(
        r#"
        SELECT * FROM review_events
        WHERE user_id = ? AND item_ayah_id = ? AND event_type = 'REVIEW_ATTEMPTED'
        ORDER BY occurred_at ASC, id ASC
        "#,
    )
    .bind(user_id.to_string())
    .bind(ayah_id)
    .fetch_all(executor)
    .await?;

    rows.iter().map(map_event).collect()
}

/// All REVIEW_ATTEMPTED events recorded in one session run
pub async fn review_events_for_session(
    pool: &SqlitePool,
    session_run_id: Uuid,
) -> Result<Vec<ReviewEvent>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM review_events
        WHERE session_run_id = ? AND event_type = 'REVIEW_ATTEMPTED'
        ORDER BY occurred_at ASC, id ASC
        "#,
    )
    .bind(session_run_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_event).collect()
}

/// Events for a user since a timestamp (warm-up evaluation)
pub async fn review_events_since(
    pool: &SqlitePool,
    user_id: Uuid,
    since: DateTime<Utc>,
) -> Result<Vec<ReviewEvent>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM review_events
        WHERE user_id = ? AND occurred_at >= ?
        ORDER BY occurred_at ASC, id ASC
        "#,
    )
    .bind(user_id.to_string())
    .bind(time::fmt_ts(&since))
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_event).collect()
}

/// Number of events in a session with a given step context for one ayah,
/// grouped by step type (protocol position reconstruction)
pub async fn step_counts_for_session_ayah(
    pool: &SqlitePool,
    session_run_id: Uuid,
    ayah_id: i64,
) -> Result<std::collections::HashMap<StepType, i64>> {
    let rows = sqlx::query(
        r#"
        SELECT step_type, COUNT(*) AS n FROM review_events
        WHERE session_run_id = ? AND item_ayah_id = ?
          AND event_type = 'REVIEW_ATTEMPTED' AND step_type IS NOT NULL
        GROUP BY step_type
        "#,
    )
    .bind(session_run_id.to_string())
    .bind(ayah_id)
    .fetch_all(pool)
    .await?;

    let mut counts = std::collections::HashMap::new();
    for row in rows {
        let step: String = row.get("step_type");
        let n: i64 = row.get("n");
        if let Some(step) = StepType::parse(&step) {
            counts.insert(step, n);
        }
    }
    Ok(counts)
}

/// Total stored events for a user
pub async fn count_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM review_events WHERE user_id = ?")
        .bind(user_id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn map_event(row: &SqliteRow) -> Result<ReviewEvent> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let event_type: String = row.get("event_type");
    let occurred_at: String = row.get("occurred_at");
    let received_at: String = row.get("received_at");

    let event_type = EventType::parse(&event_type)
        .ok_or_else(|| Error::Corrupt(format!("unknown event_type '{}'", event_type)))?;

    let session_type: Option<String> = row.get("session_type");
    let tier: Option<String> = row.get("tier");
    let step_type: Option<String> = row.get("step_type");
    let error_tags: Option<String> = row.get("error_tags");

    Ok(ReviewEvent {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        session_run_id: parse_uuid_opt(row.get("session_run_id"))?,
        client_event_id: parse_uuid_opt(row.get("client_event_id"))?,
        event_type,
        session_type: session_type.as_deref().and_then(SessionType::parse),
        item_ayah_id: row.get("item_ayah_id"),
        tier: tier.as_deref().and_then(crate::models::ReviewTier::parse),
        step_type: step_type.as_deref().and_then(StepType::parse),
        attempt_number: row.get("attempt_number"),
        scaffolding_used: row.get::<i64, _>("scaffolding_used") != 0,
        linked_ayah_id: row.get("linked_ayah_id"),
        from_ayah_id: row.get("from_ayah_id"),
        to_ayah_id: row.get("to_ayah_id"),
        success: row.get::<i64, _>("success") != 0,
        errors_count: row.get("errors_count"),
        duration_seconds: row.get("duration_seconds"),
        error_tags: error_tags
            .map(|tags| {
                serde_json::from_str(&tags)
                    .map_err(|e| Error::Corrupt(format!("error_tags: {}", e)))
            })
            .transpose()?,
        occurred_at: time::parse_ts(&occurred_at)?,
        received_at: time::parse_ts(&received_at)?,
    })
}
