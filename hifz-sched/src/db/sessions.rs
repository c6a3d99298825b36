//! Session run persistence

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use hifz_common::{time, Error, Result};

use crate::models::{QueueMode, SessionRun, SessionStatus};

use super::{parse_ts_opt, parse_uuid, parse_uuid_opt};

/// Start a session run. Idempotent on `(user_id, client_session_id)` when a
/// client session id is supplied: a replayed start returns the original run.
pub async fn start(pool: &SqlitePool, run: &SessionRun) -> Result<SessionRun> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO session_runs (
            id, user_id, client_session_id, mode, warmup_passed, status,
            started_at, ended_at, events_count, minutes_total
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(run.id.to_string())
    .bind(run.user_id.to_string())
    .bind(run.client_session_id.map(|id| id.to_string()))
    .bind(run.mode.as_str())
    .bind(run.warmup_passed as i64)
    .bind(run.status.as_str())
    .bind(time::fmt_ts(&run.started_at))
    .bind(run.ended_at.map(|ts| time::fmt_ts(&ts)))
    .bind(run.events_count)
    .bind(run.minutes_total)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        return Ok(run.clone());
    }

    // Unique-key collision: return the existing run for this client id
    let client_session_id = run.client_session_id.ok_or_else(|| {
        Error::Internal("session insert ignored without client_session_id".to_string())
    })?;
    let row = sqlx::query(
        "SELECT * FROM session_runs WHERE user_id = ? AND client_session_id = ?",
    )
    .bind(run.user_id.to_string())
    .bind(client_session_id.to_string())
    .fetch_one(pool)
    .await?;
    map_run(&row)
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<SessionRun>> {
    let row = sqlx::query("SELECT * FROM session_runs WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(map_run).transpose()
}

/// Compare-and-set ACTIVE -> COMPLETED. Returns false when the run was not
/// ACTIVE (already completed or abandoned).
pub async fn complete(
    pool: &SqlitePool,
    id: Uuid,
    ended_at: DateTime<Utc>,
    minutes_total: i64,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE session_runs
        SET status = 'COMPLETED', ended_at = ?, minutes_total = ?
        WHERE id = ? AND status = 'ACTIVE'
        "#,
    )
    .bind(time::fmt_ts(&ended_at))
    .bind(minutes_total)
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Any session still ACTIVE from an earlier sitting will never be completed
/// by its client. Mark them ABANDONED when the user starts a new one.
pub async fn abandon_stale(pool: &SqlitePool, user_id: Uuid, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE session_runs
        SET status = 'ABANDONED', ended_at = ?
        WHERE user_id = ? AND status = 'ACTIVE'
        "#,
    )
    .bind(time::fmt_ts(&now))
    .bind(user_id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Bump the event counter for a run
pub async fn increment_events<'e, E>(executor: E, id: Uuid) -> Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query("UPDATE session_runs SET events_count = events_count + 1 WHERE id = ?")
        .bind(id.to_string())
        .execute(executor)
        .await?;
    Ok(())
}

fn map_run(row: &SqliteRow) -> Result<SessionRun> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let mode: String = row.get("mode");
    let status: String = row.get("status");
    let started_at: String = row.get("started_at");

    Ok(SessionRun {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        client_session_id: parse_uuid_opt(row.get("client_session_id"))?,
        mode: QueueMode::parse(&mode)
            .ok_or_else(|| Error::Corrupt(format!("unknown queue mode '{}'", mode)))?,
        warmup_passed: row.get::<i64, _>("warmup_passed") != 0,
        status: SessionStatus::parse(&status)
            .ok_or_else(|| Error::Corrupt(format!("unknown session status '{}'", status)))?,
        started_at: time::parse_ts(&started_at)?,
        ended_at: parse_ts_opt(row.get("ended_at"))?,
        events_count: row.get("events_count"),
        minutes_total: row.get("minutes_total"),
    })
}
