//! Transition score persistence

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use hifz_common::{time, Result};

use crate::models::TransitionScore;
use crate::scheduler::queue::WeakTransition;

use super::parse_uuid;

/// Record one practice of the (from, to) link, upserting the pair's counters
pub async fn record_attempt<'e, E>(
    executor: E,
    user_id: Uuid,
    from_ayah_id: i64,
    to_ayah_id: i64,
    success: bool,
    practiced_at: DateTime<Utc>,
) -> Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO transition_scores (
            user_id, from_ayah_id, to_ayah_id, attempt_count, success_count,
            last_practiced_at
        ) VALUES (?, ?, ?, 1, ?, ?)
        ON CONFLICT (user_id, from_ayah_id, to_ayah_id) DO UPDATE SET
            attempt_count = attempt_count + 1,
            success_count = success_count + excluded.success_count,
            last_practiced_at = excluded.last_practiced_at
        "#,
    )
    .bind(user_id.to_string())
    .bind(from_ayah_id)
    .bind(to_ayah_id)
    .bind(success as i64)
    .bind(time::fmt_ts(&practiced_at))
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn find(
    pool: &SqlitePool,
    user_id: Uuid,
    from_ayah_id: i64,
    to_ayah_id: i64,
) -> Result<Option<TransitionScore>> {
    let row = sqlx::query(
        r#"
        SELECT * FROM transition_scores
        WHERE user_id = ? AND from_ayah_id = ? AND to_ayah_id = ?
        "#,
    )
    .bind(user_id.to_string())
    .bind(from_ayah_id)
    .bind(to_ayah_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(map_score).transpose()
}

pub async fn all_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<TransitionScore>> {
    let rows = sqlx::query("SELECT * FROM transition_scores WHERE user_id = ?")
        .bind(user_id.to_string())
        .fetch_all(pool)
        .await?;

    rows.iter().map(map_score).collect()
}

/// All weak transitions, ascending by success rate (worst first)
pub async fn weak_for_user(
    pool: &SqlitePool,
    user_id: Uuid,
    min_attempts: i64,
    max_success_rate: f64,
) -> Result<Vec<WeakTransition>> {
    let rows = sqlx::query(
        r#"
        SELECT from_ayah_id, to_ayah_id, attempt_count, success_count,
               CAST(success_count AS REAL) / attempt_count AS success_rate
        FROM transition_scores
        WHERE user_id = ? AND attempt_count >= ?
          AND CAST(success_count AS REAL) / attempt_count < ?
        ORDER BY success_rate ASC, attempt_count DESC
        "#,
    )
    .bind(user_id.to_string())
    .bind(min_attempts)
    .bind(max_success_rate)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| WeakTransition {
            from_ayah_id: row.get("from_ayah_id"),
            to_ayah_id: row.get("to_ayah_id"),
            attempt_count: row.get("attempt_count"),
            success_count: row.get("success_count"),
            success_rate: row.get("success_rate"),
        })
        .collect())
}

fn map_score(row: &SqliteRow) -> Result<TransitionScore> {
    let user_id: String = row.get("user_id");
    let last_practiced_at: String = row.get("last_practiced_at");

    Ok(TransitionScore {
        user_id: parse_uuid(&user_id)?,
        from_ayah_id: row.get("from_ayah_id"),
        to_ayah_id: row.get("to_ayah_id"),
        attempt_count: row.get("attempt_count"),
        success_count: row.get("success_count"),
        last_practiced_at: time::parse_ts(&last_practiced_at)?,
    })
}
