//! Item state persistence
//!
//! Rows are only ever written by the reducer's upsert; the `(user_id,
//! ayah_id)` primary key makes concurrent reductions for the same pair
//! last-writer-wins over identical replays.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use hifz_common::{time, Error, Result};

use crate::models::{ItemStatus, ReviewTier, UserItemState};

use super::{parse_ts_opt, parse_uuid};

/// Upsert the reduced state for a (user, ayah) pair
pub async fn upsert<'e, E>(executor: E, state: &UserItemState) -> Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO user_item_state (
            user_id, ayah_id, status, tier, next_review_at,
            review_interval_seconds, interval_checkpoint_index, introduced_at,
            first_memorized_at, difficulty_score, total_reviews,
            successful_reviews, lapses, success_streak,
            consecutive_perfect_days, last_perfect_day,
            average_duration_seconds, last_errors_count, last_reviewed_at,
            last_event_occurred_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (user_id, ayah_id) DO UPDATE SET
            status = excluded.status,
            tier = excluded.tier,
            next_review_at = excluded.next_review_at,
            review_interval_seconds = excluded.review_interval_seconds,
            interval_checkpoint_index = excluded.interval_checkpoint_index,
            introduced_at = excluded.introduced_at,
            first_memorized_at = excluded.first_memorized_at,
            difficulty_score = excluded.difficulty_score,
            total_reviews = excluded.total_reviews,
            successful_reviews = excluded.successful_reviews,
            lapses = excluded.lapses,
            success_streak = excluded.success_streak,
            consecutive_perfect_days = excluded.consecutive_perfect_days,
            last_perfect_day = excluded.last_perfect_day,
            average_duration_seconds = excluded.average_duration_seconds,
            last_errors_count = excluded.last_errors_count,
            last_reviewed_at = excluded.last_reviewed_at,
            last_event_occurred_at = excluded.last_event_occurred_at,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(state.user_id.to_string())
    .bind(state.ayah_id)
    .bind(state.status.as_str())
    .bind(state.tier.as_str())
    .bind(time::fmt_ts(&state.next_review_at))
    .bind(state.review_interval_seconds)
    .bind(state.interval_checkpoint_index)
    .bind(time::fmt_ts(&state.introduced_at))
    .bind(state.first_memorized_at.map(|ts| time::fmt_ts(&ts)))
    .bind(state.difficulty_score)
    .bind(state.total_reviews)
    .bind(state.successful_reviews)
    .bind(state.lapses)
    .bind(state.success_streak)
    .bind(state.consecutive_perfect_days)
    .bind(state.last_perfect_day.map(time::fmt_day))
    .bind(state.average_duration_seconds)
    .bind(state.last_errors_count)
    .bind(state.last_reviewed_at.map(|ts| time::fmt_ts(&ts)))
    .bind(state.last_event_occurred_at.map(|ts| time::fmt_ts(&ts)))
    .bind(time::fmt_ts(&time::now()))
    .execute(executor)
    .await?;

    Ok(())
}

/// All item states for a user
pub async fn all_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<UserItemState>> {
    let rows = sqlx::query("SELECT * FROM user_item_state WHERE user_id = ?")
        .bind(user_id.to_string())
        .fetch_all(pool)
        .await?;

    rows.iter().map(map_state).collect()
}

/// One (user, ayah) state
pub async fn find(
    pool: &SqlitePool,
    user_id: Uuid,
    ayah_id: i64,
) -> Result<Option<UserItemState>> {
    let row = sqlx::query("SELECT * FROM user_item_state WHERE user_id = ? AND ayah_id = ?")
        .bind(user_id.to_string())
        .bind(ayah_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(map_state).transpose()
}

/// Count of items first memorized at or after a timestamp
pub async fn memorized_since(
    pool: &SqlitePool,
    user_id: Uuid,
    since: DateTime<Utc>,
) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM user_item_state
        WHERE user_id = ? AND first_memorized_at IS NOT NULL AND first_memorized_at >= ?
        "#,
    )
    .bind(user_id.to_string())
    .bind(time::fmt_ts(&since))
    .fetch_one(pool)
    .await?;
    Ok(count)
}

fn map_state(row: &SqliteRow) -> Result<UserItemState> {
    let user_id: String = row.get("user_id");
    let status: String = row.get("status");
    let tier: String = row.get("tier");
    let next_review_at: String = row.get("next_review_at");
    let introduced_at: String = row.get("introduced_at");
    let last_perfect_day: Option<String> = row.get("last_perfect_day");

    Ok(UserItemState {
        user_id: parse_uuid(&user_id)?,
        ayah_id: row.get("ayah_id"),
        status: ItemStatus::parse(&status)
            .ok_or_else(|| Error::Corrupt(format!("unknown item status '{}'", status)))?,
        tier: ReviewTier::parse(&tier)
            .ok_or_else(|| Error::Corrupt(format!("unknown tier '{}'", tier)))?,
        next_review_at: time::parse_ts(&next_review_at)?,
        review_interval_seconds: row.get("review_interval_seconds"),
        interval_checkpoint_index: row.get("interval_checkpoint_index"),
        introduced_at: time::parse_ts(&introduced_at)?,
        first_memorized_at: parse_ts_opt(row.get("first_memorized_at"))?,
        difficulty_score: row.get("difficulty_score"),
        total_reviews: row.get("total_reviews"),
        successful_reviews: row.get("successful_reviews"),
        lapses: row.get("lapses"),
        success_streak: row.get("success_streak"),
        consecutive_perfect_days: row.get("consecutive_perfect_days"),
        last_perfect_day: last_perfect_day
            .map(|d| time::parse_day(&d))
            .transpose()?,
        average_duration_seconds: row.get("average_duration_seconds"),
        last_errors_count: row.get("last_errors_count"),
        last_reviewed_at: parse_ts_opt(row.get("last_reviewed_at"))?,
        last_event_occurred_at: parse_ts_opt(row.get("last_event_occurred_at"))?,
    })
}
