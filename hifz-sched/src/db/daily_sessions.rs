//! Daily session aggregates

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use hifz_common::{time, Error, Result};

use crate::models::{DailySession, QueueMode};

use super::parse_uuid;

/// Upsert the (user, day) aggregate. Same-day completions accumulate the
/// minute and review counters; the planner snapshot columns are overwritten
/// by the most recent completion.
pub async fn upsert(pool: &SqlitePool, daily: &DailySession) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO daily_sessions (
            id, user_id, session_date, mode, retention_score,
            backlog_minutes_estimate, overdue_days_max, minutes_total,
            reviews_total, reviews_successful, new_ayahs_memorized,
            warmup_passed, sabaq_allowed
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (user_id, session_date) DO UPDATE SET
            mode = excluded.mode,
            retention_score = excluded.retention_score,
            backlog_minutes_estimate = excluded.backlog_minutes_estimate,
            overdue_days_max = excluded.overdue_days_max,
            minutes_total = minutes_total + excluded.minutes_total,
            reviews_total = reviews_total + excluded.reviews_total,
            reviews_successful = reviews_successful + excluded.reviews_successful,
            new_ayahs_memorized = excluded.new_ayahs_memorized,
            warmup_passed = excluded.warmup_passed,
            sabaq_allowed = excluded.sabaq_allowed
        "#,
    )
    .bind(daily.id.to_string())
    .bind(daily.user_id.to_string())
    .bind(time::fmt_day(daily.session_date))
    .bind(daily.mode.as_str())
    .bind(daily.retention_score)
    .bind(daily.backlog_minutes_estimate)
    .bind(daily.overdue_days_max)
    .bind(daily.minutes_total)
    .bind(daily.reviews_total)
    .bind(daily.reviews_successful)
    .bind(daily.new_ayahs_memorized)
    .bind(daily.warmup_passed as i64)
    .bind(daily.sabaq_allowed as i64)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_by_day(
    pool: &SqlitePool,
    user_id: Uuid,
    day: NaiveDate,
) -> Result<Option<DailySession>> {
    let row = sqlx::query("SELECT * FROM daily_sessions WHERE user_id = ? AND session_date = ?")
        .bind(user_id.to_string())
        .bind(time::fmt_day(day))
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(map_daily).transpose()
}

/// Retention scores on or after a day (rolling-retention input)
pub async fn retention_scores_since(
    pool: &SqlitePool,
    user_id: Uuid,
    from_day: NaiveDate,
) -> Result<Vec<f64>> {
    let scores: Vec<f64> = sqlx::query_scalar(
        "SELECT retention_score FROM daily_sessions WHERE user_id = ? AND session_date >= ?",
    )
    .bind(user_id.to_string())
    .bind(time::fmt_day(from_day))
    .fetch_all(pool)
    .await?;
    Ok(scores)
}

/// All aggregates within a calendar month
pub async fn for_month(
    pool: &SqlitePool,
    user_id: Uuid,
    year: i32,
    month: u32,
) -> Result<Vec<DailySession>> {
    let prefix = format!("{:04}-{:02}-%", year, month);
    let rows = sqlx::query(
        r#"
        SELECT * FROM daily_sessions
        WHERE user_id = ? AND session_date LIKE ?
        ORDER BY session_date
        "#,
    )
    .bind(user_id.to_string())
    .bind(prefix)
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_daily).collect()
}

/// Every UTC day with a completed session, ascending
pub async fn active_dates(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<NaiveDate>> {
    let dates: Vec<String> = sqlx::query_scalar(
        "SELECT session_date FROM daily_sessions WHERE user_id = ? ORDER BY session_date",
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    dates.iter().map(|d| time::parse_day(d)).collect()
}

/// (day, retention) pairs, ascending by day
pub async fn retention_by_date(
    pool: &SqlitePool,
    user_id: Uuid,
) -> Result<Vec<(NaiveDate, f64)>> {
    let rows = sqlx::query(
        "SELECT session_date, retention_score FROM daily_sessions WHERE user_id = ? ORDER BY session_date",
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let date: String = row.get("session_date");
            Ok((time::parse_day(&date)?, row.get("retention_score")))
        })
        .collect()
}

/// Total practice minutes on or after a day
pub async fn minutes_since(
    pool: &SqlitePool,
    user_id: Uuid,
    from_day: NaiveDate,
) -> Result<i64> {
    let minutes: Option<i64> = sqlx::query_scalar(
        "SELECT SUM(minutes_total) FROM daily_sessions WHERE user_id = ? AND session_date >= ?",
    )
    .bind(user_id.to_string())
    .bind(time::fmt_day(from_day))
    .fetch_one(pool)
    .await?;
    Ok(minutes.unwrap_or(0))
}

fn map_daily(row: &SqliteRow) -> Result<DailySession> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let session_date: String = row.get("session_date");
    let mode: String = row.get("mode");

    Ok(DailySession {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        session_date: time::parse_day(&session_date)?,
        mode: QueueMode::parse(&mode)
            .ok_or_else(|| Error::Corrupt(format!("unknown queue mode '{}'", mode)))?,
        retention_score: row.get("retention_score"),
        backlog_minutes_estimate: row.get("backlog_minutes_estimate"),
        overdue_days_max: row.get("overdue_days_max"),
        minutes_total: row.get("minutes_total"),
        reviews_total: row.get("reviews_total"),
        reviews_successful: row.get("reviews_successful"),
        new_ayahs_memorized: row.get("new_ayahs_memorized"),
        warmup_passed: row.get::<i64, _>("warmup_passed") != 0,
        sabaq_allowed: row.get::<i64, _>("sabaq_allowed") != 0,
    })
}
