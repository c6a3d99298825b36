//! Fluency gate test persistence

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use hifz_common::{time, Error, Result};

use crate::models::{FluencyGateTest, FluencyTestStatus};

use super::{parse_ts_opt, parse_uuid};

pub async fn insert(pool: &SqlitePool, test: &FluencyGateTest) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO fluency_gate_tests (
            id, user_id, status, test_page, duration_seconds, error_count,
            fluency_score, started_at, completed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(test.id.to_string())
    .bind(test.user_id.to_string())
    .bind(test.status.as_str())
    .bind(test.test_page)
    .bind(test.duration_seconds)
    .bind(test.error_count)
    .bind(test.fluency_score)
    .bind(time::fmt_ts(&test.started_at))
    .bind(test.completed_at.map(|ts| time::fmt_ts(&ts)))
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<FluencyGateTest>> {
    let row = sqlx::query("SELECT * FROM fluency_gate_tests WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(map_test).transpose()
}

pub async fn latest_for_user(
    pool: &SqlitePool,
    user_id: Uuid,
) -> Result<Option<FluencyGateTest>> {
    let row = sqlx::query(
        r#"
        SELECT * FROM fluency_gate_tests
        WHERE user_id = ?
        ORDER BY started_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(map_test).transpose()
}

/// Record the submitted result. Compare-and-set: only an IN_PROGRESS test
/// transitions, so terminal tests stay immutable. Returns false when the
/// test was already terminal.
pub async fn complete(
    pool: &SqlitePool,
    id: Uuid,
    duration_seconds: i64,
    error_count: i64,
    fluency_score: f64,
    status: FluencyTestStatus,
    completed_at: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE fluency_gate_tests
        SET status = ?, duration_seconds = ?, error_count = ?,
            fluency_score = ?, completed_at = ?
        WHERE id = ? AND status = 'IN_PROGRESS'
        "#,
    )
    .bind(status.as_str())
    .bind(duration_seconds)
    .bind(error_count)
    .bind(fluency_score)
    .bind(time::fmt_ts(&completed_at))
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

fn map_test(row: &SqliteRow) -> Result<FluencyGateTest> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let status: String = row.get("status");
    let started_at: String = row.get("started_at");

    Ok(FluencyGateTest {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        status: FluencyTestStatus::parse(&status)
            .ok_or_else(|| Error::Corrupt(format!("unknown test status '{}'", status)))?,
        test_page: row.get("test_page"),
        duration_seconds: row.get("duration_seconds"),
        error_count: row.get("error_count"),
        fluency_score: row.get("fluency_score"),
        started_at: time::parse_ts(&started_at)?,
        completed_at: parse_ts_opt(row.get("completed_at"))?,
    })
}
