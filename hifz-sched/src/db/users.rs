//! User queries

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use hifz_common::{time, Error, Result};

use crate::models::{
    PriorJuzBand, ProgramVariant, ScaffoldingLevel, TajwidConfidence, User,
};
use crate::scheduler::assessment::{AssessmentInput, AssessmentPlan};

use super::parse_uuid;

/// Find a user by id
pub async fn find_by_id(pool: &SqlitePool, user_id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query("SELECT * FROM users WHERE id = ?")
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(map_user).transpose()
}

/// Identity-provider provisioning: find by email, creating on first login
/// with the verifier's user id and default scheduling parameters.
pub async fn find_or_create_by_email(
    pool: &SqlitePool,
    user_id: Uuid,
    email: &str,
) -> Result<User> {
    if let Some(row) = sqlx::query("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?
    {
        return map_user(&row);
    }

    let now = time::fmt_ts(&time::now());
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO users (id, email, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(user_id.to_string())
    .bind(email)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    // Re-select: a concurrent provisioner may have won the insert
    let row = sqlx::query("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await?;
    map_user(&row)
}

/// Full insert with explicit parameters, used by test fixtures
pub async fn insert(pool: &SqlitePool, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (
            id, email, time_budget_minutes, fluency_score, fluency_gate_passed,
            requires_pre_hifz, scaffolding_level, variant,
            daily_new_target_ayahs, review_ratio_target, retention_threshold,
            backlog_freeze_ratio, consolidation_retention_floor,
            manzil_rotation_days, avg_seconds_per_item, overdue_cap_seconds,
            prior_juz_band, goal, has_teacher, tajwid_confidence,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.id.to_string())
    .bind(&user.email)
    .bind(user.time_budget_minutes)
    .bind(user.fluency_score)
    .bind(user.fluency_gate_passed as i64)
    .bind(user.requires_pre_hifz as i64)
    .bind(user.scaffolding_level.as_str())
    .bind(user.variant.as_str())
    .bind(user.daily_new_target_ayahs)
    .bind(user.review_ratio_target)
    .bind(user.retention_threshold)
    .bind(user.backlog_freeze_ratio)
    .bind(user.consolidation_retention_floor)
    .bind(user.manzil_rotation_days)
    .bind(user.avg_seconds_per_item)
    .bind(user.overdue_cap_seconds)
    .bind(user.prior_juz_band.map(|b| b.as_str()))
    .bind(&user.goal)
    .bind(user.has_teacher as i64)
    .bind(user.tajwid_confidence.map(|c| c.as_str()))
    .bind(time::fmt_ts(&user.created_at))
    .bind(time::fmt_ts(&user.updated_at))
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist an assessment result onto the user row
pub async fn apply_assessment(
    pool: &SqlitePool,
    user_id: Uuid,
    input: &AssessmentInput,
    plan: &AssessmentPlan,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users SET
            time_budget_minutes = ?,
            fluency_score = ?,
            scaffolding_level = ?,
            variant = ?,
            daily_new_target_ayahs = ?,
            review_ratio_target = ?,
            retention_threshold = ?,
            backlog_freeze_ratio = ?,
            consolidation_retention_floor = ?,
            manzil_rotation_days = ?,
            avg_seconds_per_item = ?,
            overdue_cap_seconds = ?,
            prior_juz_band = ?,
            goal = ?,
            has_teacher = ?,
            tajwid_confidence = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(input.time_budget_minutes)
    .bind(input.fluency_score)
    .bind(plan.scaffolding_level.as_str())
    .bind(plan.variant.as_str())
    .bind(plan.daily_new_target_ayahs)
    .bind(plan.review_ratio_target)
    .bind(plan.retention_threshold)
    .bind(plan.backlog_freeze_ratio)
    .bind(plan.consolidation_retention_floor)
    .bind(plan.manzil_rotation_days)
    .bind(plan.avg_seconds_per_item)
    .bind(plan.overdue_cap_seconds)
    .bind(input.prior_juz_band.as_str())
    .bind(&input.goal)
    .bind(input.has_teacher as i64)
    .bind(input.tajwid_confidence.as_str())
    .bind(time::fmt_ts(&time::now()))
    .bind(user_id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Record the fluency gate outcome on the user row
pub async fn set_fluency_outcome(
    pool: &SqlitePool,
    user_id: Uuid,
    score: f64,
    passed: bool,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users SET
            fluency_score = ?,
            fluency_gate_passed = ?,
            requires_pre_hifz = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(score)
    .bind(passed as i64)
    .bind(!passed as i64)
    .bind(time::fmt_ts(&time::now()))
    .bind(user_id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

fn map_user(row: &SqliteRow) -> Result<User> {
    let id: String = row.get("id");
    let scaffolding: String = row.get("scaffolding_level");
    let variant: String = row.get("variant");
    let prior_juz_band: Option<String> = row.get("prior_juz_band");
    let tajwid_confidence: Option<String> = row.get("tajwid_confidence");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(User {
        id: parse_uuid(&id)?,
        email: row.get("email"),
        time_budget_minutes: row.get("time_budget_minutes"),
        fluency_score: row.get("fluency_score"),
        fluency_gate_passed: row.get::<i64, _>("fluency_gate_passed") != 0,
        requires_pre_hifz: row.get::<i64, _>("requires_pre_hifz") != 0,
        scaffolding_level: ScaffoldingLevel::parse(&scaffolding)
            .ok_or_else(|| Error::Corrupt(format!("unknown scaffolding '{}'", scaffolding)))?,
        variant: ProgramVariant::parse(&variant)
            .ok_or_else(|| Error::Corrupt(format!("unknown variant '{}'", variant)))?,
        daily_new_target_ayahs: row.get("daily_new_target_ayahs"),
        review_ratio_target: row.get("review_ratio_target"),
        retention_threshold: row.get("retention_threshold"),
        backlog_freeze_ratio: row.get("backlog_freeze_ratio"),
        consolidation_retention_floor: row.get("consolidation_retention_floor"),
        manzil_rotation_days: row.get("manzil_rotation_days"),
        avg_seconds_per_item: row.get("avg_seconds_per_item"),
        overdue_cap_seconds: row.get("overdue_cap_seconds"),
        prior_juz_band: prior_juz_band.as_deref().and_then(PriorJuzBand::parse),
        goal: row.get("goal"),
        has_teacher: row.get::<i64, _>("has_teacher") != 0,
        tajwid_confidence: tajwid_confidence
            .as_deref()
            .and_then(TajwidConfidence::parse),
        created_at: time::parse_ts(&created_at)?,
        updated_at: time::parse_ts(&updated_at)?,
    })
}
