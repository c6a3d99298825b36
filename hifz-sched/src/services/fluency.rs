//! Fluency gate service
//!
//! Page-read competence check. Score is time + accuracy, each worth 50
//! points; 70 passes. A pass flips the user's gate flags and opens the
//! scheduler.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use hifz_common::uuid_utils;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{Ayah, FluencyGateTest, FluencyTestStatus, User};

/// Passing score threshold
pub const PASS_THRESHOLD: f64 = 70.0;

/// Time half: full marks under 3 minutes, then one point per 6 seconds
pub fn time_score(duration_seconds: i64) -> f64 {
    if duration_seconds < 180 {
        50.0
    } else {
        (50.0 - (duration_seconds - 180) as f64 / 6.0).max(0.0)
    }
}

/// Accuracy half: full marks under 5 errors, then 5 points per error
pub fn accuracy_score(error_count: i64) -> f64 {
    if error_count < 5 {
        50.0
    } else {
        (50.0 - (error_count - 5) as f64 * 5.0).max(0.0)
    }
}

/// Start a test: pick a page the user has not begun (falling back to any
/// seeded page), create the IN_PROGRESS row and return the page's ayahs.
pub async fn start_test(
    pool: &SqlitePool,
    user: &User,
    now: DateTime<Utc>,
) -> ApiResult<(FluencyGateTest, Vec<Ayah>)> {
    let all_pages = db::ayahs::distinct_pages(pool).await?;
    if all_pages.is_empty() {
        return Err(ApiError::Conflict(
            "ayah corpus is not seeded; no test page available".to_string(),
        ));
    }

    let touched = db::ayahs::pages_touched_by_user(pool, user.id).await?;
    let candidates: Vec<i64> = all_pages
        .iter()
        .copied()
        .filter(|page| !touched.contains(page))
        .collect();
    let candidates = if candidates.is_empty() { all_pages } else { candidates };

    let test_page = *candidates
        .choose(&mut rand::thread_rng())
        .ok_or_else(|| ApiError::Internal("no candidate pages after fallback".to_string()))?;

    let test = FluencyGateTest {
        id: uuid_utils::generate(),
        user_id: user.id,
        status: FluencyTestStatus::InProgress,
        test_page,
        duration_seconds: None,
        error_count: None,
        fluency_score: None,
        started_at: now,
        completed_at: None,
    };
    db::fluency::insert(pool, &test).await?;

    let ayahs = db::ayahs::by_page(pool, test_page).await?;

    info!(user_id = %user.id, test_id = %test.id, page = test_page, "fluency test started");

    Ok((test, ayahs))
}

/// Submission outcome
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub test: FluencyGateTest,
    pub time_score: f64,
    pub accuracy_score: f64,
    pub fluency_score: f64,
    pub passed: bool,
}

/// Submit a result for an IN_PROGRESS test. Terminal or missing tests are
/// reported as not found.
pub async fn submit_test(
    pool: &SqlitePool,
    user: &User,
    test_id: Uuid,
    duration_seconds: i64,
    error_count: i64,
    now: DateTime<Utc>,
) -> ApiResult<SubmitOutcome> {
    if duration_seconds <= 0 {
        return Err(ApiError::Validation("duration_seconds must be > 0".to_string()));
    }
    if error_count < 0 {
        return Err(ApiError::Validation("error_count must be >= 0".to_string()));
    }

    let test = db::fluency::find_by_id(pool, test_id)
        .await?
        .filter(|t| t.user_id == user.id)
        .ok_or_else(|| ApiError::NotFound(format!("fluency test {} not found", test_id)))?;

    if test.status.is_terminal() {
        return Err(ApiError::NotFound(format!(
            "fluency test {} is already {}",
            test_id,
            test.status.as_str()
        )));
    }

    let time_points = time_score(duration_seconds);
    let accuracy_points = accuracy_score(error_count);
    let score = time_points + accuracy_points;
    let passed = score >= PASS_THRESHOLD;
    let status = if passed {
        FluencyTestStatus::Passed
    } else {
        FluencyTestStatus::Failed
    };

    // CAS on IN_PROGRESS keeps terminal rows immutable under racing submits
    let updated = db::fluency::complete(
        pool,
        test_id,
        duration_seconds,
        error_count,
        score,
        status,
        now,
    )
    .await?;
    if !updated {
        return Err(ApiError::NotFound(format!(
            "fluency test {} is no longer in progress",
            test_id
        )));
    }

    db::users::set_fluency_outcome(pool, user.id, score, passed).await?;

    info!(
        user_id = %user.id,
        test_id = %test_id,
        score,
        passed,
        "fluency test submitted"
    );

    let test = db::fluency::find_by_id(pool, test_id)
        .await?
        .ok_or_else(|| ApiError::Internal("fluency test vanished after update".to_string()))?;

    Ok(SubmitOutcome {
        test,
        time_score: time_points,
        accuracy_score: accuracy_points,
        fluency_score: score,
        passed,
    })
}
