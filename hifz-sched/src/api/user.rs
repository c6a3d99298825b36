//! User read-model API handlers

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::Datelike;
use serde::Deserialize;

use hifz_common::time;

use crate::api::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::scheduler::analytics::{
    self, AchievementsView, CalendarView, ProgressView, StatsView,
};
use crate::AppState;

/// GET /api/v1/user/stats
pub async fn stats(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<StatsView>> {
    let view = analytics::stats(&state.db, user.id, time::now()).await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    /// `YYYY-MM`; defaults to the current UTC month
    pub month: Option<String>,
}

/// GET /api/v1/user/calendar?month=YYYY-MM
pub async fn calendar(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<CalendarQuery>,
) -> ApiResult<Json<CalendarView>> {
    let now = time::now();
    let (year, month) = match query.month {
        Some(raw) => parse_month(&raw)?,
        None => {
            let today = time::utc_day(&now);
            (today.year(), today.month())
        }
    };

    let view = analytics::calendar(&state.db, user.id, year, month, now).await?;
    Ok(Json(view))
}

fn parse_month(raw: &str) -> Result<(i32, u32), ApiError> {
    let invalid = || ApiError::Validation(format!("month must be YYYY-MM, got '{}'", raw));

    let (year, month) = raw.split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok((year, month))
}

/// GET /api/v1/user/achievements
pub async fn achievements(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<AchievementsView>> {
    let view = analytics::achievements(&state.db, user.id, time::now()).await?;
    Ok(Json(view))
}

/// GET /api/v1/user/progress
pub async fn progress(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<ProgressView>> {
    let view = analytics::progress(&state.db, user.id).await?;
    Ok(Json(view))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/user/stats", get(stats))
        .route("/api/v1/user/calendar", get(calendar))
        .route("/api/v1/user/achievements", get(achievements))
        .route("/api/v1/user/progress", get(progress))
}
