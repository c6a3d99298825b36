//! Today-queue API handler

use axum::{extract::State, routing::get, Json, Router};

use hifz_common::time;

use crate::api::CurrentUser;
use crate::error::ApiResult;
use crate::scheduler::queue::{self, TodayQueue};
use crate::AppState;

/// GET /api/v1/queue/today
pub async fn today(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<TodayQueue>> {
    let payload = queue::plan_today(&state.db, &user, time::now()).await?;
    Ok(Json(payload))
}

pub fn queue_routes() -> Router<AppState> {
    Router::new().route("/api/v1/queue/today", get(today))
}
