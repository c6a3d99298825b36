//! Session API handlers

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hifz_common::time;

use crate::api::CurrentUser;
use crate::error::ApiResult;
use crate::models::{DailySession, QueueMode};
use crate::scheduler::rollup;
use crate::services::session::{self, StartSessionRequest, StepOutcome, StepRequest};
use crate::AppState;

/// POST /api/v1/session/start response
#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: Uuid,
    pub mode: QueueMode,
    pub warmup_passed: bool,
}

/// POST /api/v1/session/start
pub async fn start(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<StartSessionRequest>,
) -> ApiResult<(StatusCode, Json<StartSessionResponse>)> {
    let run = session::start_session(&state.db, &user, request, time::now()).await?;

    Ok((
        StatusCode::CREATED,
        Json(StartSessionResponse {
            session_id: run.id,
            mode: run.mode,
            warmup_passed: run.warmup_passed,
        }),
    ))
}

/// POST /api/v1/session/step-complete
pub async fn step_complete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<StepRequest>,
) -> ApiResult<Json<StepOutcome>> {
    let outcome = session::submit_step(&state.db, &user, request, time::now()).await?;
    Ok(Json(outcome))
}

/// POST /api/v1/session/complete request
#[derive(Debug, Deserialize)]
pub struct CompleteSessionRequest {
    pub session_id: Uuid,
}

/// POST /api/v1/session/complete
pub async fn complete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CompleteSessionRequest>,
) -> ApiResult<Json<DailySession>> {
    let daily =
        rollup::complete_session(&state.db, &user, request.session_id, time::now()).await?;
    Ok(Json(daily))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/session/start", post(start))
        .route("/api/v1/session/step-complete", post(step_complete))
        .route("/api/v1/session/complete", post(complete))
}
