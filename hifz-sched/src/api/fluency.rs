//! Fluency gate API handlers

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hifz_common::time;

use crate::api::CurrentUser;
use crate::db;
use crate::error::ApiResult;
use crate::models::{Ayah, FluencyGateTest, User};
use crate::services::fluency;
use crate::AppState;

/// POST /api/v1/fluency-gate/start response
#[derive(Debug, Serialize)]
pub struct StartTestResponse {
    pub test_id: Uuid,
    pub page: i64,
    pub ayahs: Vec<Ayah>,
}

/// POST /api/v1/fluency-gate/start
pub async fn start(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<(StatusCode, Json<StartTestResponse>)> {
    let (test, ayahs) = fluency::start_test(&state.db, &user, time::now()).await?;

    Ok((
        StatusCode::CREATED,
        Json(StartTestResponse {
            test_id: test.id,
            page: test.test_page,
            ayahs,
        }),
    ))
}

/// POST /api/v1/fluency-gate/submit request
#[derive(Debug, Deserialize)]
pub struct SubmitTestRequest {
    pub test_id: Uuid,
    pub duration_seconds: i64,
    pub error_count: i64,
}

/// POST /api/v1/fluency-gate/submit response
#[derive(Debug, Serialize)]
pub struct SubmitTestResponse {
    pub test_id: Uuid,
    pub time_score: f64,
    pub accuracy_score: f64,
    pub fluency_score: f64,
    pub passed: bool,
}

/// POST /api/v1/fluency-gate/submit
pub async fn submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<SubmitTestRequest>,
) -> ApiResult<Json<SubmitTestResponse>> {
    let outcome = fluency::submit_test(
        &state.db,
        &user,
        request.test_id,
        request.duration_seconds,
        request.error_count,
        time::now(),
    )
    .await?;

    Ok(Json(SubmitTestResponse {
        test_id: outcome.test.id,
        time_score: outcome.time_score,
        accuracy_score: outcome.accuracy_score,
        fluency_score: outcome.fluency_score,
        passed: outcome.passed,
    }))
}

/// GET /api/v1/fluency-gate/status response
#[derive(Debug, Serialize)]
pub struct GateStatusResponse {
    pub fluency_gate_passed: bool,
    pub requires_pre_hifz: bool,
    pub fluency_score: Option<f64>,
    pub latest_test: Option<FluencyGateTest>,
}

/// GET /api/v1/fluency-gate/status
pub async fn status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<GateStatusResponse>> {
    let latest_test = db::fluency::latest_for_user(&state.db, user.id).await?;

    Ok(Json(gate_status(&user, latest_test)))
}

fn gate_status(user: &User, latest_test: Option<FluencyGateTest>) -> GateStatusResponse {
    GateStatusResponse {
        fluency_gate_passed: user.fluency_gate_passed,
        requires_pre_hifz: user.requires_pre_hifz,
        fluency_score: user.fluency_score,
        latest_test,
    }
}

pub fn fluency_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/fluency-gate/start", post(start))
        .route("/api/v1/fluency-gate/submit", post(submit))
        .route("/api/v1/fluency-gate/status", get(status))
}
