//! Health endpoints
//!
//! `/health/live` answers as long as the process runs; `/health/ready`
//! additionally probes the database and requires a seeded ayah corpus.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::db;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// GET /health/live
pub async fn live(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "hifz-sched".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.num_seconds().max(0) as u64,
    })
}

/// GET /health/ready
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<serde_json::Value>)> {
    let corpus = db::ayahs::count(&state.db).await;

    match corpus {
        Ok(n) if n > 0 => {
            let uptime = Utc::now().signed_duration_since(state.startup_time);
            Ok(Json(HealthResponse {
                status: "ready".to_string(),
                module: "hifz-sched".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                uptime_seconds: uptime.num_seconds().max(0) as u64,
            }))
        }
        Ok(_) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"status": "not_ready", "reason": "ayah corpus not seeded"})),
        )),
        Err(e) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"status": "not_ready", "reason": e.to_string()})),
        )),
    }
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health/live", get(live))
        .route("/health/ready", get(ready))
}
