//! Review event API handler

use axum::{extract::State, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hifz_common::time;

use crate::api::CurrentUser;
use crate::error::ApiResult;
use crate::models::{EventType, NewReviewEvent, ReviewTier, SessionType, StepType};
use crate::services::ingest;
use crate::AppState;

/// POST /api/v1/review/event request
#[derive(Debug, Deserialize)]
pub struct EventRequest {
    pub event_type: EventType,
    pub client_event_id: Option<Uuid>,
    pub session_run_id: Option<Uuid>,
    pub session_type: Option<SessionType>,
    pub item_ayah_id: Option<i64>,
    pub tier: Option<ReviewTier>,
    pub step_type: Option<StepType>,
    pub attempt_number: Option<i64>,
    #[serde(default)]
    pub scaffolding_used: bool,
    pub linked_ayah_id: Option<i64>,
    pub from_ayah_id: Option<i64>,
    pub to_ayah_id: Option<i64>,
    pub success: bool,
    pub errors_count: Option<i64>,
    pub duration_seconds: Option<i64>,
    pub error_tags: Option<Vec<String>>,
    /// Client-reported time; defaults to the server clock
    pub occurred_at: Option<DateTime<Utc>>,
}

/// POST /api/v1/review/event response
#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub deduplicated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<Uuid>,
}

/// POST /api/v1/review/event
pub async fn submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<EventRequest>,
) -> ApiResult<Json<EventResponse>> {
    let outcome = ingest::ingest(
        &state.db,
        NewReviewEvent {
            user_id: user.id,
            session_run_id: request.session_run_id,
            client_event_id: request.client_event_id,
            event_type: request.event_type,
            session_type: request.session_type,
            item_ayah_id: request.item_ayah_id,
            tier: request.tier,
            step_type: request.step_type,
            attempt_number: request.attempt_number,
            scaffolding_used: request.scaffolding_used,
            linked_ayah_id: request.linked_ayah_id,
            from_ayah_id: request.from_ayah_id,
            to_ayah_id: request.to_ayah_id,
            success: request.success,
            errors_count: request.errors_count,
            duration_seconds: request.duration_seconds,
            error_tags: request.error_tags,
            occurred_at: request.occurred_at.unwrap_or_else(time::now),
        },
    )
    .await?;

    Ok(Json(EventResponse {
        deduplicated: outcome.deduplicated,
        event_id: outcome.event_id,
    }))
}

pub fn event_routes() -> Router<AppState> {
    Router::new().route("/api/v1/review/event", post(submit))
}
