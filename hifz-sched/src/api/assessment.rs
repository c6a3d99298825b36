//! Assessment API handlers

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;

use crate::api::CurrentUser;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::scheduler::assessment::{self, AssessmentInput, AssessmentPlan};
use crate::AppState;

/// POST /api/v1/assessment/submit response
#[derive(Debug, Serialize)]
pub struct AssessmentResponse {
    #[serde(flatten)]
    pub plan: AssessmentPlan,
    pub time_budget_minutes: i64,
}

/// POST /api/v1/assessment/submit
///
/// Computes the user's scheduling parameters and persists them.
pub async fn submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<AssessmentInput>,
) -> ApiResult<Json<AssessmentResponse>> {
    validate(&input)?;

    let plan = assessment::plan(&input);
    db::users::apply_assessment(&state.db, user.id, &input, &plan).await?;

    tracing::info!(
        user_id = %user.id,
        variant = plan.variant.as_str(),
        scaffolding = plan.scaffolding_level.as_str(),
        "assessment applied"
    );

    Ok(Json(AssessmentResponse {
        plan,
        time_budget_minutes: input.time_budget_minutes,
    }))
}

fn validate(input: &AssessmentInput) -> Result<(), ApiError> {
    if ![15, 30, 60, 90].contains(&input.time_budget_minutes) {
        return Err(ApiError::Validation(
            "time_budget_minutes must be one of 15, 30, 60, 90".to_string(),
        ));
    }
    if !(0.0..=100.0).contains(&input.fluency_score) {
        return Err(ApiError::Validation(
            "fluency_score must be within [0, 100]".to_string(),
        ));
    }
    Ok(())
}

pub fn assessment_routes() -> Router<AppState> {
    Router::new().route("/api/v1/assessment/submit", post(submit))
}
