//! Per-user practice history endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::db::{self, try_lock};
use crate::domain::{SetCompletion, TrackingMap, TrackingRecord, TrackingStatus};
use crate::error::AppError;
use crate::state::AppState;

fn check_user_id(user_id: &str) -> Result<&str, AppError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::BadRequest("User id is required".into()));
    }
    Ok(user_id)
}

/// Tracking map in the shape the fetch accepts as `trackedQuestions`.
///
/// GET /api/users/{user_id}/tracking
pub async fn get_tracking(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<TrackingMap>, AppError> {
    let user_id = check_user_id(&user_id)?;
    let conn = try_lock(&state.db)?;
    Ok(Json(db::get_tracking(&conn, user_id)?))
}

#[derive(Debug, Deserialize)]
pub struct RecordAttemptRequest {
    pub question_id: i64,
    pub status: TrackingStatus,
}

/// POST /api/users/{user_id}/tracking
pub async fn record_attempt(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<RecordAttemptRequest>,
) -> Result<Json<TrackingRecord>, AppError> {
    let user_id = check_user_id(&user_id)?;
    let conn = try_lock(&state.db)?;

    if db::get_question_by_id(&conn, request.question_id)?.is_none() {
        return Err(AppError::NotFound(format!(
            "Question {} not found",
            request.question_id
        )));
    }

    let record = db::record_attempt(&conn, user_id, request.question_id, request.status)?;
    tracing::debug!(
        "User {} marked question {} as {} (attempt {})",
        user_id,
        request.question_id,
        request.status.as_str(),
        record.attempts
    );
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct CompletionRequest {
    pub success: i64,
    pub failed: i64,
    pub unsure: i64,
    #[serde(default)]
    pub duration_secs: i64,
}

/// POST /api/users/{user_id}/completions/{set_id}
pub async fn record_completion(
    State(state): State<AppState>,
    Path((user_id, set_id)): Path<(String, i64)>,
    Json(request): Json<CompletionRequest>,
) -> Result<(StatusCode, Json<SetCompletion>), AppError> {
    let user_id = check_user_id(&user_id)?;
    if request.success < 0 || request.failed < 0 || request.unsure < 0 || request.duration_secs < 0
    {
        return Err(AppError::BadRequest("Counts must not be negative".into()));
    }

    let completion = SetCompletion::new(
        request.success,
        request.failed,
        request.unsure,
        request.duration_secs,
    )
    .ok_or_else(|| AppError::BadRequest("Counts are too large".into()))?;

    let conn = try_lock(&state.db)?;
    if db::get_question_set(&conn, set_id)?.is_none() {
        return Err(AppError::NotFound(format!("Question set {} not found", set_id)));
    }
    db::save_completion(&conn, user_id, set_id, &completion)?;
    tracing::info!(
        "User {} completed set {} ({:.0}% success)",
        user_id,
        set_id,
        completion.success_rate * 100.0
    );
    Ok((StatusCode::CREATED, Json(completion)))
}
