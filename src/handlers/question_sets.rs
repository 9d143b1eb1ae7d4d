//! Question set endpoints.
//!
//! Sets are authored by staff from reviewed questions and handed out to
//! rooms; students only ever read them.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::auth::SessionToken;
use crate::db::{self, try_lock};
use crate::domain::{Question, QuestionSet, SetFormat};
use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Create
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateSetRequest {
    pub name: String,
    #[serde(default)]
    pub format: SetFormat,
    /// Accepts numbers or numeric strings; anything else is dropped
    #[serde(default)]
    pub question_ids: Vec<serde_json::Value>,
}

/// Parse a loosely typed id from a JSON payload
pub(crate) fn parse_id(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|id| *id > 0)
}

/// Keep ids that parse and refer to an existing question, in request order
fn resolve_question_ids(conn: &Connection, raw: &[serde_json::Value]) -> Result<Vec<i64>, AppError> {
    let mut ids = Vec::with_capacity(raw.len());
    for value in raw {
        let Some(id) = parse_id(value) else {
            tracing::warn!("Dropping invalid question id {}", value);
            continue;
        };
        if ids.contains(&id) {
            continue;
        }
        if db::get_question_by_id(conn, id)?.is_none() {
            tracing::warn!("Dropping unknown question id {}", id);
            continue;
        }
        ids.push(id);
    }
    Ok(ids)
}

/// POST /api/question-sets
pub async fn create_set(
    _session: SessionToken,
    State(state): State<AppState>,
    Json(request): Json<CreateSetRequest>,
) -> Result<(StatusCode, Json<QuestionSet>), AppError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Set name is required".into()));
    }

    let conn = try_lock(&state.db)?;
    let ids = resolve_question_ids(&conn, &request.question_ids)?;
    if ids.is_empty() {
        return Err(AppError::BadRequest("No valid question ids".into()));
    }

    let set = db::create_question_set(&conn, name, request.format, &ids)?;
    tracing::info!("Created question set {} with {} questions", set.id, ids.len());
    Ok((StatusCode::CREATED, Json(set)))
}

// ============================================================================
// Read / delete
// ============================================================================

/// GET /api/question-sets
pub async fn list_sets(State(state): State<AppState>) -> Result<Json<Vec<QuestionSet>>, AppError> {
    let conn = try_lock(&state.db)?;
    Ok(Json(db::list_question_sets(&conn)?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetWithQuestions {
    #[serde(flatten)]
    pub set: QuestionSet,
    /// Questions still present, in set order
    pub questions: Vec<Question>,
}

/// GET /api/question-sets/{id}
pub async fn get_set(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SetWithQuestions>, AppError> {
    let conn = try_lock(&state.db)?;
    let set = db::get_question_set(&conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("Question set {} not found", id)))?;
    let questions = db::get_questions_by_ids(&conn, &set.question_ids)?;
    Ok(Json(SetWithQuestions { set, questions }))
}

/// DELETE /api/question-sets/{id}
pub async fn delete_set(
    _session: SessionToken,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let conn = try_lock(&state.db)?;
    if db::delete_question_set(&conn, id)? {
        tracing::info!("Question set {} deleted", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Question set {} not found", id)))
    }
}
