//! Question endpoints: practice fetch, counts, reviewer listing and
//! field-level moderation.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::auth::SessionToken;
use crate::db::{self, try_lock, FlagTarget};
use crate::domain::{FlagField, Question};
use crate::error::AppError;
use crate::selection::{self, build_filter, Audience, Page, QuestionParams, QuestionQuery};
use crate::state::AppState;

fn fetch(state: &AppState, params: &QuestionParams) -> Result<Json<Vec<Question>>, AppError> {
    let conn = try_lock(&state.db)?;
    let mut rng = rand::rng();
    let questions = selection::fetch_questions(&*conn, params, &mut rng)?;
    tracing::debug!("Fetched {} questions", questions.len());
    Ok(Json(questions))
}

/// Balanced practice fetch.
///
/// GET /api/questions
pub async fn fetch_questions(
    State(state): State<AppState>,
    Query(params): Query<QuestionParams>,
) -> Result<Json<Vec<Question>>, AppError> {
    fetch(&state, &params)
}

/// Same as the GET fetch with parameters in a JSON body.
///
/// POST /api/questions/fetch
pub async fn fetch_questions_post(
    State(state): State<AppState>,
    Json(params): Json<QuestionParams>,
) -> Result<Json<Vec<Question>>, AppError> {
    fetch(&state, &params)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: i64,
}

/// Number of questions the practice fetch could draw from.
///
/// GET /api/questions/count
pub async fn count_questions(
    State(state): State<AppState>,
    Query(params): Query<QuestionParams>,
) -> Result<Json<CountResponse>, AppError> {
    let query = QuestionQuery::new(build_filter(&params, Audience::Student));
    let conn = try_lock(&state.db)?;
    let count = db::count_questions(&conn, &query)?;
    Ok(Json(CountResponse { count }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewListResponse {
    pub total: i64,
    pub questions: Vec<Question>,
}

/// Reviewer listing without the approval constraint or balancing.
///
/// GET /api/review/questions
pub async fn review_questions(
    _session: SessionToken,
    State(state): State<AppState>,
    Query(params): Query<QuestionParams>,
) -> Result<Json<ReviewListResponse>, AppError> {
    let query = QuestionQuery::new(build_filter(&params, Audience::Staff));
    let page = Page::from_params(&params);
    let conn = try_lock(&state.db)?;
    let total = db::count_questions(&conn, &query)?;
    let questions = db::list_questions(&conn, &query, page.skip(), page.limit)?;
    Ok(Json(ReviewListResponse { total, questions }))
}

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Question {} not found", id))
}

/// GET /api/questions/{id}
pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Question>, AppError> {
    let conn = try_lock(&state.db)?;
    db::get_question_by_id(&conn, id)?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

#[derive(Debug, Deserialize)]
pub struct QuestionPatch {
    /// `inCourse`, `isCorrect`, `hots`, `DPS_approved` or `note`
    pub field: String,
    #[serde(default)]
    pub value: Option<bool>,
    #[serde(default)]
    pub note: Option<String>,
    /// Write the moderator override instead of the base value
    #[serde(default)]
    pub moderator: bool,
}

/// Field-level moderation update.
///
/// PATCH /api/questions/{id}
pub async fn patch_question(
    _session: SessionToken,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<QuestionPatch>,
) -> Result<Json<Question>, AppError> {
    let conn = try_lock(&state.db)?;

    let updated = if patch.field == "note" {
        let note = patch.note.as_deref().map(str::trim).filter(|n| !n.is_empty());
        db::update_note(&conn, id, note)?
    } else {
        let field = FlagField::from_str(&patch.field)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown field {:?}", patch.field)))?;
        let target = if patch.moderator {
            FlagTarget::Moderator
        } else {
            FlagTarget::Base
        };
        db::update_flag(&conn, id, field, target, patch.value)?
    };

    if !updated {
        return Err(not_found(id));
    }
    tracing::info!("Question {} updated: {} (moderator: {})", id, patch.field, patch.moderator);

    db::get_question_by_id(&conn, id)?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// DELETE /api/questions/{id}
pub async fn delete_question(
    _session: SessionToken,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let conn = try_lock(&state.db)?;
    if db::delete_question(&conn, id)? {
        tracing::info!("Question {} deleted", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}
