//! Classroom endpoints: membership, set assignment and the progress report.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::auth::SessionToken;
use crate::db::{self, try_lock};
use crate::domain::Room;
use crate::error::AppError;
use crate::state::AppState;

use super::question_sets::parse_id;

fn load_room(conn: &Connection, id: i64) -> Result<Room, AppError> {
    db::get_room(conn, id)?.ok_or_else(|| AppError::NotFound(format!("Room {} not found", id)))
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    pub teacher_id: String,
}

/// POST /api/rooms
pub async fn create_room(
    _session: SessionToken,
    State(state): State<AppState>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<Room>), AppError> {
    let name = request.name.trim();
    let teacher_id = request.teacher_id.trim();
    if name.is_empty() || teacher_id.is_empty() {
        return Err(AppError::BadRequest("Room name and teacher id are required".into()));
    }

    let conn = try_lock(&state.db)?;
    let room = db::create_room(&conn, name, teacher_id)?;
    tracing::info!("Created room {} for teacher {}", room.id, teacher_id);
    Ok((StatusCode::CREATED, Json(room)))
}

/// GET /api/rooms/{id}
pub async fn get_room(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Room>, AppError> {
    let conn = try_lock(&state.db)?;
    Ok(Json(load_room(&conn, id)?))
}

#[derive(Debug, Deserialize)]
pub struct AddStudentsRequest {
    pub student_ids: Vec<String>,
}

/// POST /api/rooms/{id}/students
pub async fn add_students(
    _session: SessionToken,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<AddStudentsRequest>,
) -> Result<Json<Room>, AppError> {
    let conn = try_lock(&state.db)?;
    load_room(&conn, id)?;

    let students: Vec<String> = request
        .student_ids
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    db::add_room_students(&conn, id, &students)?;
    Ok(Json(load_room(&conn, id)?))
}

#[derive(Debug, Deserialize)]
pub struct AssignSetsRequest {
    pub set_ids: Vec<serde_json::Value>,
}

/// POST /api/rooms/{id}/sets
pub async fn assign_sets(
    _session: SessionToken,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<AssignSetsRequest>,
) -> Result<Json<Room>, AppError> {
    let conn = try_lock(&state.db)?;
    load_room(&conn, id)?;

    let mut set_ids = Vec::with_capacity(request.set_ids.len());
    for value in &request.set_ids {
        let Some(set_id) = parse_id(value) else {
            tracing::warn!("Dropping invalid set id {}", value);
            continue;
        };
        if db::get_question_set(&conn, set_id)?.is_none() {
            tracing::warn!("Dropping unknown set id {}", set_id);
            continue;
        }
        set_ids.push(set_id);
    }
    db::assign_room_sets(&conn, id, &set_ids)?;
    Ok(Json(load_room(&conn, id)?))
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct SetReport {
    pub set_id: i64,
    pub name: String,
    pub question_count: usize,
    pub assigned_students: usize,
    pub completed: usize,
    /// Mean success rate over room members who completed the set
    pub average_success_rate: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoomReport {
    pub room_id: i64,
    pub name: String,
    pub sets: Vec<SetReport>,
}

fn build_report(conn: &Connection, room: &Room) -> Result<RoomReport, AppError> {
    let mut sets = Vec::with_capacity(room.set_ids.len());
    for &set_id in &room.set_ids {
        let Some(set) = db::get_question_set(conn, set_id)? else {
            continue;
        };
        let completions = db::get_set_completions(conn, set_id)?;
        let rates: Vec<f64> = room
            .student_ids
            .iter()
            .filter_map(|student| completions.get(student))
            .map(|c| c.success_rate)
            .collect();
        let average_success_rate = if rates.is_empty() {
            None
        } else {
            Some(rates.iter().sum::<f64>() / rates.len() as f64)
        };

        sets.push(SetReport {
            set_id,
            name: set.name,
            question_count: set.question_ids.len(),
            assigned_students: room.student_ids.len(),
            completed: rates.len(),
            average_success_rate,
        });
    }

    Ok(RoomReport {
        room_id: room.id,
        name: room.name.clone(),
        sets,
    })
}

/// GET /api/rooms/{id}/report
pub async fn room_report(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RoomReport>, AppError> {
    let conn = try_lock(&state.db)?;
    let room = load_room(&conn, id)?;
    Ok(Json(build_report(&conn, &room)?))
}
