pub mod question_sets;
pub mod questions;
pub mod rooms;
pub mod users;

use axum::{
  Json, Router,
  routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
  Json(serde_json::json!({ "status": "ok" }))
}

/// Build the application router around an already-opened database.
pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/health", get(health))
    // Questions
    .route("/api/questions", get(questions::fetch_questions))
    .route("/api/questions/fetch", post(questions::fetch_questions_post))
    .route("/api/questions/count", get(questions::count_questions))
    .route(
      "/api/questions/{id}",
      get(questions::get_question)
        .patch(questions::patch_question)
        .delete(questions::delete_question),
    )
    .route("/api/review/questions", get(questions::review_questions))
    // Question sets
    .route(
      "/api/question-sets",
      get(question_sets::list_sets).post(question_sets::create_set),
    )
    .route(
      "/api/question-sets/{id}",
      get(question_sets::get_set).delete(question_sets::delete_set),
    )
    // User history
    .route(
      "/api/users/{user_id}/tracking",
      get(users::get_tracking).post(users::record_attempt),
    )
    .route(
      "/api/users/{user_id}/completions/{set_id}",
      post(users::record_completion),
    )
    // Rooms
    .route("/api/rooms", post(rooms::create_room))
    .route("/api/rooms/{id}", get(rooms::get_room))
    .route("/api/rooms/{id}/students", post(rooms::add_students))
    .route("/api/rooms/{id}/sets", post(rooms::assign_sets))
    .route("/api/rooms/{id}/report", get(rooms::room_report))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
