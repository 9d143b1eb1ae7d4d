//! Application state passed to all handlers.

use crate::db::DbPool;

/// Shared state, constructed once in `main` and injected into handlers
#[derive(Clone)]
pub struct AppState {
    /// The single database connection
    pub db: DbPool,
}

impl AppState {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}
