pub mod question_sets;
pub mod questions;
pub mod schema;
pub mod tracking;

use rusqlite::{Connection, Result};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::Question;
use crate::error::AppError;

// Re-export all public items from submodules
pub use question_sets::*;
pub use questions::*;
pub use schema::run_migrations;
pub use tracking::*;

pub type DbPool = Arc<Mutex<Connection>>;

/// Extension trait for logging errors before discarding them
pub trait LogOnError<T> {
    /// Log the error at warn level and return None
    fn log_warn(self, context: &str) -> Option<T>;
}

impl<T, E: std::fmt::Display> LogOnError<T> for std::result::Result<T, E> {
    fn log_warn(self, context: &str) -> Option<T> {
        match self {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("{}: {}", context, e);
                None
            }
        }
    }
}

/// Try to acquire the database lock, returning an error if poisoned
pub fn try_lock(pool: &DbPool) -> std::result::Result<MutexGuard<'_, Connection>, AppError> {
    pool.lock().map_err(|_| {
        tracing::error!("Database mutex poisoned - a thread panicked while holding the lock");
        AppError::Unavailable
    })
}

/// Open (creating if needed) and migrate the database
pub fn init_db(path: &Path) -> Result<DbPool> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    run_migrations(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Load questions from a JSON array file when the question table is empty.
/// Returns how many questions were inserted.
pub fn seed_questions(conn: &Connection, seed_file: &Path) -> Result<usize> {
    if question_count(conn)? > 0 {
        return Ok(0);
    }

    let Some(contents) = std::fs::read_to_string(seed_file)
        .log_warn(&format!("Failed to read seed file {}", seed_file.display()))
    else {
        return Ok(0);
    };
    let Some(rows) = serde_json::from_str::<Vec<serde_json::Value>>(&contents)
        .log_warn("Seed file is not a JSON array")
    else {
        return Ok(0);
    };

    let mut inserted = 0;
    for (i, row) in rows.into_iter().enumerate() {
        let Some(question) = serde_json::from_value::<Question>(row)
            .log_warn(&format!("Skipping seed row {}", i))
        else {
            continue;
        };
        insert_question(conn, &question)?;
        inserted += 1;
    }
    tracing::info!("Seeded {} questions from {}", inserted, seed_file.display());
    Ok(inserted)
}
