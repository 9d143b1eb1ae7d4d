//! Test utilities for database setup.
//!
//! Provides helpers that reuse the authoritative migrations, so tests never
//! carry their own copy of the schema.

use rusqlite::Connection;
use std::path::Path;
use tempfile::TempDir;

use crate::domain::{Flag, Moderation, Question, QuestionContent};

/// Migrated database in a temporary directory, removed when dropped.
pub struct TestEnv {
    /// Temporary directory (kept alive for database file persistence)
    pub temp: TempDir,
    pub conn: Connection,
}

impl TestEnv {
    pub fn new() -> rusqlite::Result<Self> {
        let temp =
            TempDir::new().map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        let conn = Connection::open(temp.path().join("qbank.db"))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        crate::db::schema::run_migrations(&conn)?;

        Ok(Self { temp, conn })
    }

    /// Get the temporary directory path for creating test files.
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Insert a question and return its id
    pub fn insert(&self, q: Question) -> i64 {
        crate::db::insert_question(&self.conn, &q).unwrap()
    }
}

/// Approved text question with CBSE / 10 / Maths classification.
/// `id` 0 lets the database assign one.
pub fn question(id: i64, difficulty: &str, topics: &[&str]) -> Question {
    Question {
        id,
        board: "CBSE".into(),
        class: "10".into(),
        subject: "Maths".into(),
        topics: topics.iter().map(|t| t.to_string()).collect(),
        difficulty_level: difficulty.into(),
        q_type: "MCQ".into(),
        q_number: None,
        content: QuestionContent::Text {
            question: format!("Question {}", id),
            solution: format!("Solution {}", id),
        },
        moderation: Moderation {
            approved: Flag::new(Some(true)),
            ..Moderation::default()
        },
        reviewer_note: None,
    }
}
