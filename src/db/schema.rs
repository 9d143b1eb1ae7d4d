//! Version-gated schema migrations.
//!
//! Each migration checks the recorded version, runs inside a transaction
//! and records the new version in `db_version`, so it runs exactly once.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result};

/// Current schema version. Increment when adding a migration.
pub const SCHEMA_VERSION: i32 = 1;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS db_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL,
            description TEXT
        );
        "#,
    )?;

    let current_version = get_schema_version(conn)?;
    tracing::debug!("qbank schema version: {}", current_version);

    if current_version < 1 {
        migrate_v0_to_v1(conn)?;
    }

    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    let version: Option<i32> = conn
        .query_row("SELECT MAX(version) FROM db_version", [], |row| {
            row.get::<_, Option<i32>>(0)
        })
        .optional()?
        .flatten();
    Ok(version.unwrap_or(0))
}

fn record_version(conn: &Connection, version: i32, description: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO db_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
        params![version, Utc::now().to_rfc3339(), description],
    )?;
    Ok(())
}

/// v0→v1: questions, question sets, user history, rooms
fn migrate_v0_to_v1(conn: &Connection) -> Result<()> {
    tracing::info!("Running migration v0→v1: Create base tables");

    conn.execute_batch("BEGIN")?;
    let result = conn
        .execute_batch(
            r#"
        CREATE TABLE IF NOT EXISTS questions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            board TEXT NOT NULL,
            class TEXT NOT NULL,
            subject TEXT NOT NULL,
            -- JSON array of topic names
            topics TEXT NOT NULL DEFAULT '[]',
            difficulty_level TEXT NOT NULL,
            q_type TEXT NOT NULL,
            q_number INTEGER,
            -- 'text' or 'pdf_set'
            kind TEXT NOT NULL DEFAULT 'text',
            question TEXT,
            solution TEXT,
            question_pdf TEXT,
            solution_pdf TEXT,
            -- Tri-state flags: 1, 0 or NULL
            in_course INTEGER,
            is_correct INTEGER,
            hots INTEGER,
            dps_approved INTEGER,
            mod_in_course INTEGER,
            mod_is_correct INTEGER,
            mod_hots INTEGER,
            mod_dps_approved INTEGER,
            reviewer_note TEXT
        );

        CREATE TABLE IF NOT EXISTS question_sets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            format TEXT NOT NULL DEFAULT 'freeform',
            -- JSON array of question ids, in order
            question_ids TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS user_tracking (
            user_id TEXT NOT NULL,
            question_id INTEGER NOT NULL,
            status TEXT NOT NULL,
            last_attempt TEXT NOT NULL,
            attempts INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (user_id, question_id)
        );

        CREATE TABLE IF NOT EXISTS set_completions (
            user_id TEXT NOT NULL,
            set_id INTEGER NOT NULL,
            success INTEGER NOT NULL,
            failed INTEGER NOT NULL,
            unsure INTEGER NOT NULL,
            duration_secs INTEGER NOT NULL,
            success_rate REAL NOT NULL,
            completed_at TEXT NOT NULL,
            PRIMARY KEY (user_id, set_id)
        );

        CREATE TABLE IF NOT EXISTS rooms (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            teacher_id TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS room_students (
            room_id INTEGER NOT NULL,
            student_id TEXT NOT NULL,
            PRIMARY KEY (room_id, student_id),
            FOREIGN KEY (room_id) REFERENCES rooms(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS room_sets (
            room_id INTEGER NOT NULL,
            set_id INTEGER NOT NULL,
            PRIMARY KEY (room_id, set_id),
            FOREIGN KEY (room_id) REFERENCES rooms(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_questions_classification
            ON questions(board, class, subject);
        CREATE INDEX IF NOT EXISTS idx_questions_difficulty ON questions(difficulty_level);
        CREATE INDEX IF NOT EXISTS idx_user_tracking_user ON user_tracking(user_id);
        "#,
        )
        .and_then(|_| record_version(conn, 1, "Create base tables"));

    match result {
        Ok(()) => conn.execute_batch("COMMIT"),
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(e)
        }
    }
}
