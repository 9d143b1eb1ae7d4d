//! Per-user question tracking and question-set completion stats

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Result};
use std::collections::HashMap;

use super::LogOnError;
use crate::domain::{SetCompletion, TrackingMap, TrackingRecord, TrackingStatus};

fn parse_timestamp(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

/// Record a self-assessment: status replaced, attempts incremented
pub fn record_attempt(
    conn: &Connection,
    user_id: &str,
    question_id: i64,
    status: TrackingStatus,
) -> Result<TrackingRecord> {
    let now = Utc::now();
    conn.execute(
        r#"
    INSERT INTO user_tracking (user_id, question_id, status, last_attempt, attempts)
    VALUES (?1, ?2, ?3, ?4, 1)
    ON CONFLICT(user_id, question_id) DO UPDATE SET
        status = excluded.status,
        last_attempt = excluded.last_attempt,
        attempts = attempts + 1
    "#,
        params![user_id, question_id, status.as_str(), now.to_rfc3339()],
    )?;

    let attempts: i64 = conn.query_row(
        "SELECT attempts FROM user_tracking WHERE user_id = ?1 AND question_id = ?2",
        params![user_id, question_id],
        |row| row.get(0),
    )?;

    Ok(TrackingRecord {
        status,
        timestamp: Some(now),
        attempts,
    })
}

pub fn get_tracking(conn: &Connection, user_id: &str) -> Result<TrackingMap> {
    let mut stmt = conn.prepare(
        "SELECT question_id, status, last_attempt, attempts FROM user_tracking WHERE user_id = ?1",
    )?;
    let rows = stmt
        .query_map(params![user_id], |row| {
            let status: String = row.get(1)?;
            let last_attempt: String = row.get(2)?;
            Ok((
                row.get::<_, i64>(0)?,
                status,
                last_attempt,
                row.get::<_, i64>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>>>()?;

    let mut map = TrackingMap::with_capacity(rows.len());
    for (question_id, status, last_attempt, attempts) in rows {
        let Some(status) = TrackingStatus::from_str(&status) else {
            tracing::warn!("Unknown tracking status {:?} for question {}", status, question_id);
            continue;
        };
        map.insert(
            question_id,
            TrackingRecord {
                status,
                timestamp: parse_timestamp(&last_attempt).log_warn(&format!(
                    "Unreadable attempt time {:?} for question {}",
                    last_attempt, question_id
                )),
                attempts,
            },
        );
    }
    Ok(map)
}

pub fn save_completion(
    conn: &Connection,
    user_id: &str,
    set_id: i64,
    completion: &SetCompletion,
) -> Result<()> {
    conn.execute(
        r#"
    INSERT OR REPLACE INTO set_completions
        (user_id, set_id, success, failed, unsure, duration_secs, success_rate, completed_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    "#,
        params![
            user_id,
            set_id,
            completion.success,
            completion.failed,
            completion.unsure,
            completion.duration_secs,
            completion.success_rate,
            completion.completed_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Completions of one set, keyed by user
pub fn get_set_completions(conn: &Connection, set_id: i64) -> Result<HashMap<String, SetCompletion>> {
    let mut stmt = conn.prepare(
        r#"
    SELECT user_id, success, failed, unsure, duration_secs, success_rate, completed_at
    FROM set_completions WHERE set_id = ?1
    "#,
    )?;
    let rows = stmt
        .query_map(params![set_id], |row| {
            let completed_at: String = row.get(6)?;
            let completed_at = parse_timestamp(&completed_at)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;
            Ok((
                row.get::<_, String>(0)?,
                SetCompletion {
                    success: row.get(1)?,
                    failed: row.get(2)?,
                    unsure: row.get(3)?,
                    duration_secs: row.get(4)?,
                    success_rate: row.get(5)?,
                    completed_at,
                },
            ))
        })?
        .collect::<Result<HashMap<_, _>>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestEnv;

    #[test]
    fn test_attempts_only_increase_and_status_is_latest() {
        let env = TestEnv::new().unwrap();

        let first = record_attempt(&env.conn, "u1", 10, TrackingStatus::Failed).unwrap();
        assert_eq!(first.attempts, 1);
        let second = record_attempt(&env.conn, "u1", 10, TrackingStatus::Success).unwrap();
        assert_eq!(second.attempts, 2);

        let map = get_tracking(&env.conn, "u1").unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map[&10].status, TrackingStatus::Success);
        assert_eq!(map[&10].attempts, 2);
        assert!(map[&10].timestamp.is_some());
    }

    #[test]
    fn test_tracking_is_per_user() {
        let env = TestEnv::new().unwrap();
        record_attempt(&env.conn, "u1", 1, TrackingStatus::Unsure).unwrap();
        record_attempt(&env.conn, "u2", 2, TrackingStatus::Failed).unwrap();

        let u1 = get_tracking(&env.conn, "u1").unwrap();
        assert!(u1.contains_key(&1));
        assert!(!u1.contains_key(&2));
        assert!(get_tracking(&env.conn, "nobody").unwrap().is_empty());
    }

    #[test]
    fn test_tracking_map_serializes_as_payload() {
        let env = TestEnv::new().unwrap();
        record_attempt(&env.conn, "u1", 3, TrackingStatus::Failed).unwrap();

        let json = serde_json::to_string(&get_tracking(&env.conn, "u1").unwrap()).unwrap();
        let parsed = crate::domain::parse_tracked_questions(&json);
        assert_eq!(parsed[&3].status, TrackingStatus::Failed);
    }

    #[test]
    fn test_completion_replaced_on_resubmit() {
        let env = TestEnv::new().unwrap();
        save_completion(&env.conn, "u1", 7, &SetCompletion::new(1, 4, 0, 300).unwrap()).unwrap();
        save_completion(&env.conn, "u1", 7, &SetCompletion::new(4, 1, 0, 250).unwrap()).unwrap();
        save_completion(&env.conn, "u2", 7, &SetCompletion::new(2, 2, 1, 400).unwrap()).unwrap();

        let completions = get_set_completions(&env.conn, 7).unwrap();
        assert_eq!(completions.len(), 2);
        assert_eq!(completions["u1"].success, 4);
        assert!((completions["u1"].success_rate - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_unreadable_attempt_time_is_not_invented() {
        let env = TestEnv::new().unwrap();
        env.conn
            .execute(
                "INSERT INTO user_tracking (user_id, question_id, status, last_attempt, attempts)
                 VALUES ('u1', 5, 'unsure', 'yesterday-ish', 2)",
                [],
            )
            .unwrap();

        let map = get_tracking(&env.conn, "u1").unwrap();
        assert_eq!(map[&5].status, TrackingStatus::Unsure);
        assert_eq!(map[&5].attempts, 2);
        assert_eq!(map[&5].timestamp, None);
    }

    #[test]
    fn test_unreadable_completion_time_fails_row() {
        let env = TestEnv::new().unwrap();
        env.conn
            .execute(
                "INSERT INTO set_completions
                 (user_id, set_id, success, failed, unsure, duration_secs, success_rate, completed_at)
                 VALUES ('u1', 9, 1, 0, 0, 10, 1.0, 'not a time')",
                [],
            )
            .unwrap();

        assert!(get_set_completions(&env.conn, 9).is_err());
    }
}
