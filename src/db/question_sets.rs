//! Question set and room storage

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use crate::domain::{QuestionSet, Room, SetFormat};

pub fn create_question_set(
    conn: &Connection,
    name: &str,
    format: SetFormat,
    question_ids: &[i64],
) -> Result<QuestionSet> {
    let created_at = Utc::now();
    let ids_json = serde_json::to_string(question_ids)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    conn.execute(
        "INSERT INTO question_sets (name, format, question_ids, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![name, format.as_str(), ids_json, created_at.to_rfc3339()],
    )?;
    Ok(QuestionSet {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        format,
        question_ids: question_ids.to_vec(),
        created_at,
    })
}

fn row_to_set(row: &Row) -> Result<QuestionSet> {
    let format: String = row.get(2)?;
    let ids_json: String = row.get(3)?;
    let created_at: String = row.get(4)?;
    Ok(QuestionSet {
        id: row.get(0)?,
        name: row.get(1)?,
        format: SetFormat::from_str(&format),
        question_ids: serde_json::from_str(&ids_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
    })
}

pub fn get_question_set(conn: &Connection, id: i64) -> Result<Option<QuestionSet>> {
    conn.query_row(
        "SELECT id, name, format, question_ids, created_at FROM question_sets WHERE id = ?1",
        params![id],
        row_to_set,
    )
    .optional()
}

pub fn list_question_sets(conn: &Connection) -> Result<Vec<QuestionSet>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, format, question_ids, created_at FROM question_sets ORDER BY id",
    )?;
    let sets = stmt
        .query_map([], row_to_set)?
        .collect::<Result<Vec<_>>>()?;
    Ok(sets)
}

pub fn delete_question_set(conn: &Connection, id: i64) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM question_sets WHERE id = ?1", params![id])?;
    if deleted > 0 {
        conn.execute("DELETE FROM room_sets WHERE set_id = ?1", params![id])?;
    }
    Ok(deleted > 0)
}

// ==================== Rooms ====================

pub fn create_room(conn: &Connection, name: &str, teacher_id: &str) -> Result<Room> {
    conn.execute(
        "INSERT INTO rooms (name, teacher_id) VALUES (?1, ?2)",
        params![name, teacher_id],
    )?;
    Ok(Room {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        teacher_id: teacher_id.to_string(),
        student_ids: Vec::new(),
        set_ids: Vec::new(),
    })
}

pub fn get_room(conn: &Connection, id: i64) -> Result<Option<Room>> {
    let room = conn
        .query_row(
            "SELECT id, name, teacher_id FROM rooms WHERE id = ?1",
            params![id],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?)),
        )
        .optional()?;
    let Some((id, name, teacher_id)) = room else {
        return Ok(None);
    };

    let mut stmt =
        conn.prepare("SELECT student_id FROM room_students WHERE room_id = ?1 ORDER BY student_id")?;
    let student_ids = stmt
        .query_map(params![id], |row| row.get(0))?
        .collect::<Result<Vec<String>>>()?;

    let mut stmt = conn.prepare("SELECT set_id FROM room_sets WHERE room_id = ?1 ORDER BY set_id")?;
    let set_ids = stmt
        .query_map(params![id], |row| row.get(0))?
        .collect::<Result<Vec<i64>>>()?;

    Ok(Some(Room {
        id,
        name,
        teacher_id,
        student_ids,
        set_ids,
    }))
}

/// Add students to a room; existing members are ignored
pub fn add_room_students(conn: &Connection, room_id: i64, student_ids: &[String]) -> Result<()> {
    let mut stmt =
        conn.prepare("INSERT OR IGNORE INTO room_students (room_id, student_id) VALUES (?1, ?2)")?;
    for student_id in student_ids {
        stmt.execute(params![room_id, student_id])?;
    }
    Ok(())
}

/// Assign question sets to a room; existing assignments are ignored
pub fn assign_room_sets(conn: &Connection, room_id: i64, set_ids: &[i64]) -> Result<()> {
    let mut stmt = conn.prepare("INSERT OR IGNORE INTO room_sets (room_id, set_id) VALUES (?1, ?2)")?;
    for set_id in set_ids {
        stmt.execute(params![room_id, set_id])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestEnv;

    #[test]
    fn test_question_set_round_trip() {
        let env = TestEnv::new().unwrap();
        let created =
            create_question_set(&env.conn, "Unit test 1", SetFormat::Structured, &[5, 2, 9]).unwrap();

        let loaded = get_question_set(&env.conn, created.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Unit test 1");
        assert_eq!(loaded.format, SetFormat::Structured);
        assert_eq!(loaded.question_ids, vec![5, 2, 9]);

        assert_eq!(list_question_sets(&env.conn).unwrap().len(), 1);
        assert!(delete_question_set(&env.conn, created.id).unwrap());
        assert!(get_question_set(&env.conn, created.id).unwrap().is_none());
        assert!(!delete_question_set(&env.conn, created.id).unwrap());
    }

    #[test]
    fn test_room_membership() {
        let env = TestEnv::new().unwrap();
        let room = create_room(&env.conn, "10-A", "teacher1").unwrap();

        add_room_students(&env.conn, room.id, &["s2".to_string(), "s1".to_string()]).unwrap();
        add_room_students(&env.conn, room.id, &["s1".to_string()]).unwrap();
        assign_room_sets(&env.conn, room.id, &[3, 1, 3]).unwrap();

        let loaded = get_room(&env.conn, room.id).unwrap().unwrap();
        assert_eq!(loaded.student_ids, vec!["s1", "s2"]);
        assert_eq!(loaded.set_ids, vec![1, 3]);
        assert!(get_room(&env.conn, 999).unwrap().is_none());
    }

    #[test]
    fn test_deleting_set_unassigns_it() {
        let env = TestEnv::new().unwrap();
        let set = create_question_set(&env.conn, "Quiz", SetFormat::Freeform, &[]).unwrap();
        let room = create_room(&env.conn, "10-B", "teacher1").unwrap();
        assign_room_sets(&env.conn, room.id, &[set.id]).unwrap();

        delete_question_set(&env.conn, set.id).unwrap();
        assert!(get_room(&env.conn, room.id).unwrap().unwrap().set_ids.is_empty());
    }
}
