//! Question CRUD and predicate queries

use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, Result, Row};

use crate::domain::{Flag, FlagField, Moderation, Question, QuestionContent};
use crate::selection::{IdScope, QuestionQuery, QuestionStore, TriState};

const QUESTION_COLUMNS: &str = r#"
    id, board, class, subject, topics, difficulty_level, q_type, q_number, kind,
    question, solution, question_pdf, solution_pdf,
    in_course, is_correct, hots, dps_approved,
    mod_in_course, mod_is_correct, mod_hots, mod_dps_approved,
    reviewer_note
"#;

/// Which of a flag's two columns a write targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagTarget {
    Base,
    Moderator,
}

pub fn insert_question(conn: &Connection, q: &Question) -> Result<i64> {
    let topics = serde_json::to_string(&q.topics)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    let (question, solution, question_pdf, solution_pdf) = match &q.content {
        QuestionContent::Text { question, solution } => {
            (Some(question.as_str()), Some(solution.as_str()), None, None)
        }
        QuestionContent::PdfSet {
            question_pdf,
            solution_pdf,
        } => (None, None, Some(question_pdf.as_str()), Some(solution_pdf.as_str())),
    };
    let m = &q.moderation;

    conn.execute(
        r#"
    INSERT INTO questions (id, board, class, subject, topics, difficulty_level, q_type, q_number, kind,
                           question, solution, question_pdf, solution_pdf,
                           in_course, is_correct, hots, dps_approved,
                           mod_in_course, mod_is_correct, mod_hots, mod_dps_approved, reviewer_note)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)
    "#,
        params![
            (q.id > 0).then_some(q.id),
            q.board,
            q.class,
            q.subject,
            topics,
            q.difficulty_level,
            q.q_type,
            q.q_number,
            q.content.kind(),
            question,
            solution,
            question_pdf,
            solution_pdf,
            m.in_course.value,
            m.is_correct.value,
            m.hots.value,
            m.approved.value,
            m.in_course.moderator,
            m.is_correct.moderator,
            m.hots.moderator,
            m.approved.moderator,
            q.reviewer_note,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_question_by_id(conn: &Connection, id: i64) -> Result<Option<Question>> {
    let sql = format!("SELECT {} FROM questions WHERE id = ?1", QUESTION_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![id])?;
    if let Some(row) = rows.next()? {
        Ok(Some(row_to_question(row)?))
    } else {
        Ok(None)
    }
}

/// Fetch questions by id, preserving the given order. Unknown ids are
/// skipped.
pub fn get_questions_by_ids(conn: &Connection, ids: &[i64]) -> Result<Vec<Question>> {
    let query = QuestionQuery {
        filter: Default::default(),
        ids: IdScope::Only(ids.to_vec()),
    };
    let found = find_questions(conn, &query)?;
    Ok(ids
        .iter()
        .filter_map(|id| found.iter().find(|q| q.id == *id).cloned())
        .collect())
}

pub fn delete_question(conn: &Connection, id: i64) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM questions WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

pub fn question_count(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM questions", [], |row| row.get(0))
}

/// Set one moderation flag. Returns false if the question does not exist.
pub fn update_flag(
    conn: &Connection,
    id: i64,
    field: FlagField,
    target: FlagTarget,
    value: Option<bool>,
) -> Result<bool> {
    let column = match target {
        FlagTarget::Base => field.column(),
        FlagTarget::Moderator => field.override_column(),
    };
    let sql = format!("UPDATE questions SET {} = ?1 WHERE id = ?2", column);
    let updated = conn.execute(&sql, params![value, id])?;
    Ok(updated > 0)
}

pub fn update_note(conn: &Connection, id: i64, note: Option<&str>) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE questions SET reviewer_note = ?1 WHERE id = ?2",
        params![note, id],
    )?;
    Ok(updated > 0)
}

/// Accumulates SQL conditions with anonymous `?` placeholders
#[derive(Default)]
struct WhereBuilder {
    clauses: Vec<String>,
    values: Vec<Value>,
}

impl WhereBuilder {
    fn eq(&mut self, column: &str, value: &str) {
        self.clauses.push(format!("{} = ?", column));
        self.values.push(Value::Text(value.to_string()));
    }

    fn placeholders(n: usize) -> String {
        vec!["?"; n].join(", ")
    }

    fn in_text(&mut self, column: &str, values: &[String]) {
        self.clauses
            .push(format!("{} IN ({})", column, Self::placeholders(values.len())));
        self.values
            .extend(values.iter().map(|v| Value::Text(v.clone())));
    }

    /// Id lists come from client tracking maps and can exceed SQLite's
    /// bound-variable limit, so they are bound as one JSON array.
    fn ids(&mut self, negate: bool, ids: &[i64]) {
        let op = if negate { "NOT IN" } else { "IN" };
        self.clauses
            .push(format!("id {} (SELECT value FROM json_each(?))", op));
        let list = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
        self.values.push(Value::Text(format!("[{}]", list)));
    }

    fn finish(self) -> (String, Vec<Value>) {
        if self.clauses.is_empty() {
            ("1".to_string(), self.values)
        } else {
            (self.clauses.join(" AND "), self.values)
        }
    }
}

fn tri_state_sql(expr: &str, state: TriState) -> String {
    match state {
        TriState::IsTrue => format!("{} = 1", expr),
        TriState::IsFalse => format!("{} = 0", expr),
        TriState::IsSet => format!("{} IS NOT NULL", expr),
        TriState::TrueOrUnset => format!("({} = 1 OR {} IS NULL)", expr, expr),
        TriState::FalseOrUnset => format!("({} = 0 OR {} IS NULL)", expr, expr),
        TriState::Unset => format!("{} IS NULL", expr),
    }
}

/// Compile a predicate into a WHERE clause and its bound values
pub(crate) fn where_clause(query: &QuestionQuery) -> (String, Vec<Value>) {
    let filter = &query.filter;
    let mut w = WhereBuilder::default();

    for (column, value) in [
        ("board", &filter.board),
        ("class", &filter.class),
        ("subject", &filter.subject),
    ] {
        if let Some(value) = value {
            w.eq(column, value);
        }
    }

    if !filter.topics.is_empty() {
        w.clauses.push(format!(
            "EXISTS (SELECT 1 FROM json_each(questions.topics) WHERE json_each.value IN ({}))",
            WhereBuilder::placeholders(filter.topics.len())
        ));
        w.values
            .extend(filter.topics.iter().map(|t| Value::Text(t.clone())));
    }
    if !filter.difficulties.is_empty() {
        w.in_text("difficulty_level", &filter.difficulties);
    }
    if !filter.q_types.is_empty() {
        w.in_text("q_type", &filter.q_types);
    }
    if let Some(number) = filter.q_number {
        w.clauses.push("q_number = ?".to_string());
        w.values.push(Value::Integer(number));
    }

    for condition in &filter.flags {
        let field = condition.field;
        let expr = if filter.moderator_view {
            format!("COALESCE({}, {})", field.override_column(), field.column())
        } else {
            field.column().to_string()
        };
        w.clauses.push(tri_state_sql(&expr, condition.state));
    }

    match &query.ids {
        IdScope::All => {}
        IdScope::Only(ids) if ids.is_empty() => w.clauses.push("0".to_string()),
        IdScope::Only(ids) => w.ids(false, ids),
        IdScope::Excluding(ids) if ids.is_empty() => {}
        IdScope::Excluding(ids) => w.ids(true, ids),
    }

    w.finish()
}

pub fn find_questions(conn: &Connection, query: &QuestionQuery) -> Result<Vec<Question>> {
    let (clause, values) = where_clause(query);
    let sql = format!(
        "SELECT {} FROM questions WHERE {} ORDER BY id",
        QUESTION_COLUMNS, clause
    );
    let mut stmt = conn.prepare(&sql)?;
    let questions = stmt
        .query_map(params_from_iter(values), |row| row_to_question(row))?
        .collect::<Result<Vec<_>>>()?;
    Ok(questions)
}

pub fn count_questions(conn: &Connection, query: &QuestionQuery) -> Result<i64> {
    let (clause, values) = where_clause(query);
    let sql = format!("SELECT COUNT(*) FROM questions WHERE {}", clause);
    conn.query_row(&sql, params_from_iter(values), |row| row.get(0))
}

/// Reviewer listing: plain filtered paging in question-number order
pub fn list_questions(
    conn: &Connection,
    query: &QuestionQuery,
    skip: usize,
    limit: usize,
) -> Result<Vec<Question>> {
    let (clause, mut values) = where_clause(query);
    let sql = format!(
        "SELECT {} FROM questions WHERE {} ORDER BY q_number IS NULL, q_number, id LIMIT ? OFFSET ?",
        QUESTION_COLUMNS, clause
    );
    values.push(Value::Integer(limit as i64));
    values.push(Value::Integer(skip as i64));
    let mut stmt = conn.prepare(&sql)?;
    let questions = stmt
        .query_map(params_from_iter(values), |row| row_to_question(row))?
        .collect::<Result<Vec<_>>>()?;
    Ok(questions)
}

impl QuestionStore for Connection {
    type Error = rusqlite::Error;

    fn find(&self, query: &QuestionQuery) -> Result<Vec<Question>> {
        find_questions(self, query)
    }

    fn count(&self, query: &QuestionQuery) -> Result<i64> {
        count_questions(self, query)
    }
}

fn flag(row: &Row, base: usize) -> Result<Flag> {
    Ok(Flag {
        value: row.get(base)?,
        moderator: row.get(base + 4)?,
    })
}

pub(crate) fn row_to_question(row: &Row) -> Result<Question> {
    let topics_json: String = row.get(4)?;
    let topics: Vec<String> = serde_json::from_str(&topics_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    let kind: String = row.get(8)?;
    let content = if kind == "pdf_set" {
        QuestionContent::PdfSet {
            question_pdf: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
            solution_pdf: row.get::<_, Option<String>>(12)?.unwrap_or_default(),
        }
    } else {
        QuestionContent::Text {
            question: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
            solution: row.get::<_, Option<String>>(10)?.unwrap_or_default(),
        }
    };

    Ok(Question {
        id: row.get(0)?,
        board: row.get(1)?,
        class: row.get(2)?,
        subject: row.get(3)?,
        topics,
        difficulty_level: row.get(5)?,
        q_type: row.get(6)?,
        q_number: row.get(7)?,
        content,
        moderation: Moderation {
            in_course: flag(row, 13)?,
            is_correct: flag(row, 14)?,
            hots: flag(row, 15)?,
            approved: flag(row, 16)?,
        },
        reviewer_note: row.get(21)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::{build_filter, Audience, QuestionFilter, QuestionParams};
    use crate::testing::{question, TestEnv};

    fn query_for(filter: QuestionFilter) -> QuestionQuery {
        QuestionQuery::new(filter)
    }

    fn ids(qs: &[Question]) -> Vec<i64> {
        qs.iter().map(|q| q.id).collect()
    }

    fn staff_params(json: serde_json::Value) -> QuestionQuery {
        let params: QuestionParams = serde_json::from_value(json).unwrap();
        query_for(build_filter(&params, Audience::Staff))
    }

    #[test]
    fn test_insert_and_get_round_trip() {
        let env = TestEnv::new().unwrap();
        let mut q = question(0, "Hard", &["Algebra", "Geometry"]);
        q.moderation.hots = Flag {
            value: Some(false),
            moderator: Some(true),
        };
        q.reviewer_note = Some("check units".into());
        let id = insert_question(&env.conn, &q).unwrap();
        assert!(id > 0);

        let loaded = get_question_by_id(&env.conn, id).unwrap().unwrap();
        assert_eq!(loaded.topics, vec!["Algebra", "Geometry"]);
        assert_eq!(loaded.moderation.hots.effective(), Some(true));
        assert_eq!(loaded.reviewer_note.as_deref(), Some("check units"));
        assert_eq!(loaded.content, q.content);
    }

    #[test]
    fn test_pdf_set_round_trip() {
        let env = TestEnv::new().unwrap();
        let mut q = question(5, "Medium", &[]);
        q.content = QuestionContent::PdfSet {
            question_pdf: "2023/set1-q.pdf".into(),
            solution_pdf: "2023/set1-s.pdf".into(),
        };
        env.insert(q.clone());

        let loaded = get_question_by_id(&env.conn, 5).unwrap().unwrap();
        assert_eq!(loaded.content, q.content);
    }

    #[test]
    fn test_get_missing_question() {
        let env = TestEnv::new().unwrap();
        assert!(get_question_by_id(&env.conn, 42).unwrap().is_none());
        assert!(!delete_question(&env.conn, 42).unwrap());
    }

    /// 3 true, 3 false, 3 unset on the in-course flag
    fn tri_state_env() -> TestEnv {
        let env = TestEnv::new().unwrap();
        let values = [Some(true), Some(false), None];
        for id in 1..=9 {
            let mut q = question(id, "Easy", &["Algebra"]);
            q.moderation.in_course.value = values[((id - 1) / 3) as usize];
            env.insert(q);
        }
        env
    }

    #[test]
    fn test_tri_state_table_against_documents() {
        let env = tri_state_env();
        let cases: [(&str, Vec<i64>); 8] = [
            ("Yes,No", vec![1, 2, 3, 4, 5, 6]),
            ("Yes,Unmarked", vec![1, 2, 3, 7, 8, 9]),
            ("No,Unmarked", vec![4, 5, 6, 7, 8, 9]),
            ("Yes", vec![1, 2, 3]),
            ("No", vec![4, 5, 6]),
            ("Unmarked", vec![7, 8, 9]),
            ("Yes,No,Unmarked", (1..=9).collect()),
            ("", (1..=9).collect()),
        ];
        for (subset, expected) in cases {
            let query = staff_params(serde_json::json!({ "inCourse": subset }));
            let found = find_questions(&env.conn, &query).unwrap();
            assert_eq!(ids(&found), expected, "subset {:?}", subset);
            assert_eq!(count_questions(&env.conn, &query).unwrap(), expected.len() as i64);
        }
    }

    #[test]
    fn test_moderator_view_uses_override() {
        let env = TestEnv::new().unwrap();
        let mut approved_by_mod = question(1, "Easy", &["Algebra"]);
        approved_by_mod.moderation.in_course = Flag::new(None);
        approved_by_mod.moderation.in_course.moderator = Some(true);
        approved_by_mod.moderation.is_correct = Flag::new(Some(true));
        env.insert(approved_by_mod);

        let mut rejected_by_mod = question(2, "Easy", &["Algebra"]);
        rejected_by_mod.moderation.in_course = Flag::new(Some(true));
        rejected_by_mod.moderation.is_correct = Flag::new(Some(true));
        rejected_by_mod.moderation.approved.moderator = Some(false);
        env.insert(rejected_by_mod);

        let query = staff_params(serde_json::json!({ "moderatorView": "true" }));
        assert_eq!(ids(&find_questions(&env.conn, &query).unwrap()), vec![1]);
    }

    #[test]
    fn test_classification_filters() {
        let env = TestEnv::new().unwrap();
        let mut a = question(1, "Easy", &["Algebra"]);
        a.q_type = "LA".into();
        a.q_number = Some(7);
        env.insert(a);
        env.insert(question(2, "Hard", &["Geometry", "Trigonometry"]));
        let mut c = question(3, "Medium", &["Calculus"]);
        c.board = "ICSE".into();
        env.insert(c);

        let q = staff_params(serde_json::json!({ "topic": "Trigonometry,Algebra" }));
        assert_eq!(ids(&find_questions(&env.conn, &q).unwrap()), vec![1, 2]);

        let q = staff_params(serde_json::json!({ "board": "ICSE" }));
        assert_eq!(ids(&find_questions(&env.conn, &q).unwrap()), vec![3]);

        let q = staff_params(serde_json::json!({ "difficulty_level": "Hard,Medium", "board": "CBSE" }));
        assert_eq!(ids(&find_questions(&env.conn, &q).unwrap()), vec![2]);

        let q = staff_params(serde_json::json!({ "q_type": "LA" }));
        assert_eq!(ids(&find_questions(&env.conn, &q).unwrap()), vec![1]);

        let q = staff_params(serde_json::json!({ "q_number": "7" }));
        assert_eq!(ids(&find_questions(&env.conn, &q).unwrap()), vec![1]);
    }

    #[test]
    fn test_id_scopes() {
        let env = TestEnv::new().unwrap();
        for id in 1..=4 {
            env.insert(question(id, "Easy", &["Algebra"]));
        }
        let base = query_for(QuestionFilter::default());

        assert_eq!(ids(&find_questions(&env.conn, &base.only(vec![2, 4])).unwrap()), vec![2, 4]);
        assert!(find_questions(&env.conn, &base.only(vec![])).unwrap().is_empty());
        assert_eq!(ids(&find_questions(&env.conn, &base.excluding(vec![1])).unwrap()), vec![2, 3, 4]);
        assert_eq!(find_questions(&env.conn, &base.excluding(vec![])).unwrap().len(), 4);
    }

    #[test]
    fn test_id_scopes_beyond_variable_limit() {
        let env = TestEnv::new().unwrap();
        for id in 1..=4 {
            env.insert(question(id, "Easy", &["Algebra"]));
        }
        let base = query_for(QuestionFilter::default());
        let mut many: Vec<i64> = (100..40_100).collect();
        many.push(2);

        assert_eq!(ids(&find_questions(&env.conn, &base.only(many.clone())).unwrap()), vec![2]);
        assert_eq!(ids(&find_questions(&env.conn, &base.excluding(many.clone())).unwrap()), vec![1, 3, 4]);
        assert_eq!(count_questions(&env.conn, &base.excluding(many)).unwrap(), 3);
    }

    #[test]
    fn test_get_by_ids_preserves_order() {
        let env = TestEnv::new().unwrap();
        for id in 1..=3 {
            env.insert(question(id, "Easy", &["Algebra"]));
        }
        let found = get_questions_by_ids(&env.conn, &[3, 99, 1]).unwrap();
        assert_eq!(ids(&found), vec![3, 1]);
    }

    #[test]
    fn test_update_flag_targets() {
        let env = TestEnv::new().unwrap();
        env.insert(question(1, "Easy", &["Algebra"]));

        assert!(update_flag(&env.conn, 1, FlagField::IsCorrect, FlagTarget::Base, Some(false)).unwrap());
        assert!(update_flag(&env.conn, 1, FlagField::IsCorrect, FlagTarget::Moderator, Some(true)).unwrap());
        assert!(!update_flag(&env.conn, 99, FlagField::Hots, FlagTarget::Base, None).unwrap());

        let q = get_question_by_id(&env.conn, 1).unwrap().unwrap();
        assert_eq!(q.moderation.is_correct.value, Some(false));
        assert_eq!(q.moderation.is_correct.moderator, Some(true));
    }

    #[test]
    fn test_list_questions_pages_by_number() {
        let env = TestEnv::new().unwrap();
        for id in 1..=5 {
            let mut q = question(id, "Easy", &["Algebra"]);
            q.q_number = Some(10 - id);
            env.insert(q);
        }
        let base = query_for(QuestionFilter::default());
        assert_eq!(ids(&list_questions(&env.conn, &base, 0, 2).unwrap()), vec![5, 4]);
        assert_eq!(ids(&list_questions(&env.conn, &base, 4, 2).unwrap()), vec![1]);
    }
}
