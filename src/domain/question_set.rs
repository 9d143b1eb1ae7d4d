use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a question set was put together
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetFormat {
  /// Follows the structured curriculum paper layout
  Structured,
  #[default]
  Freeform,
}

impl SetFormat {
  pub fn from_str(s: &str) -> Self {
    match s {
      "structured" => Self::Structured,
      _ => Self::Freeform,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Structured => "structured",
      Self::Freeform => "freeform",
    }
  }
}

/// Named, ordered list of question ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionSet {
  pub id: i64,
  pub name: String,
  pub format: SetFormat,
  pub question_ids: Vec<i64>,
  pub created_at: DateTime<Utc>,
}

/// Teacher-owned classroom
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
  pub id: i64,
  pub name: String,
  pub teacher_id: String,
  pub student_ids: Vec<String>,
  pub set_ids: Vec<i64>,
}
