use serde::{Deserialize, Serialize};

/// Difficulty buckets used for balancing. Stored difficulty strings are
/// free-form; anything that does not parse falls outside every bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

impl Difficulty {
  /// Case-insensitive parse of a stored `difficulty_level`
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "easy" => Some(Self::Easy),
      "medium" => Some(Self::Medium),
      "hard" => Some(Self::Hard),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Easy => "Easy",
      Self::Medium => "Medium",
      Self::Hard => "Hard",
    }
  }
}

/// Moderation flags a question carries. Each has a base value and a
/// moderator override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlagField {
  #[serde(rename = "inCourse")]
  InCourse,
  #[serde(rename = "isCorrect")]
  IsCorrect,
  #[serde(rename = "hots")]
  Hots,
  #[serde(rename = "DPS_approved")]
  Approved,
}

impl FlagField {
  pub const ALL: [FlagField; 4] = [Self::InCourse, Self::IsCorrect, Self::Hots, Self::Approved];

  /// Parse the request-facing field name
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "inCourse" => Some(Self::InCourse),
      "isCorrect" => Some(Self::IsCorrect),
      "hots" => Some(Self::Hots),
      "DPS_approved" => Some(Self::Approved),
      _ => None,
    }
  }

  /// Column holding the base value
  pub fn column(&self) -> &'static str {
    match self {
      Self::InCourse => "in_course",
      Self::IsCorrect => "is_correct",
      Self::Hots => "hots",
      Self::Approved => "dps_approved",
    }
  }

  /// Column holding the moderator override
  pub fn override_column(&self) -> &'static str {
    match self {
      Self::InCourse => "mod_in_course",
      Self::IsCorrect => "mod_is_correct",
      Self::Hots => "mod_hots",
      Self::Approved => "mod_dps_approved",
    }
  }
}

/// A tri-state flag (true / false / unset) with its moderator override.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
  pub value: Option<bool>,
  #[serde(rename = "override")]
  pub moderator: Option<bool>,
}

impl Flag {
  pub fn new(value: Option<bool>) -> Self {
    Self { value, moderator: None }
  }

  /// Value seen by moderator-facing views: the override wins when present.
  pub fn effective(&self) -> Option<bool> {
    self.moderator.or(self.value)
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Moderation {
  #[serde(rename = "inCourse")]
  pub in_course: Flag,
  #[serde(rename = "isCorrect")]
  pub is_correct: Flag,
  pub hots: Flag,
  #[serde(rename = "DPS_approved")]
  pub approved: Flag,
}

impl Moderation {
  pub fn get(&self, field: FlagField) -> &Flag {
    match field {
      FlagField::InCourse => &self.in_course,
      FlagField::IsCorrect => &self.is_correct,
      FlagField::Hots => &self.hots,
      FlagField::Approved => &self.approved,
    }
  }

  pub fn get_mut(&mut self, field: FlagField) -> &mut Flag {
    match field {
      FlagField::InCourse => &mut self.in_course,
      FlagField::IsCorrect => &mut self.is_correct,
      FlagField::Hots => &mut self.hots,
      FlagField::Approved => &mut self.approved,
    }
  }
}

/// A question row is either a textual item or a pointer to a PDF exam set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionContent {
  Text { question: String, solution: String },
  PdfSet { question_pdf: String, solution_pdf: String },
}

impl QuestionContent {
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Text { .. } => "text",
      Self::PdfSet { .. } => "pdf_set",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
  #[serde(default)]
  pub id: i64,
  pub board: String,
  pub class: String,
  pub subject: String,
  #[serde(default)]
  pub topics: Vec<String>,
  pub difficulty_level: String,
  pub q_type: String,
  #[serde(default)]
  pub q_number: Option<i64>,
  pub content: QuestionContent,
  #[serde(default)]
  pub moderation: Moderation,
  #[serde(default)]
  pub reviewer_note: Option<String>,
}

impl Question {
  pub fn difficulty(&self) -> Option<Difficulty> {
    Difficulty::parse(&self.difficulty_level)
  }

  pub fn has_topic(&self, topic: &str) -> bool {
    self.topics.iter().any(|t| t == topic)
  }
}
