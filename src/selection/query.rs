//! Translate the flat request parameter bag into a question predicate.
//!
//! The predicate is opaque to everything except the persistence layer,
//! which compiles it to SQL (see `db::questions`).

use serde::Deserialize;

use crate::domain::FlagField;

/// Constraint on a tri-state (true / false / unset) flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriState {
  IsTrue,
  IsFalse,
  /// Either true or false
  IsSet,
  TrueOrUnset,
  FalseOrUnset,
  Unset,
}

impl TriState {
  /// Parse a comma-separated subset of `Yes`, `No`, `Unmarked`.
  ///
  /// Selecting all three, or none, places no constraint on the flag.
  pub fn parse(raw: &str) -> Option<Self> {
    let mut yes = false;
    let mut no = false;
    let mut unmarked = false;
    for token in split_list(raw) {
      match token.to_ascii_lowercase().as_str() {
        "yes" => yes = true,
        "no" => no = true,
        "unmarked" => unmarked = true,
        other => tracing::debug!("Ignoring unknown tri-state token {:?}", other),
      }
    }

    match (yes, no, unmarked) {
      (true, true, false) => Some(Self::IsSet),
      (true, false, true) => Some(Self::TrueOrUnset),
      (false, true, true) => Some(Self::FalseOrUnset),
      (true, false, false) => Some(Self::IsTrue),
      (false, true, false) => Some(Self::IsFalse),
      (false, false, true) => Some(Self::Unset),
      _ => None,
    }
  }

  pub fn accepts(&self, value: Option<bool>) -> bool {
    match self {
      Self::IsTrue => value == Some(true),
      Self::IsFalse => value == Some(false),
      Self::IsSet => value.is_some(),
      Self::TrueOrUnset => value != Some(false),
      Self::FalseOrUnset => value != Some(true),
      Self::Unset => value.is_none(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagCondition {
  pub field: FlagField,
  pub state: TriState,
}

/// Who the query is answered for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
  /// Practice fetch: only approved questions are ever returned
  Student,
  /// Reviewer/moderator listings
  Staff,
}

/// Structured predicate over question attributes. Empty fields place no
/// constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionFilter {
  pub board: Option<String>,
  pub class: Option<String>,
  pub subject: Option<String>,
  pub topics: Vec<String>,
  pub difficulties: Vec<String>,
  pub q_types: Vec<String>,
  pub q_number: Option<i64>,
  pub flags: Vec<FlagCondition>,
  /// Evaluate flags on effective (override-first) values
  pub moderator_view: bool,
}

/// Restriction on question ids, layered over a filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IdScope {
  #[default]
  All,
  Only(Vec<i64>),
  Excluding(Vec<i64>),
}

/// What the persistence collaborator is asked to `find` or `count`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionQuery {
  pub filter: QuestionFilter,
  pub ids: IdScope,
}

impl QuestionQuery {
  pub fn new(filter: QuestionFilter) -> Self {
    Self {
      filter,
      ids: IdScope::All,
    }
  }

  pub fn only(&self, ids: Vec<i64>) -> Self {
    Self {
      filter: self.filter.clone(),
      ids: IdScope::Only(ids),
    }
  }

  pub fn excluding(&self, ids: Vec<i64>) -> Self {
    Self {
      filter: self.filter.clone(),
      ids: IdScope::Excluding(ids),
    }
  }
}

/// A request parameter that may arrive as a query-string value or as a
/// typed JSON value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Param {
  Bool(bool),
  Int(i64),
  Text(String),
}

impl Param {
  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Self::Int(n) => Some(*n),
      Self::Text(s) => s.trim().parse().ok(),
      Self::Bool(_) => None,
    }
  }

  pub fn as_bool(&self) -> bool {
    match self {
      Self::Bool(b) => *b,
      Self::Int(n) => *n != 0,
      Self::Text(s) => matches!(s.trim(), "true" | "1"),
    }
  }
}

/// `trackedQuestions` is sent as a JSON string in query strings, but JSON
/// bodies may inline the object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TrackedPayload {
  Raw(String),
  Inline(serde_json::Value),
}

impl TrackedPayload {
  pub fn to_json_string(&self) -> String {
    match self {
      Self::Raw(s) => s.clone(),
      Self::Inline(value) => value.to_string(),
    }
  }
}

/// Flat parameter bag of the question fetch endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionParams {
  #[serde(default)]
  pub board: Option<String>,
  #[serde(default)]
  pub class: Option<String>,
  #[serde(default)]
  pub subject: Option<String>,
  #[serde(default)]
  pub topic: Option<String>,
  #[serde(default)]
  pub difficulty_level: Option<String>,
  #[serde(default)]
  pub q_type: Option<String>,
  #[serde(default)]
  pub q_number: Option<Param>,
  #[serde(default, rename = "inCourse")]
  pub in_course: Option<String>,
  #[serde(default, rename = "isCorrect")]
  pub is_correct: Option<String>,
  #[serde(default, rename = "DPS_approved")]
  pub approved: Option<String>,
  #[serde(default, rename = "moderatorView")]
  pub moderator_view: Option<Param>,
  #[serde(default)]
  pub page: Option<Param>,
  #[serde(default, alias = "limit")]
  pub amount: Option<Param>,
  #[serde(default, rename = "userId")]
  pub user_id: Option<String>,
  #[serde(default, rename = "trackedQuestions")]
  pub tracked_questions: Option<TrackedPayload>,
}

impl QuestionParams {
  pub fn topics(&self) -> Vec<String> {
    list_param(&self.topic)
  }

  pub fn difficulties(&self) -> Vec<String> {
    list_param(&self.difficulty_level)
  }

  pub fn is_moderator_view(&self) -> bool {
    self.moderator_view.as_ref().is_some_and(Param::as_bool)
  }
}

/// Split a comma-separated list, trimming and dropping empty entries
pub fn split_list(raw: &str) -> impl Iterator<Item = &str> {
  raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn list_param(raw: &Option<String>) -> Vec<String> {
  raw
    .as_deref()
    .map(|s| split_list(s).map(str::to_string).collect())
    .unwrap_or_default()
}

fn single_param(raw: &Option<String>) -> Option<String> {
  raw
    .as_deref()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
}

/// Build the predicate for a parameter bag.
pub fn build_filter(params: &QuestionParams, audience: Audience) -> QuestionFilter {
  let moderator_view = params.is_moderator_view();

  let mut flags = Vec::new();
  for (field, raw) in [
    (FlagField::InCourse, &params.in_course),
    (FlagField::IsCorrect, &params.is_correct),
    (FlagField::Approved, &params.approved),
  ] {
    if let Some(state) = raw.as_deref().and_then(TriState::parse) {
      flags.push(FlagCondition { field, state });
    }
  }

  if moderator_view {
    for field in [FlagField::InCourse, FlagField::IsCorrect, FlagField::Approved] {
      flags.push(FlagCondition {
        field,
        state: TriState::IsTrue,
      });
    }
  }

  if audience == Audience::Student {
    flags.push(FlagCondition {
      field: FlagField::Approved,
      state: TriState::IsTrue,
    });
  }

  QuestionFilter {
    board: single_param(&params.board),
    class: single_param(&params.class),
    subject: single_param(&params.subject),
    topics: params.topics(),
    difficulties: params.difficulties(),
    q_types: list_param(&params.q_type),
    q_number: params.q_number.as_ref().and_then(Param::as_i64),
    flags,
    moderator_view,
  }
}
