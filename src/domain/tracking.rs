//! Per-user practice history: question tracking records and question-set
//! completion statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Most recent self-assessment for a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingStatus {
  Success,
  Failed,
  Unsure,
}

impl TrackingStatus {
  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "success" => Some(Self::Success),
      "failed" => Some(Self::Failed),
      "unsure" => Some(Self::Unsure),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Success => "success",
      Self::Failed => "failed",
      Self::Unsure => "unsure",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingRecord {
  pub status: TrackingStatus,
  #[serde(default)]
  pub timestamp: Option<DateTime<Utc>>,
  #[serde(default, alias = "count")]
  pub attempts: i64,
}

/// Question id -> tracking record
pub type TrackingMap = HashMap<i64, TrackingRecord>;

/// Parse a client-supplied `trackedQuestions` payload.
///
/// Malformed JSON yields an empty map. Entries whose key is not a valid
/// question id, or whose record cannot be read, are dropped individually.
pub fn parse_tracked_questions(raw: &str) -> TrackingMap {
  let entries: HashMap<String, serde_json::Value> = match serde_json::from_str(raw) {
    Ok(entries) => entries,
    Err(e) => {
      tracing::warn!("Malformed trackedQuestions payload, treating as empty: {}", e);
      return TrackingMap::new();
    }
  };

  let mut map = TrackingMap::with_capacity(entries.len());
  for (key, value) in entries {
    let Ok(id) = key.trim().parse::<i64>() else {
      tracing::warn!("Skipping tracked entry with invalid question id {:?}", key);
      continue;
    };
    match serde_json::from_value::<TrackingRecord>(value) {
      Ok(record) => {
        map.insert(id, record);
      }
      Err(e) => tracing::warn!("Skipping tracked entry for question {}: {}", id, e),
    }
  }
  map
}

/// Stats recorded when a user finishes a question set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetCompletion {
  pub success: i64,
  pub failed: i64,
  pub unsure: i64,
  pub duration_secs: i64,
  pub success_rate: f64,
  pub completed_at: DateTime<Utc>,
}

impl SetCompletion {
  /// None when the counts overflow their total
  pub fn new(success: i64, failed: i64, unsure: i64, duration_secs: i64) -> Option<Self> {
    let total = success.checked_add(failed)?.checked_add(unsure)?;
    let success_rate = if total > 0 {
      success as f64 / total as f64
    } else {
      0.0
    };
    Some(Self {
      success,
      failed,
      unsure,
      duration_secs,
      success_rate,
      completed_at: Utc::now(),
    })
  }
}
