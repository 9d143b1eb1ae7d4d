//! Per-request orchestration of the practice fetch.

use rand::Rng;

use super::balancer::{balance, BalanceOptions};
use super::query::{build_filter, Audience, Param, QuestionParams, QuestionQuery};
use super::scheduler::select_with_review;
use super::QuestionStore;
use crate::config;
use crate::domain::{parse_tracked_questions, Question, TrackingMap};

/// 1-based page of `limit` items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
  pub page: usize,
  pub limit: usize,
}

impl Page {
  /// Read `page` and `amount`/`limit`, falling back to defaults for missing
  /// or non-positive values.
  pub fn from_params(params: &QuestionParams) -> Self {
    let positive = |p: &Option<Param>| {
      p.as_ref()
        .and_then(Param::as_i64)
        .filter(|n| *n > 0)
        .map(|n| n as usize)
    };
    Self {
      page: positive(&params.page).unwrap_or(config::DEFAULT_PAGE),
      limit: positive(&params.amount).unwrap_or(config::DEFAULT_PAGE_SIZE),
    }
  }

  pub fn skip(&self) -> usize {
    (self.page - 1).saturating_mul(self.limit)
  }

  /// How many balanced questions are needed to cover this page
  pub fn target(&self) -> usize {
    self.page.saturating_mul(self.limit)
  }

  pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
    items.into_iter().skip(self.skip()).take(self.limit).collect()
  }
}

/// Tracking history for the review path, if the request carries any
fn request_tracking(params: &QuestionParams) -> Option<TrackingMap> {
  params.user_id.as_deref().map(str::trim).filter(|id| !id.is_empty())?;
  let raw = params.tracked_questions.as_ref()?.to_json_string();
  let tracking = parse_tracked_questions(&raw);
  if tracking.is_empty() { None } else { Some(tracking) }
}

/// Answer one practice fetch.
///
/// Every call re-queries, re-balances and re-shuffles, so consecutive pages
/// are neither guaranteed disjoint nor exhaustive.
pub fn fetch_questions<S, R>(
  store: &S,
  params: &QuestionParams,
  rng: &mut R,
) -> Result<Vec<Question>, S::Error>
where
  S: QuestionStore + ?Sized,
  R: Rng + ?Sized,
{
  let filter = build_filter(params, Audience::Student);
  let page = Page::from_params(params);
  let options = BalanceOptions {
    balance_difficulty: filter.difficulties.is_empty(),
    topics: &filter.topics,
  };
  let query = QuestionQuery::new(filter.clone());

  let balanced = match request_tracking(params) {
    Some(tracking) => {
      tracing::debug!("Review path with {} tracked questions", tracking.len());
      select_with_review(store, &query, &tracking, page.target(), &options, rng)?
    }
    None => {
      let candidates = store.find(&query)?;
      balance(candidates, page.target(), &options, rng)
    }
  };

  Ok(page.apply(balanced))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Difficulty, FlagField};
  use crate::testing::{question, TestEnv};
  use rand::SeedableRng;
  use rand::rngs::StdRng;
  use std::collections::HashSet;

  fn params(json: serde_json::Value) -> QuestionParams {
    serde_json::from_value(json).unwrap()
  }

  /// 20 easy / 15 medium / 5 hard; 25 Algebra / 15 Geometry
  fn scenario_env() -> TestEnv {
    let env = TestEnv::new().unwrap();
    let mut id = 1;
    let layout = [
      ("Easy", "Algebra", 12),
      ("Easy", "Geometry", 8),
      ("Medium", "Algebra", 10),
      ("Medium", "Geometry", 5),
      ("Hard", "Algebra", 3),
      ("Hard", "Geometry", 2),
    ];
    for (level, topic, count) in layout {
      for _ in 0..count {
        env.insert(question(id, level, &[topic]));
        id += 1;
      }
    }
    env
  }

  #[test]
  fn test_page_defaults_and_parsing() {
    let page = Page::from_params(&QuestionParams::default());
    assert_eq!(page, Page { page: 1, limit: 20 });

    let page = Page::from_params(&params(serde_json::json!({"page": "3", "amount": "5"})));
    assert_eq!(page, Page { page: 3, limit: 5 });
    assert_eq!(page.skip(), 10);
    assert_eq!(page.target(), 15);

    let page = Page::from_params(&params(serde_json::json!({"page": "0", "limit": "-4"})));
    assert_eq!(page, Page { page: 1, limit: 20 });
  }

  #[test]
  fn test_page_apply() {
    let page = Page { page: 2, limit: 3 };
    assert_eq!(page.apply((0..10).collect()), vec![3, 4, 5]);
    assert_eq!(page.apply(vec![1, 2, 3, 4]), vec![4]);
  }

  #[test]
  fn test_end_to_end_balanced_scenario() {
    let env = scenario_env();
    let request = params(serde_json::json!({"topic": "Algebra,Geometry", "amount": "10"}));

    for seed in 0..10 {
      let mut rng = StdRng::seed_from_u64(seed);
      let out = fetch_questions(&env.conn, &request, &mut rng).unwrap();
      assert_eq!(out.len(), 10);
      assert!(out.iter().any(|q| q.difficulty() == Some(Difficulty::Hard)));
      let algebra = out.iter().filter(|q| q.has_topic("Algebra")).count();
      assert!((4..=6).contains(&algebra), "algebra = {}", algebra);
      let unique: HashSet<i64> = out.iter().map(|q| q.id).collect();
      assert_eq!(unique.len(), 10);
    }
  }

  #[test]
  fn test_small_corpus_returns_matching_set() {
    let env = scenario_env();
    let request = params(serde_json::json!({"topic": "Geometry", "amount": "50"}));
    let mut rng = StdRng::seed_from_u64(1);

    let out = fetch_questions(&env.conn, &request, &mut rng).unwrap();
    assert_eq!(out.len(), 15);
    assert!(out.iter().all(|q| q.has_topic("Geometry")));
  }

  #[test]
  fn test_unapproved_never_returned() {
    let env = TestEnv::new().unwrap();
    for id in 1..=5 {
      let mut q = question(id, "Easy", &["Algebra"]);
      if id > 3 {
        q.moderation.get_mut(FlagField::Approved).value = None;
      }
      env.insert(q);
    }
    let mut rng = StdRng::seed_from_u64(1);

    let out = fetch_questions(&env.conn, &QuestionParams::default(), &mut rng).unwrap();
    let mut ids: Vec<i64> = out.iter().map(|q| q.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3]);
  }

  #[test]
  fn test_malformed_tracking_same_as_absent() {
    let env = scenario_env();
    let with_bad = params(serde_json::json!({
      "userId": "u1", "trackedQuestions": "{oops", "amount": "50"
    }));
    let without = params(serde_json::json!({"amount": "50"}));

    let mut rng = StdRng::seed_from_u64(1);
    let a = fetch_questions(&env.conn, &with_bad, &mut rng).unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    let b = fetch_questions(&env.conn, &without, &mut rng).unwrap();

    let ids = |qs: &[Question]| qs.iter().map(|q| q.id).collect::<Vec<_>>();
    assert_eq!(ids(&a), ids(&b));
    assert_eq!(a.len(), 40);
  }

  #[test]
  fn test_tracking_requires_user_id() {
    let params_without_user = params(serde_json::json!({
      "trackedQuestions": "{\"1\": {\"status\": \"failed\"}}"
    }));
    assert!(request_tracking(&params_without_user).is_none());

    let params_with_user = params(serde_json::json!({
      "userId": "u1",
      "trackedQuestions": "{\"1\": {\"status\": \"failed\"}}"
    }));
    assert_eq!(request_tracking(&params_with_user).map(|m| m.len()), Some(1));
  }

  #[test]
  fn test_review_path_includes_failed_questions() {
    let env = scenario_env();
    let tracked: serde_json::Map<String, serde_json::Value> = (1..=10)
      .map(|id| (id.to_string(), serde_json::json!({"status": "failed"})))
      .collect();
    let request = params(serde_json::json!({
      "userId": "u1",
      "trackedQuestions": serde_json::Value::Object(tracked),
      "amount": "20"
    }));
    let mut rng = StdRng::seed_from_u64(12);

    let out = fetch_questions(&env.conn, &request, &mut rng).unwrap();
    assert_eq!(out.len(), 20);
    let failed = out.iter().filter(|q| q.id <= 10).count();
    assert!(failed >= 5, "failed = {}", failed);
  }
}
