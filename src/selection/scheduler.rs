//! Blend fresh questions with review of failed and unsure ones.
//!
//! A request for N questions reserves at least 25% for previously failed
//! questions and 15% for unsure ones. Fresh (untracked) questions fill the
//! rest; when there are too few fresh questions, part of the shortfall is
//! shifted onto the review pools and anything still missing is backfilled
//! from the remaining matches.

use rand::Rng;
use rand::seq::SliceRandom;

use super::balancer::{balance, BalanceOptions};
use super::query::QuestionQuery;
use super::QuestionStore;
use crate::config;
use crate::domain::{Question, TrackingMap, TrackingStatus};

/// Target counts per pool for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewQuotas {
  pub total: usize,
  pub min_failed: usize,
  pub min_unsure: usize,
  pub max_fresh: usize,
}

impl ReviewQuotas {
  pub fn new(total: usize) -> Self {
    let min_failed = (total as f64 * config::MIN_FAILED_SHARE).ceil() as usize;
    let min_unsure = (total as f64 * config::MIN_UNSURE_SHARE).ceil() as usize;
    Self {
      total,
      min_failed,
      min_unsure,
      max_fresh: total.saturating_sub(min_failed + min_unsure),
    }
  }

  fn fresh_shortfall(&self, fresh_yield: usize) -> usize {
    self.max_fresh.saturating_sub(fresh_yield)
  }

  fn shifted(&self, fresh_yield: usize) -> usize {
    (self.fresh_shortfall(fresh_yield) as f64 * config::SHORTFALL_SHIFT).floor() as usize
  }

  /// Failed target after shifting part of the fresh shortfall onto it
  pub fn failed_target(&self, fresh_yield: usize) -> usize {
    self.min_failed + self.shifted(fresh_yield)
  }

  /// Unsure target: grows by the unshifted fresh shortfall plus the failed
  /// shortfall, but only when both fresh and failed under-delivered.
  pub fn unsure_target(&self, fresh_yield: usize, failed_yield: usize) -> usize {
    let fresh_short = self.fresh_shortfall(fresh_yield);
    let failed_short = self.failed_target(fresh_yield).saturating_sub(failed_yield);
    if fresh_short > 0 && failed_short > 0 {
      self.min_unsure + (fresh_short - self.shifted(fresh_yield)) + failed_short
    } else {
      self.min_unsure
    }
  }
}

/// Tracked question ids partitioned by status (sorted, for stable queries)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewPools {
  pub failed: Vec<i64>,
  pub unsure: Vec<i64>,
  pub success: Vec<i64>,
}

impl ReviewPools {
  pub fn from_tracking(tracking: &TrackingMap) -> Self {
    let mut pools = Self::default();
    for (&id, record) in tracking {
      match record.status {
        TrackingStatus::Failed => pools.failed.push(id),
        TrackingStatus::Unsure => pools.unsure.push(id),
        TrackingStatus::Success => pools.success.push(id),
      }
    }
    pools.failed.sort_unstable();
    pools.unsure.sort_unstable();
    pools.success.sort_unstable();
    pools
  }

  /// Every tracked id, whatever its status
  pub fn tracked(&self) -> Vec<i64> {
    let mut ids: Vec<i64> = self
      .failed
      .iter()
      .chain(&self.unsure)
      .chain(&self.success)
      .copied()
      .collect();
    ids.sort_unstable();
    ids
  }
}

/// Draw one review pool, balanced down to `target`
fn draw_pool<S, R>(
  store: &S,
  query: &QuestionQuery,
  ids: &[i64],
  target: usize,
  options: &BalanceOptions<'_>,
  rng: &mut R,
) -> Result<Vec<Question>, S::Error>
where
  S: QuestionStore + ?Sized,
  R: Rng + ?Sized,
{
  if ids.is_empty() || target == 0 {
    return Ok(Vec::new());
  }
  let candidates = store.find(&query.only(ids.to_vec()))?;
  Ok(balance(candidates, target, options, rng))
}

/// Select `total` questions mixing fresh and review pools.
///
/// Pool fetches are issued one after another; each later target depends on
/// what the earlier pools yielded.
pub fn select_with_review<S, R>(
  store: &S,
  query: &QuestionQuery,
  tracking: &TrackingMap,
  total: usize,
  options: &BalanceOptions<'_>,
  rng: &mut R,
) -> Result<Vec<Question>, S::Error>
where
  S: QuestionStore + ?Sized,
  R: Rng + ?Sized,
{
  let pools = ReviewPools::from_tracking(tracking);
  let quotas = ReviewQuotas::new(total);

  let fresh_candidates = store.find(&query.excluding(pools.tracked()))?;
  let fresh = balance(fresh_candidates, quotas.max_fresh, options, rng);

  let failed_target = quotas.failed_target(fresh.len());
  let failed = draw_pool(store, query, &pools.failed, failed_target, options, rng)?;

  let unsure_target = quotas.unsure_target(fresh.len(), failed.len());
  let unsure = draw_pool(store, query, &pools.unsure, unsure_target, options, rng)?;

  tracing::debug!(
    "Review mix for {}: fresh {}/{}, failed {}/{}, unsure {}/{}",
    total,
    fresh.len(),
    quotas.max_fresh,
    failed.len(),
    failed_target,
    unsure.len(),
    unsure_target
  );

  let mut combined = fresh;
  combined.extend(failed);
  combined.extend(unsure);

  if combined.len() < total {
    let used: Vec<i64> = combined.iter().map(|q| q.id).collect();
    let remaining = store.find(&query.excluding(used))?;
    let gap = total - combined.len();
    combined.extend(balance(remaining, gap, options, rng));
  }

  combined.shuffle(rng);
  combined.truncate(total);
  Ok(combined)
}
