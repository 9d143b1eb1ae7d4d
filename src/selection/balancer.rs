//! Stratified random subsampling by difficulty and topic.
//!
//! Given more candidates than requested, the balancer draws a sample whose
//! difficulty mix approximates 30% easy / 50% medium / 20% hard (with at
//! least one hard question when any exist) and, when two or more topics were
//! requested, splits the sample evenly across those topics.

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};

use crate::config;
use crate::domain::{Difficulty, Question};

/// Which strata the caller wants balanced
#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceOptions<'a> {
  /// False when the caller filtered on difficulty explicitly
  pub balance_difficulty: bool,
  /// Requested topics; topic balancing applies only to two or more
  pub topics: &'a [String],
}

impl BalanceOptions<'_> {
  fn balance_topics(&self) -> bool {
    self.topics.len() >= 2
  }
}

/// Per-difficulty draw counts for one target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultyQuota {
  pub easy: usize,
  pub medium: usize,
  pub hard: usize,
}

impl DifficultyQuota {
  /// Compute the quota for `target` given how many easy/medium/hard
  /// questions are available. Counts are clipped to availability; the
  /// caller tops up any shortfall from the other buckets.
  pub fn new(target: usize, easy_available: usize, medium_available: usize, hard_available: usize) -> Self {
    let min_hard = usize::from(hard_available > 0);
    let hard = min_hard
      .max(round_share(target, config::HARD_SHARE))
      .min(hard_available);
    let easy = round_share(target, config::EASY_SHARE).min(easy_available);
    let medium = target
      .saturating_sub(easy + hard)
      .min(medium_available);
    Self { easy, medium, hard }
  }

  pub fn total(&self) -> usize {
    self.easy + self.medium + self.hard
  }
}

fn round_share(target: usize, share: f64) -> usize {
  (target as f64 * share).round() as usize
}

/// Per-topic quotas: an even split with the remainder going one each to the
/// first topics.
pub fn topic_quotas(target: usize, topic_count: usize) -> Vec<usize> {
  if topic_count == 0 {
    return Vec::new();
  }
  let base = target / topic_count;
  let remainder = target % topic_count;
  (0..topic_count)
    .map(|i| base + usize::from(i < remainder))
    .collect()
}

/// Balance `questions` down to `target`.
///
/// Returns the input unchanged (same order) when there are no more
/// candidates than requested. Otherwise the result is uniformly shuffled.
pub fn balance<R: Rng + ?Sized>(
  questions: Vec<Question>,
  target: usize,
  options: &BalanceOptions<'_>,
  rng: &mut R,
) -> Vec<Question> {
  if questions.len() <= target {
    return questions;
  }

  let mut selected = if options.balance_topics() {
    by_topic(questions, target, options, rng)
  } else if options.balance_difficulty {
    by_difficulty(questions, target, rng).0
  } else {
    sample(questions, target, rng).0
  };

  selected.truncate(target);
  selected.shuffle(rng);
  selected
}

/// Draw `count` items uniformly without replacement.
/// Returns (drawn, not drawn).
fn sample<R: Rng + ?Sized>(mut items: Vec<Question>, count: usize, rng: &mut R) -> (Vec<Question>, Vec<Question>) {
  items.shuffle(rng);
  let rest = items.split_off(count.min(items.len()));
  (items, rest)
}

/// Fill `selected` up to `target` with random picks from `leftover`.
/// Returns whatever was not used.
fn top_up<R: Rng + ?Sized>(
  selected: &mut Vec<Question>,
  leftover: Vec<Question>,
  target: usize,
  rng: &mut R,
) -> Vec<Question> {
  let missing = target.saturating_sub(selected.len());
  if missing == 0 {
    return leftover;
  }
  let (extra, rest) = sample(leftover, missing, rng);
  selected.extend(extra);
  rest
}

/// Difficulty-stratified draw. Returns (selected, unused).
pub(crate) fn by_difficulty<R: Rng + ?Sized>(
  questions: Vec<Question>,
  target: usize,
  rng: &mut R,
) -> (Vec<Question>, Vec<Question>) {
  let mut easy = Vec::new();
  let mut medium = Vec::new();
  let mut hard = Vec::new();
  let mut leftover = Vec::new();
  for q in questions {
    match q.difficulty() {
      Some(Difficulty::Easy) => easy.push(q),
      Some(Difficulty::Medium) => medium.push(q),
      Some(Difficulty::Hard) => hard.push(q),
      None => leftover.push(q),
    }
  }

  let quota = DifficultyQuota::new(target, easy.len(), medium.len(), hard.len());
  let mut selected = Vec::with_capacity(target);
  for (bucket, count) in [(easy, quota.easy), (medium, quota.medium), (hard, quota.hard)] {
    let (taken, rest) = sample(bucket, count, rng);
    selected.extend(taken);
    leftover.extend(rest);
  }

  let leftover = top_up(&mut selected, leftover, target, rng);
  (selected, leftover)
}

/// Topic-stratified draw; each topic group is difficulty balanced to its
/// quota when difficulty balancing is on.
fn by_topic<R: Rng + ?Sized>(
  questions: Vec<Question>,
  target: usize,
  options: &BalanceOptions<'_>,
  rng: &mut R,
) -> Vec<Question> {
  let topics = options.topics;
  let mut groups: Vec<Vec<Question>> = (0..topics.len()).map(|_| Vec::new()).collect();
  let mut dropped = 0usize;

  for q in questions {
    let matching: Vec<usize> = topics
      .iter()
      .enumerate()
      .filter(|(_, topic)| q.has_topic(topic))
      .map(|(i, _)| i)
      .collect();
    match matching.choose(rng) {
      Some(&i) => groups[i].push(q),
      None => dropped += 1,
    }
  }
  if dropped > 0 {
    tracing::debug!("Topic balancing dropped {} questions without a requested topic", dropped);
  }

  let mut selected = Vec::with_capacity(target);
  let mut leftover = Vec::new();
  for (group, quota) in groups.into_iter().zip(topic_quotas(target, topics.len())) {
    let (taken, rest) = if options.balance_difficulty {
      by_difficulty(group, quota, rng)
    } else {
      sample(group, quota, rng)
    };
    selected.extend(taken);
    leftover.extend(rest);
  }

  top_up(&mut selected, leftover, target, rng);
  selected
}
