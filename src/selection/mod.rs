//! Question selection: predicate building, difficulty/topic balancing and
//! the fresh-versus-review blend used by the practice fetch.

pub mod balancer;
pub mod composer;
pub mod query;
pub mod scheduler;

use crate::domain::Question;

pub use balancer::{balance, topic_quotas, BalanceOptions, DifficultyQuota};
pub use composer::{fetch_questions, Page};
pub use query::{
  build_filter, Audience, FlagCondition, IdScope, QuestionFilter, QuestionParams, QuestionQuery,
  TriState,
};
pub use scheduler::{select_with_review, ReviewPools, ReviewQuotas};

/// Persistence collaborator used by selection. Selection only reads.
pub trait QuestionStore {
  type Error;

  fn find(&self, query: &QuestionQuery) -> Result<Vec<Question>, Self::Error>;

  fn count(&self, query: &QuestionQuery) -> Result<i64, Self::Error>;
}
