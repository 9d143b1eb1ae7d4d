pub mod question;
pub mod question_set;
pub mod tracking;

pub use question::{Difficulty, Flag, FlagField, Moderation, Question, QuestionContent};
pub use question_set::{QuestionSet, Room, SetFormat};
pub use tracking::{
  parse_tracked_questions, SetCompletion, TrackingMap, TrackingRecord, TrackingStatus,
};
