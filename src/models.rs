mod answer;
mod ids;
mod page;
mod question;
mod tag;
mod user;
mod vote;

pub use answer::Answer;
pub use ids::{AccountId, AnswerId, QuestionId, TagId, UserId, VoteId};
pub use page::{AnswerPage, QuestionPage, TagPage, TagQuestionsPage, UserPage, has_next};
pub use question::Question;
pub use tag::{Tag, TagQuestion, TagRef, dedupe_tag_names, fold_tag_name};
pub use user::{Account, Author, Provider, User};
pub use vote::{HasVoted, TargetType, Vote, VoteOutcome, VoteTarget, VoteType};
