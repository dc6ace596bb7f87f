pub mod config;
pub mod db;
pub mod doctor;
pub mod error;
pub mod filters;
pub mod logging;
pub mod models;
pub mod response;
pub mod service;
pub mod utils;
pub mod validation;

pub use db::Database;
pub use error::{ActionError, ActionResult};
pub use models::{
    Answer, AnswerId, HasVoted, Question, QuestionId, Tag, TagId, User, UserId, VoteOutcome,
    VoteTarget, VoteType,
};
pub use response::ActionResponse;
pub use service::ForumService;
