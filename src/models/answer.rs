use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{AnswerId, Author, QuestionId};

/// An answer to a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub id: AnswerId,
    pub author: Author,
    pub question_id: QuestionId,
    pub content: String,
    pub upvotes: i64,
    pub downvotes: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
