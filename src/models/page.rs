use serde::{Deserialize, Serialize};

use super::{Answer, Question, Tag, User};

/// One page of users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
    pub users: Vec<User>,
    pub is_next: bool,
}

/// One page of questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPage {
    pub questions: Vec<Question>,
    pub is_next: bool,
}

impl QuestionPage {
    pub fn empty() -> Self {
        Self {
            questions: Vec::new(),
            is_next: false,
        }
    }
}

/// One page of answers for a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPage {
    pub answers: Vec<Answer>,
    pub total_answers: i64,
    pub is_next: bool,
}

/// One page of tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagPage {
    pub tags: Vec<Tag>,
    pub is_next: bool,
}

/// One page of the questions linked to a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagQuestionsPage {
    /// Name of the tag.
    pub tag: String,
    pub questions: Vec<Question>,
    pub is_next: bool,
}

/// Whether more rows exist past the current page.
pub fn has_next(total: i64, offset: i64, returned: usize) -> bool {
    total > offset.saturating_add(returned as i64)
}
