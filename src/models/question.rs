use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{Author, QuestionId, TagRef, fold_tag_name};

/// A question with its author and tags populated.
///
/// `answers`, `upvotes` and `downvotes` are denormalized counters kept in step
/// with the answer and vote rows by the service layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub title: String,
    pub content: String,
    pub author: Author,
    /// Tags in link order.
    pub tags: Vec<TagRef>,
    pub answers: i64,
    pub views: i64,
    pub upvotes: i64,
    pub downvotes: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Question {
    /// Returns the tag names in link order.
    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|tag| tag.name.as_str()).collect()
    }

    /// Checks whether the question carries a tag, ignoring case.
    pub fn has_tag(&self, name: &str) -> bool {
        let folded = fold_tag_name(name);
        self.tags.iter().any(|tag| fold_tag_name(&tag.name) == folded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TagId, UserId};

    fn sample() -> Question {
        Question {
            id: QuestionId::new(1),
            title: "How do lifetimes work?".to_string(),
            content: "Explain please".to_string(),
            author: Author {
                id: UserId::new(1),
                name: "Ada".to_string(),
                image: None,
            },
            tags: vec![
                TagRef {
                    id: TagId::new(1),
                    name: "Rust".to_string(),
                },
                TagRef {
                    id: TagId::new(2),
                    name: "borrowck".to_string(),
                },
            ],
            answers: 0,
            views: 0,
            upvotes: 0,
            downvotes: 0,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn has_tag_ignores_case() {
        let question = sample();
        assert!(question.has_tag("rust"));
        assert!(question.has_tag("BORROWCK"));
        assert!(!question.has_tag("go"));
    }

    #[test]
    fn tag_names_follow_link_order() {
        assert_eq!(sample().tag_names(), vec!["Rust", "borrowck"]);
    }
}
