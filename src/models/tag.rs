use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{QuestionId, TagId};

/// A tag with its denormalized question counter.
///
/// Tag names are unique under ASCII case folding, matching SQLite's
/// `COLLATE NOCASE`. The stored name keeps the casing of whoever created it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    /// Number of distinct questions linked to this tag.
    pub questions: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A tag reference as embedded in a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    pub id: TagId,
    pub name: String,
}

/// A many-to-many link row between a tag and a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagQuestion {
    pub id: i64,
    pub tag_id: TagId,
    pub question_id: QuestionId,
}

/// Folds a tag name to the key used for case-insensitive comparison.
///
/// # Examples
///
/// ```
/// use quorum::models::fold_tag_name;
///
/// assert_eq!(fold_tag_name("  React "), "react");
/// assert_eq!(fold_tag_name("C++"), "c++");
/// assert_eq!(fold_tag_name("Ärger"), fold_tag_name("ärger"));
/// ```
#[must_use]
pub fn fold_tag_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Trims tag names and drops empty and case-insensitive duplicates.
///
/// The first spelling of each name wins and input order is preserved.
///
/// # Examples
///
/// ```
/// use quorum::models::dedupe_tag_names;
///
/// let tags = vec!["React".to_string(), "react".to_string(), " Rust ".to_string()];
/// assert_eq!(dedupe_tag_names(&tags), vec!["React", "Rust"]);
/// ```
#[must_use]
pub fn dedupe_tag_names(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty() && seen.insert(fold_tag_name(name)))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_keeps_first_spelling() {
        let tags = vec![
            "JavaScript".to_string(),
            "javascript".to_string(),
            "JAVASCRIPT".to_string(),
        ];
        assert_eq!(dedupe_tag_names(&tags), vec!["JavaScript"]);
    }

    #[test]
    fn dedupe_drops_blank_names() {
        let tags = vec!["  ".to_string(), "sql".to_string(), String::new()];
        assert_eq!(dedupe_tag_names(&tags), vec!["sql"]);
    }

    #[test]
    fn dedupe_preserves_order() {
        let tags = vec!["b".to_string(), "a".to_string(), "B".to_string()];
        assert_eq!(dedupe_tag_names(&tags), vec!["b", "a"]);
    }

    #[test]
    fn tag_serializes_counter_in_camel_case() {
        let tag = Tag {
            id: TagId::new(3),
            name: "rust".to_string(),
            questions: 2,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_value(&tag).unwrap();

        assert_eq!(json["questions"], 2);
        assert_eq!(json["createdAt"], "1970-01-01T00:00:00Z");
    }
}
