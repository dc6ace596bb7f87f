//! Named sort orders and search helpers for the listing operations.
//!
//! Each filter maps to a fixed `ORDER BY` fragment; user input never reaches
//! the SQL text. Ties always break on rowid so paging is stable.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Escape character used in every `LIKE` clause built from user input.
pub const LIKE_ESCAPE: char = '\\';

/// Escapes `LIKE` metacharacters so user input matches literally.
///
/// # Examples
///
/// ```
/// use quorum::filters::escape_like;
///
/// assert_eq!(escape_like("100%"), "100\\%");
/// assert_eq!(escape_like("snake_case"), "snake\\_case");
/// assert_eq!(escape_like("C++"), "C++");
/// ```
#[must_use]
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Wraps escaped input in wildcards for a substring match.
#[must_use]
pub fn like_pattern(query: &str) -> String {
    format!("%{}%", escape_like(query.trim()))
}

macro_rules! named_filter {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "kebab-case")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!("unknown filter '{other}'")),
                }
            }
        }
    };
}

named_filter!(
    /// Sort orders for the question list.
    QuestionFilter {
        #[default]
        Newest => "newest",
        Oldest => "oldest",
        MostUpvoted => "most-upvoted",
        LeastUpvoted => "least-upvoted",
        /// Most viewed first.
        Popular => "popular",
        /// Only questions without answers, newest first.
        Unanswered => "unanswered",
        /// Not implemented yet; always yields an empty page.
        Recommended => "recommended",
    }
);

named_filter!(
    /// Sort orders for a question's answers.
    AnswerFilter {
        #[default]
        Latest => "latest",
        Oldest => "oldest",
        Popular => "popular",
    }
);

named_filter!(
    /// Sort orders for the tag list.
    TagFilter {
        #[default]
        Popular => "popular",
        Recent => "recent",
        Oldest => "oldest",
        Name => "name",
    }
);

named_filter!(
    /// Sort orders for the user list.
    UserFilter {
        #[default]
        Newest => "newest",
        Oldest => "oldest",
        /// Most questions and answers written first.
        Popular => "popular",
    }
);

impl QuestionFilter {
    /// `ORDER BY` fragment over the `q` alias.
    pub fn order_by(self) -> &'static str {
        match self {
            Self::Newest | Self::Unanswered | Self::Recommended => "q.created_at DESC, q.id DESC",
            Self::Oldest => "q.created_at ASC, q.id ASC",
            Self::MostUpvoted => "q.upvotes DESC, q.id DESC",
            Self::LeastUpvoted => "q.upvotes ASC, q.id ASC",
            Self::Popular => "q.views DESC, q.upvotes DESC, q.id DESC",
        }
    }

    /// Extra `WHERE` condition this filter imposes, if any.
    pub fn condition(self) -> Option<&'static str> {
        match self {
            Self::Unanswered => Some("q.answers = 0"),
            _ => None,
        }
    }
}

impl AnswerFilter {
    /// `ORDER BY` fragment over the `a` alias.
    pub fn order_by(self) -> &'static str {
        match self {
            Self::Latest => "a.created_at DESC, a.id DESC",
            Self::Oldest => "a.created_at ASC, a.id ASC",
            Self::Popular => "a.upvotes DESC, a.id DESC",
        }
    }
}

impl UserFilter {
    /// `ORDER BY` fragment over the `u` alias.
    pub fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "u.created_at DESC, u.id DESC",
            Self::Oldest => "u.created_at ASC, u.id ASC",
            Self::Popular => {
                "(SELECT COUNT(*) FROM questions q WHERE q.author_id = u.id)
                 + (SELECT COUNT(*) FROM answers a WHERE a.author_id = u.id) DESC, u.id ASC"
            }
        }
    }
}

impl TagFilter {
    /// `ORDER BY` fragment over the `t` alias.
    pub fn order_by(self) -> &'static str {
        match self {
            Self::Popular => "t.questions DESC, t.id ASC",
            Self::Recent => "t.created_at DESC, t.id DESC",
            Self::Oldest => "t.created_at ASC, t.id ASC",
            Self::Name => "t.name COLLATE NOCASE ASC, t.id ASC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_escapes_the_escape_char() {
        assert_eq!(escape_like(r"a\b"), r"a\\b");
    }

    #[test]
    fn like_pattern_trims_and_wraps() {
        assert_eq!(like_pattern("  rust "), "%rust%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
    }

    #[test]
    fn filters_parse_kebab_case() {
        assert_eq!(
            "most-upvoted".parse::<QuestionFilter>().unwrap(),
            QuestionFilter::MostUpvoted
        );
        assert_eq!("Name".parse::<TagFilter>().unwrap(), TagFilter::Name);
        assert!("trending".parse::<AnswerFilter>().is_err());
    }

    #[test]
    fn filters_serialize_kebab_case() {
        let json = serde_json::to_string(&QuestionFilter::LeastUpvoted).unwrap();
        assert_eq!(json, r#""least-upvoted""#);
    }

    #[test]
    fn only_unanswered_adds_a_condition() {
        assert_eq!(
            QuestionFilter::Unanswered.condition(),
            Some("q.answers = 0")
        );
        assert_eq!(QuestionFilter::Newest.condition(), None);
        assert_eq!(
            QuestionFilter::Unanswered.order_by(),
            QuestionFilter::Newest.order_by()
        );
    }

    #[test]
    fn defaults_match_listing_behaviour() {
        assert_eq!(QuestionFilter::default(), QuestionFilter::Newest);
        assert_eq!(AnswerFilter::default(), AnswerFilter::Latest);
        assert_eq!(TagFilter::default(), TagFilter::Popular);
    }
}
