use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declares a database row identifier newtype.
///
/// Each ID wraps the SQLite rowid so that a `QuestionId` can never be passed
/// where an `AnswerId` is expected.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates a new ID from a raw rowid.
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the underlying ID value.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a user.
    UserId
);
define_id!(
    /// Unique identifier for an OAuth account link.
    AccountId
);
define_id!(
    /// Unique identifier for a question.
    QuestionId
);
define_id!(
    /// Unique identifier for an answer.
    AnswerId
);
define_id!(
    /// Unique identifier for a tag.
    TagId
);
define_id!(
    /// Unique identifier for a vote row.
    VoteId
);
