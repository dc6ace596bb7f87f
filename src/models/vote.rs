use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{AnswerId, QuestionId, UserId, VoteId};

/// Direction of a vote.
///
/// Serialized with the name of the counter column it moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteType {
    #[serde(rename = "upvotes", alias = "upvote")]
    Upvote,
    #[serde(rename = "downvotes", alias = "downvote")]
    Downvote,
}

impl VoteType {
    /// Returns the stored name, which is also the counter column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upvote => "upvotes",
            Self::Downvote => "downvotes",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Upvote => Self::Downvote,
            Self::Downvote => Self::Upvote,
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upvote" | "upvotes" | "up" => Ok(Self::Upvote),
            "downvote" | "downvotes" | "down" => Ok(Self::Downvote),
            other => Err(format!("unknown vote type '{other}'")),
        }
    }
}

/// Kind of document a vote points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Question,
    Answer,
}

impl TargetType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::Answer => "answer",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "question" => Ok(Self::Question),
            "answer" => Ok(Self::Answer),
            other => Err(format!("unknown target type '{other}'")),
        }
    }
}

/// The document a vote is cast on.
///
/// Serialized as `{"targetType": "question", "targetId": 7}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "targetType", content = "targetId", rename_all = "lowercase")]
pub enum VoteTarget {
    Question(QuestionId),
    Answer(AnswerId),
}

impl VoteTarget {
    /// Builds a target from its stored (kind, id) pair.
    pub fn from_parts(kind: TargetType, id: i64) -> Self {
        match kind {
            TargetType::Question => Self::Question(QuestionId::new(id)),
            TargetType::Answer => Self::Answer(AnswerId::new(id)),
        }
    }

    pub fn kind(self) -> TargetType {
        match self {
            Self::Question(_) => TargetType::Question,
            Self::Answer(_) => TargetType::Answer,
        }
    }

    /// Returns the raw rowid of the target document.
    pub fn raw_id(self) -> i64 {
        match self {
            Self::Question(id) => id.get(),
            Self::Answer(id) => id.get(),
        }
    }
}

impl fmt::Display for VoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.raw_id())
    }
}

/// A stored vote row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: VoteId,
    pub author_id: UserId,
    pub target: VoteTarget,
    pub vote_type: VoteType,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// What a vote toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum VoteOutcome {
    /// A new vote was recorded.
    Added { vote_type: VoteType },
    /// The same vote was cast again and has been withdrawn.
    Removed { vote_type: VoteType },
    /// An existing vote flipped direction.
    Switched { from: VoteType, to: VoteType },
}

/// Whether a user has voted on a target, and how.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HasVoted {
    pub has_upvoted: bool,
    pub has_downvoted: bool,
}

impl HasVoted {
    pub fn from_vote_type(vote_type: Option<VoteType>) -> Self {
        Self {
            has_upvoted: vote_type == Some(VoteType::Upvote),
            has_downvoted: vote_type == Some(VoteType::Downvote),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_type_accepts_singular_and_plural() {
        assert_eq!("upvote".parse::<VoteType>().unwrap(), VoteType::Upvote);
        assert_eq!("downvotes".parse::<VoteType>().unwrap(), VoteType::Downvote);

        let parsed: VoteType = serde_json::from_str(r#""upvote""#).unwrap();
        assert_eq!(parsed, VoteType::Upvote);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), r#""upvotes""#);
    }

    #[test]
    fn vote_target_serializes_adjacently_tagged() {
        let target = VoteTarget::Answer(AnswerId::new(9));
        let json = serde_json::to_value(target).unwrap();

        assert_eq!(json["targetType"], "answer");
        assert_eq!(json["targetId"], 9);
    }

    #[test]
    fn vote_target_round_trips_through_parts() {
        let target = VoteTarget::from_parts(TargetType::Question, 4);
        assert_eq!(target, VoteTarget::Question(QuestionId::new(4)));
        assert_eq!(target.kind(), TargetType::Question);
        assert_eq!(target.raw_id(), 4);
    }

    #[test]
    fn has_voted_without_vote_is_all_false() {
        assert_eq!(HasVoted::from_vote_type(None), HasVoted::default());

        let down = HasVoted::from_vote_type(Some(VoteType::Downvote));
        assert!(!down.has_upvoted);
        assert!(down.has_downvoted);
    }

    #[test]
    fn opposite_flips_direction() {
        assert_eq!(VoteType::Upvote.opposite(), VoteType::Downvote);
        assert_eq!(VoteType::Downvote.opposite(), VoteType::Upvote);
    }
}
