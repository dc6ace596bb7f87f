use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use super::{ForumService, authorize, ensure_user_exists};
use crate::db::{now_timestamp, parsed_at, timestamp_at};
use crate::error::{ActionError, ActionResult};
use crate::models::{
    AnswerId, HasVoted, QuestionId, UserId, Vote, VoteId, VoteOutcome, VoteTarget, VoteType,
};
use crate::validation::CreateVoteParams;

fn find_vote(conn: &Connection, author_id: UserId, target: VoteTarget) -> rusqlite::Result<Option<Vote>> {
    conn.query_row(
        "SELECT id, vote_type, created_at FROM votes
         WHERE author_id = ?1 AND target_type = ?2 AND target_id = ?3",
        params![author_id.get(), target.kind().as_str(), target.raw_id()],
        |row| {
            Ok(Vote {
                id: VoteId::new(row.get(0)?),
                author_id,
                target,
                vote_type: parsed_at(row, 1)?,
                created_at: timestamp_at(row, 2)?,
            })
        },
    )
    .optional()
}

fn adjust_question_votes(
    conn: &Connection,
    id: QuestionId,
    vote_type: VoteType,
    delta: i64,
) -> ActionResult<()> {
    let sql = match vote_type {
        VoteType::Upvote => "UPDATE questions SET upvotes = upvotes + ?1 WHERE id = ?2",
        VoteType::Downvote => "UPDATE questions SET downvotes = downvotes + ?1 WHERE id = ?2",
    };
    if conn.execute(sql, params![delta, id.get()])? == 0 {
        return Err(ActionError::NotFound("Question"));
    }
    Ok(())
}

fn adjust_answer_votes(
    conn: &Connection,
    id: AnswerId,
    vote_type: VoteType,
    delta: i64,
) -> ActionResult<()> {
    let sql = match vote_type {
        VoteType::Upvote => "UPDATE answers SET upvotes = upvotes + ?1 WHERE id = ?2",
        VoteType::Downvote => "UPDATE answers SET downvotes = downvotes + ?1 WHERE id = ?2",
    };
    if conn.execute(sql, params![delta, id.get()])? == 0 {
        return Err(ActionError::NotFound("Answer"));
    }
    Ok(())
}

/// Moves the target's counter for `vote_type` by `delta`.
fn adjust_vote_count(
    conn: &Connection,
    target: VoteTarget,
    vote_type: VoteType,
    delta: i64,
) -> ActionResult<()> {
    match target {
        VoteTarget::Question(id) => adjust_question_votes(conn, id, vote_type, delta),
        VoteTarget::Answer(id) => adjust_answer_votes(conn, id, vote_type, delta),
    }
}

impl ForumService {
    /// Casts, withdraws or flips the caller's vote on a question or answer.
    ///
    /// Casting the same vote twice withdraws it. Casting the opposite vote
    /// flips the stored row and moves both counters. The vote row and the
    /// counters change in one transaction.
    ///
    /// # Errors
    ///
    /// NotFound when the target does not exist; the vote write is rolled
    /// back with it.
    ///
    /// # Examples
    ///
    /// ```
    /// use quorum::{Database, ForumService};
    /// use quorum::models::{VoteOutcome, VoteTarget, VoteType};
    /// use quorum::validation::{CreateQuestionParams, CreateUserParams, CreateVoteParams};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let service = ForumService::new(Database::in_memory()?);
    /// let ada = service.create_user(CreateUserParams {
    ///     name: "Ada".to_string(),
    ///     username: "ada".to_string(),
    ///     email: "ada@example.com".to_string(),
    ///     image: None,
    /// })?;
    /// let question = service.create_question(
    ///     Some(ada.id),
    ///     CreateQuestionParams {
    ///         title: "Is SQLite enough?".to_string(),
    ///         content: "For a small forum, probably.".to_string(),
    ///         tags: vec!["sqlite".to_string()],
    ///     },
    /// )?;
    ///
    /// let vote = CreateVoteParams {
    ///     target: VoteTarget::Question(question.id),
    ///     vote_type: VoteType::Upvote,
    /// };
    /// assert_eq!(
    ///     service.create_vote(Some(ada.id), vote)?,
    ///     VoteOutcome::Added { vote_type: VoteType::Upvote }
    /// );
    /// assert_eq!(
    ///     service.create_vote(Some(ada.id), vote)?,
    ///     VoteOutcome::Removed { vote_type: VoteType::Upvote }
    /// );
    /// assert_eq!(service.get_question(question.id)?.upvotes, 0);
    /// # Ok(())
    /// # }
    /// ```
    pub fn create_vote(
        &self,
        caller: Option<UserId>,
        params: CreateVoteParams,
    ) -> ActionResult<VoteOutcome> {
        params.validate()?;
        let author_id = authorize(caller)?;
        let CreateVoteParams { target, vote_type } = params;

        let outcome = self.db.unit_of_work(|conn| -> ActionResult<VoteOutcome> {
            ensure_user_exists(conn, author_id)?;
            let outcome = match find_vote(conn, author_id, target)? {
                None => {
                    let now = now_timestamp();
                    conn.execute(
                        "INSERT INTO votes (author_id, target_type, target_id, vote_type, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                        params![
                            author_id.get(),
                            target.kind().as_str(),
                            target.raw_id(),
                            vote_type.as_str(),
                            now
                        ],
                    )?;
                    adjust_vote_count(conn, target, vote_type, 1)?;
                    VoteOutcome::Added { vote_type }
                }
                Some(existing) if existing.vote_type == vote_type => {
                    conn.execute("DELETE FROM votes WHERE id = ?1", [existing.id.get()])?;
                    adjust_vote_count(conn, target, vote_type, -1)?;
                    VoteOutcome::Removed { vote_type }
                }
                Some(existing) => {
                    conn.execute(
                        "UPDATE votes SET vote_type = ?1, updated_at = ?2 WHERE id = ?3",
                        params![vote_type.as_str(), now_timestamp(), existing.id.get()],
                    )?;
                    adjust_vote_count(conn, target, existing.vote_type, -1)?;
                    adjust_vote_count(conn, target, vote_type, 1)?;
                    VoteOutcome::Switched {
                        from: existing.vote_type,
                        to: vote_type,
                    }
                }
            };
            Ok(outcome)
        })?;

        info!(author_id = %author_id, target = %target, ?outcome, "vote recorded");
        Ok(outcome)
    }

    /// Reports whether the caller has an upvote or downvote on `target`.
    pub fn has_voted(&self, caller: Option<UserId>, target: VoteTarget) -> ActionResult<HasVoted> {
        let author_id = authorize(caller)?;
        let vote = find_vote(self.db.connection(), author_id, target)?;
        Ok(HasVoted::from_vote_type(vote.map(|v| v.vote_type)))
    }
}
