mod answer;
mod question;
mod tag;
mod user;
mod vote;

use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::warn;

use crate::db::timestamp_at;
use crate::error::{ActionError, ActionResult};
use crate::models::{Author, Question, QuestionId, TagId, TagRef, UserId};
use crate::{Database, filters};

/// Service layer providing the forum's operations.
///
/// ForumService owns a Database instance and holds the business logic for
/// questions, answers, tags, votes and users. Every operation that writes
/// more than one row runs inside [`Database::unit_of_work`], so a failure at
/// any step leaves no partial state behind.
///
/// Write operations take the caller's identity as `Option<UserId>`. `None`
/// means nobody is signed in and yields [`ActionError::Unauthorized`] before
/// the database is touched.
///
/// # Examples
///
/// ```
/// use quorum::{Database, ForumService};
///
/// # fn main() -> anyhow::Result<()> {
/// let db = Database::in_memory()?;
/// let service = ForumService::new(db);
/// # Ok(())
/// # }
/// ```
pub struct ForumService {
    db: Database,
}

impl ForumService {
    /// Creates a new ForumService with the given database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns a reference to the underlying database.
    ///
    /// Useful for testing or maintenance tooling that needs direct access.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

/// Resolves the caller identity, rejecting anonymous calls.
pub(crate) fn authorize(caller: Option<UserId>) -> ActionResult<UserId> {
    caller.ok_or_else(|| {
        warn!("rejected anonymous write");
        ActionError::unauthorized()
    })
}

/// Fails with NotFound("User") unless the user row exists.
pub(crate) fn ensure_user_exists(conn: &Connection, id: UserId) -> ActionResult<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
        [id.get()],
        |row| row.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(ActionError::NotFound("User"))
    }
}

/// Columns selected for a question row joined with its author.
pub(crate) const QUESTION_COLUMNS: &str = "q.id, q.title, q.content, q.answers, q.views, q.upvotes, q.downvotes, q.created_at, q.updated_at, u.id, u.name, u.image";

/// Maps a [`QUESTION_COLUMNS`] row; tags are filled in by [`load_tags`].
pub(crate) fn question_from_row(row: &Row<'_>) -> rusqlite::Result<Question> {
    Ok(Question {
        id: QuestionId::new(row.get(0)?),
        title: row.get(1)?,
        content: row.get(2)?,
        answers: row.get(3)?,
        views: row.get(4)?,
        upvotes: row.get(5)?,
        downvotes: row.get(6)?,
        created_at: timestamp_at(row, 7)?,
        updated_at: timestamp_at(row, 8)?,
        author: Author {
            id: UserId::new(row.get(9)?),
            name: row.get(10)?,
            image: row.get(11)?,
        },
        tags: Vec::new(),
    })
}

/// Loads a question's tags in link order.
pub(crate) fn load_tags(conn: &Connection, question: &mut Question) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(
        "SELECT t.id, t.name
         FROM tag_questions tq
         JOIN tags t ON t.id = tq.tag_id
         WHERE tq.question_id = ?1
         ORDER BY tq.id",
    )?;
    let rows = stmt.query_map([question.id.get()], |row| {
        Ok(TagRef {
            id: TagId::new(row.get(0)?),
            name: row.get(1)?,
        })
    })?;

    question.tags.clear();
    for row in rows {
        question.tags.push(row?);
    }
    Ok(())
}

/// Loads one question with author and tags.
pub(crate) fn fetch_question(conn: &Connection, id: QuestionId) -> ActionResult<Question> {
    let sql = format!(
        "SELECT {QUESTION_COLUMNS} FROM questions q JOIN users u ON u.id = q.author_id WHERE q.id = ?1"
    );
    let question = conn
        .query_row(&sql, [id.get()], question_from_row)
        .optional()?;

    match question {
        Some(mut question) => {
            load_tags(conn, &mut question)?;
            Ok(question)
        }
        None => Err(ActionError::NotFound("Question")),
    }
}

/// `WHERE` conditions and their bound values for a listing query.
///
/// Conditions are fixed SQL fragments; only values come from the caller.
#[derive(Debug, Default)]
pub(crate) struct ListQuery {
    conditions: Vec<&'static str>,
    args: Vec<Value>,
}

impl ListQuery {
    pub(crate) fn condition(&mut self, sql: &'static str) -> &mut Self {
        self.conditions.push(sql);
        self
    }

    pub(crate) fn bind(&mut self, sql: &'static str, value: impl Into<Value>) -> &mut Self {
        self.conditions.push(sql);
        self.args.push(value.into());
        self
    }

    /// Adds a case-insensitive substring match over one or more columns.
    ///
    /// `sql` must contain one `?` per column.
    pub(crate) fn search(&mut self, sql: &'static str, query: Option<&str>) -> &mut Self {
        if let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = filters::like_pattern(query);
            self.conditions.push(sql);
            for _ in 0..sql.matches('?').count() {
                self.args.push(Value::Text(pattern.clone()));
            }
        }
        self
    }

    pub(crate) fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    /// Bound values for the `WHERE` clause.
    pub(crate) fn args(&self) -> &[Value] {
        &self.args
    }

    /// Bound values followed by `LIMIT ? OFFSET ?`.
    pub(crate) fn paged_args(&self, limit: i64, offset: i64) -> Vec<Value> {
        let mut args = self.args.clone();
        args.push(Value::Integer(limit));
        args.push(Value::Integer(offset));
        args
    }
}
