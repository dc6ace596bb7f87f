use std::collections::HashSet;

use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::{info, warn};

use super::{
    ForumService, ListQuery, QUESTION_COLUMNS, authorize, ensure_user_exists, fetch_question,
    load_tags, question_from_row,
};
use crate::db::now_timestamp;
use crate::error::{ActionError, ActionResult};
use crate::filters::QuestionFilter;
use crate::models::{
    Question, QuestionId, QuestionPage, TagId, TagRef, UserId, dedupe_tag_names, fold_tag_name,
    has_next,
};
use crate::validation::{CreateQuestionParams, EditQuestionParams, GetQuestionsParams};

/// Tag changes needed to move a question from its current tags to a new list.
///
/// Names are compared ignoring ASCII case, the same way the `tags.name`
/// column collates.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct TagDiff {
    /// Names to link, in submitted order.
    pub to_add: Vec<String>,
    /// Currently linked tags to unlink.
    pub to_remove: Vec<TagRef>,
}

impl TagDiff {
    /// `wanted` must already be deduplicated.
    pub(crate) fn between(current: &[TagRef], wanted: &[String]) -> Self {
        let current_names: HashSet<String> =
            current.iter().map(|tag| fold_tag_name(&tag.name)).collect();
        let wanted_names: HashSet<String> = wanted.iter().map(|name| fold_tag_name(name)).collect();

        Self {
            to_add: wanted
                .iter()
                .filter(|name| !current_names.contains(&fold_tag_name(name)))
                .cloned()
                .collect(),
            to_remove: current
                .iter()
                .filter(|tag| !wanted_names.contains(&fold_tag_name(&tag.name)))
                .cloned()
                .collect(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Finds or creates a tag by name and counts one more question against it.
///
/// Names match on their folded key; an existing tag keeps its stored
/// spelling.
pub(crate) fn upsert_tag(conn: &Connection, name: &str, now: i64) -> rusqlite::Result<TagId> {
    conn.query_row(
        "INSERT INTO tags (name, name_key, questions, created_at) VALUES (?1, ?2, 1, ?3)
         ON CONFLICT(name_key) DO UPDATE SET questions = questions + 1
         RETURNING id",
        params![name, fold_tag_name(name), now],
        |row| row.get(0).map(TagId::new),
    )
}

fn link_tag(conn: &Connection, tag_id: TagId, question_id: QuestionId, now: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO tag_questions (tag_id, question_id, created_at) VALUES (?1, ?2, ?3)",
        params![tag_id.get(), question_id.get(), now],
    )?;
    Ok(())
}

/// Removes a link and releases the tag's count for it.
///
/// The tag row itself stays even when its count reaches zero.
fn unlink_tag(conn: &Connection, tag_id: TagId, question_id: QuestionId) -> rusqlite::Result<()> {
    let removed = conn.execute(
        "DELETE FROM tag_questions WHERE tag_id = ?1 AND question_id = ?2",
        params![tag_id.get(), question_id.get()],
    )?;
    if removed > 0 {
        conn.execute(
            "UPDATE tags SET questions = questions - 1 WHERE id = ?1",
            [tag_id.get()],
        )?;
    }
    Ok(())
}

fn attach_tags(conn: &Connection, question_id: QuestionId, names: &[String], now: i64) -> rusqlite::Result<()> {
    for name in names {
        let tag_id = upsert_tag(conn, name, now)?;
        link_tag(conn, tag_id, question_id, now)?;
    }
    Ok(())
}

impl ForumService {
    /// Creates a question and links its tags, all in one transaction.
    ///
    /// Tag names are trimmed and deduplicated ignoring case before anything
    /// is written, so `["React", "react"]` creates or reuses a single tag.
    /// Missing tags are created with a count of one; existing tags have their
    /// count incremented.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad input and Unauthorized when
    /// `caller` is `None`, both before touching the database. If any step
    /// fails nothing is written.
    ///
    /// # Examples
    ///
    /// ```
    /// use quorum::{Database, ForumService};
    /// use quorum::validation::{CreateQuestionParams, CreateUserParams};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let service = ForumService::new(Database::in_memory()?);
    /// let ada = service.create_user(CreateUserParams {
    ///     name: "Ada".to_string(),
    ///     username: "ada".to_string(),
    ///     email: "ada@example.com".to_string(),
    ///     image: None,
    /// })?;
    ///
    /// let question = service.create_question(
    ///     Some(ada.id),
    ///     CreateQuestionParams {
    ///         title: "How do lifetimes work?".to_string(),
    ///         content: "I keep fighting the borrow checker.".to_string(),
    ///         tags: vec!["Rust".to_string(), "rust".to_string()],
    ///     },
    /// )?;
    ///
    /// assert_eq!(question.tag_names(), vec!["Rust"]);
    /// # Ok(())
    /// # }
    /// ```
    pub fn create_question(
        &self,
        caller: Option<UserId>,
        params: CreateQuestionParams,
    ) -> ActionResult<Question> {
        params.validate()?;
        let author_id = authorize(caller)?;
        let tags = dedupe_tag_names(&params.tags);

        let question = self.db.unit_of_work(|conn| {
            ensure_user_exists(conn, author_id)?;
            let now = now_timestamp();

            conn.execute(
                "INSERT INTO questions (title, content, author_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![params.title.trim(), params.content, author_id.get(), now],
            )?;
            let question_id = QuestionId::new(conn.last_insert_rowid());

            attach_tags(conn, question_id, &tags, now)?;
            fetch_question(conn, question_id)
        })?;

        info!(question_id = %question.id, author_id = %author_id, tags = question.tags.len(), "question created");
        Ok(question)
    }

    /// Updates a question's title and content and reconciles its tags.
    ///
    /// Tags present in both the old and new lists are left alone. New names
    /// are linked through the same find-or-create path as
    /// [`create_question`](Self::create_question); dropped tags are unlinked
    /// and their counts decremented.
    ///
    /// # Errors
    ///
    /// NotFound when the question does not exist and Forbidden when the
    /// caller is not its author. Either way nothing is written.
    pub fn edit_question(
        &self,
        caller: Option<UserId>,
        params: EditQuestionParams,
    ) -> ActionResult<Question> {
        params.validate()?;
        let caller_id = authorize(caller)?;
        let wanted = dedupe_tag_names(&params.tags);
        let question_id = params.question_id;

        let question = self.db.unit_of_work(|conn| {
            let current = fetch_question(conn, question_id)?;
            if current.author.id != caller_id {
                warn!(question_id = %question_id, caller_id = %caller_id, "edit rejected: not the author");
                return Err(ActionError::forbidden(
                    "You are not authorized to edit this question",
                ));
            }

            let now = now_timestamp();
            conn.execute(
                "UPDATE questions SET title = ?1, content = ?2, updated_at = ?3 WHERE id = ?4",
                params![params.title.trim(), params.content, now, question_id.get()],
            )?;

            let diff = TagDiff::between(&current.tags, &wanted);
            for tag in &diff.to_remove {
                unlink_tag(conn, tag.id, question_id)?;
            }
            attach_tags(conn, question_id, &diff.to_add, now)?;

            fetch_question(conn, question_id)
        })?;

        info!(question_id = %question_id, tags = question.tags.len(), "question edited");
        Ok(question)
    }

    /// Loads a question with its author and tags.
    pub fn get_question(&self, question_id: QuestionId) -> ActionResult<Question> {
        fetch_question(self.db.connection(), question_id)
    }

    /// Counts one more view and returns the new total.
    pub fn increment_views(&self, question_id: QuestionId) -> ActionResult<i64> {
        let views: Option<i64> = self
            .db
            .connection()
            .query_row(
                "UPDATE questions SET views = views + 1 WHERE id = ?1 RETURNING views",
                [question_id.get()],
                |row| row.get(0),
            )
            .optional()?;

        views.ok_or(ActionError::NotFound("Question"))
    }

    /// Lists questions, optionally searching titles and content.
    ///
    /// The `recommended` filter always yields an empty page.
    pub fn get_questions(&self, params: GetQuestionsParams) -> ActionResult<QuestionPage> {
        params.validate()?;
        if params.filter == QuestionFilter::Recommended {
            return Ok(QuestionPage::empty());
        }

        let mut query = ListQuery::default();
        query.search(
            "(q.title LIKE ? ESCAPE '\\' OR q.content LIKE ? ESCAPE '\\')",
            params.query.as_deref(),
        );
        if let Some(condition) = params.filter.condition() {
            query.condition(condition);
        }

        let (questions, is_next) = self.list_questions(
            &query,
            params.filter.order_by(),
            params.pagination.limit(),
            params.pagination.offset(),
        )?;

        Ok(QuestionPage { questions, is_next })
    }

    /// Runs a question listing and reports whether more rows follow.
    pub(crate) fn list_questions(
        &self,
        query: &ListQuery,
        order_by: &str,
        limit: i64,
        offset: i64,
    ) -> ActionResult<(Vec<Question>, bool)> {
        let conn = self.db.connection();
        let where_clause = query.where_clause();

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM questions q{where_clause}"),
            params_from_iter(query.args()),
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT {QUESTION_COLUMNS}
             FROM questions q
             JOIN users u ON u.id = q.author_id{where_clause}
             ORDER BY {order_by}
             LIMIT ? OFFSET ?"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params_from_iter(query.paged_args(limit, offset)),
            question_from_row,
        )?;

        let mut questions = Vec::new();
        for row in rows {
            let mut question = row?;
            load_tags(conn, &mut question)?;
            questions.push(question);
        }

        let is_next = has_next(total, offset, questions.len());
        Ok((questions, is_next))
    }
}
