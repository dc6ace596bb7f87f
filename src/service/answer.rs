use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;

use super::{ForumService, authorize, ensure_user_exists};
use crate::db::{now_timestamp, timestamp_at};
use crate::error::{ActionError, ActionResult};
use crate::models::{Answer, AnswerId, AnswerPage, Author, QuestionId, UserId, has_next};
use crate::validation::{CreateAnswerParams, GetAnswersParams};

const ANSWER_COLUMNS: &str =
    "a.id, a.question_id, a.content, a.upvotes, a.downvotes, a.created_at, u.id, u.name, u.image";

fn answer_from_row(row: &Row<'_>) -> rusqlite::Result<Answer> {
    Ok(Answer {
        id: AnswerId::new(row.get(0)?),
        question_id: QuestionId::new(row.get(1)?),
        content: row.get(2)?,
        upvotes: row.get(3)?,
        downvotes: row.get(4)?,
        created_at: timestamp_at(row, 5)?,
        author: Author {
            id: UserId::new(row.get(6)?),
            name: row.get(7)?,
            image: row.get(8)?,
        },
    })
}

fn fetch_answer(conn: &Connection, id: AnswerId) -> ActionResult<Answer> {
    let sql = format!(
        "SELECT {ANSWER_COLUMNS} FROM answers a JOIN users u ON u.id = a.author_id WHERE a.id = ?1"
    );
    conn.query_row(&sql, [id.get()], answer_from_row)
        .optional()?
        .ok_or(ActionError::NotFound("Answer"))
}

fn question_exists(conn: &Connection, id: QuestionId) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM questions WHERE id = ?1)",
        [id.get()],
        |row| row.get(0),
    )
}

impl ForumService {
    /// Posts an answer and bumps the question's answer count.
    ///
    /// # Errors
    ///
    /// NotFound("Question") when the question does not exist; no answer row
    /// is written in that case.
    pub fn create_answer(
        &self,
        caller: Option<UserId>,
        params: CreateAnswerParams,
    ) -> ActionResult<Answer> {
        params.validate()?;
        let author_id = authorize(caller)?;
        let question_id = params.question_id;

        let answer = self.db.unit_of_work(|conn| {
            ensure_user_exists(conn, author_id)?;
            if !question_exists(conn, question_id)? {
                return Err(ActionError::NotFound("Question"));
            }

            conn.execute(
                "INSERT INTO answers (author_id, question_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![author_id.get(), question_id.get(), params.content, now_timestamp()],
            )?;
            let answer_id = AnswerId::new(conn.last_insert_rowid());

            conn.execute(
                "UPDATE questions SET answers = answers + 1 WHERE id = ?1",
                [question_id.get()],
            )?;

            fetch_answer(conn, answer_id)
        })?;

        info!(answer_id = %answer.id, question_id = %question_id, "answer created");
        Ok(answer)
    }

    /// Loads one answer with its author.
    pub fn get_answer(&self, answer_id: AnswerId) -> ActionResult<Answer> {
        fetch_answer(self.db.connection(), answer_id)
    }

    /// Lists a question's answers.
    pub fn get_answers(&self, params: GetAnswersParams) -> ActionResult<AnswerPage> {
        params.validate()?;
        let conn = self.db.connection();
        let question_id = params.question_id;

        if !question_exists(conn, question_id)? {
            return Err(ActionError::NotFound("Question"));
        }

        let total_answers: i64 = conn.query_row(
            "SELECT COUNT(*) FROM answers WHERE question_id = ?1",
            [question_id.get()],
            |row| row.get(0),
        )?;

        let limit = params.pagination.limit();
        let offset = params.pagination.offset();
        let sql = format!(
            "SELECT {ANSWER_COLUMNS}
             FROM answers a
             JOIN users u ON u.id = a.author_id
             WHERE a.question_id = ?1
             ORDER BY {}
             LIMIT ?2 OFFSET ?3",
            params.filter.order_by()
        );
        let mut stmt = conn.prepare(&sql)?;
        let answers = stmt
            .query_map(params![question_id.get(), limit, offset], answer_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let is_next = has_next(total_answers, offset, answers.len());
        Ok(AnswerPage {
            answers,
            total_answers,
            is_next,
        })
    }
}
