use rusqlite::{OptionalExtension, Row, params_from_iter};

use super::{ForumService, ListQuery};
use crate::db::timestamp_at;
use crate::error::{ActionError, ActionResult};
use crate::models::{Tag, TagId, TagPage, TagQuestionsPage, fold_tag_name, has_next};
use crate::validation::{GetTagQuestionsParams, GetTagsParams};

fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: TagId::new(row.get(0)?),
        name: row.get(1)?,
        questions: row.get(2)?,
        created_at: timestamp_at(row, 3)?,
    })
}

impl ForumService {
    /// Lists tags that are linked to at least one question.
    pub fn get_tags(&self, params: GetTagsParams) -> ActionResult<TagPage> {
        params.validate()?;
        let conn = self.db.connection();

        let mut query = ListQuery::default();
        query.condition("t.questions >= 1");
        let folded = params.query.as_deref().map(fold_tag_name);
        query.search("t.name_key LIKE ? ESCAPE '\\'", folded.as_deref());
        let where_clause = query.where_clause();

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM tags t{where_clause}"),
            params_from_iter(query.args()),
            |row| row.get(0),
        )?;

        let limit = params.pagination.limit();
        let offset = params.pagination.offset();
        let sql = format!(
            "SELECT t.id, t.name, t.questions, t.created_at
             FROM tags t{where_clause}
             ORDER BY {}
             LIMIT ? OFFSET ?",
            params.filter.order_by()
        );
        let mut stmt = conn.prepare(&sql)?;
        let tags = stmt
            .query_map(params_from_iter(query.paged_args(limit, offset)), tag_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let is_next = has_next(total, offset, tags.len());
        Ok(TagPage { tags, is_next })
    }

    /// Loads one tag, including ones with no questions left.
    pub fn get_tag(&self, tag_id: TagId) -> ActionResult<Tag> {
        self.db
            .connection()
            .query_row(
                "SELECT id, name, questions, created_at FROM tags WHERE id = ?1",
                [tag_id.get()],
                tag_from_row,
            )
            .optional()?
            .ok_or(ActionError::NotFound("Tag"))
    }

    /// Lists the questions linked to a tag, newest first.
    ///
    /// `query` matches question titles only.
    pub fn get_tag_questions(&self, params: GetTagQuestionsParams) -> ActionResult<TagQuestionsPage> {
        params.validate()?;
        let tag = self.get_tag(params.tag_id)?;

        let mut query = ListQuery::default();
        query.bind(
            "q.id IN (SELECT question_id FROM tag_questions WHERE tag_id = ?)",
            tag.id.get(),
        );
        query.search("q.title LIKE ? ESCAPE '\\'", params.query.as_deref());

        let (questions, is_next) = self.list_questions(
            &query,
            "q.created_at DESC, q.id DESC",
            params.pagination.limit(),
            params.pagination.offset(),
        )?;

        Ok(TagQuestionsPage {
            tag: tag.name,
            questions,
            is_next,
        })
    }
}
