//! Input parameters for each forum operation and their validation rules.
//!
//! Validation always runs before authorization and before any database
//! access. A failing check yields [`ActionError::Validation`] carrying every
//! field message collected, not just the first.

use serde::{Deserialize, Serialize};

use crate::error::{ActionError, FieldErrors, REQUIRED};
use crate::filters::{AnswerFilter, QuestionFilter, TagFilter, UserFilter};
use crate::models::{Provider, QuestionId, TagId, UserId, VoteTarget, VoteType, dedupe_tag_names};

pub const TITLE_MIN_CHARS: usize = 5;
pub const TITLE_MAX_CHARS: usize = 100;
pub const MAX_TAGS: usize = 3;
pub const TAG_MAX_CHARS: usize = 30;
pub const ANSWER_MIN_CHARS: usize = 100;
pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 30;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Collects field messages while checking a parameter struct.
#[derive(Debug, Default)]
struct Validator {
    errors: FieldErrors,
}

impl Validator {
    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.push(field, message);
        }
    }

    /// Records REQUIRED when blank; returns whether the value was present.
    fn required(&mut self, field: &str, value: &str) -> bool {
        let present = !value.trim().is_empty();
        if !present {
            self.push(field, REQUIRED);
        }
        present
    }

    fn finish(self) -> Result<(), ActionError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ActionError::validation(self.errors))
        }
    }
}

fn char_len(value: &str) -> usize {
    value.trim().chars().count()
}

fn check_question_fields(v: &mut Validator, title: &str, content: &str, tags: &[String]) {
    if v.required("title", title) {
        v.check(
            char_len(title) >= TITLE_MIN_CHARS,
            "title",
            "Title must be at least 5 characters.",
        );
        v.check(
            char_len(title) <= TITLE_MAX_CHARS,
            "title",
            "Title cannot exceed 100 characters.",
        );
    }

    v.required("content", content);

    let unique = dedupe_tag_names(tags);
    if unique.is_empty() {
        v.push("tags", "At least one tag is required.");
    }
    v.check(unique.len() <= MAX_TAGS, "tags", "Cannot add more than 3 tags.");
    v.check(
        unique.iter().all(|tag| char_len(tag) <= TAG_MAX_CHARS),
        "tags",
        "Tag cannot exceed 30 characters.",
    );
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// Page number and size shared by every listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self { page, page_size }
    }

    /// Number of rows to skip.
    ///
    /// Saturates instead of overflowing; [`validate`](Self::validate)
    /// rejects pages whose offset would not fit.
    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    fn check(&self, v: &mut Validator) {
        v.check(self.page >= 1, "page", "Page must be a positive number.");
        v.check(
            self.page < 1 || (self.page - 1).checked_mul(self.page_size).is_some(),
            "page",
            "Page is out of range.",
        );
        v.check(
            (1..=MAX_PAGE_SIZE).contains(&self.page_size),
            "pageSize",
            "Page size must be between 1 and 100.",
        );
    }

    pub fn validate(&self) -> Result<(), ActionError> {
        let mut v = Validator::default();
        self.check(&mut v);
        v.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionParams {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

impl CreateQuestionParams {
    pub fn validate(&self) -> Result<(), ActionError> {
        let mut v = Validator::default();
        check_question_fields(&mut v, &self.title, &self.content, &self.tags);
        v.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditQuestionParams {
    pub question_id: QuestionId,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

impl EditQuestionParams {
    pub fn validate(&self) -> Result<(), ActionError> {
        let mut v = Validator::default();
        check_question_fields(&mut v, &self.title, &self.content, &self.tags);
        v.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnswerParams {
    pub question_id: QuestionId,
    pub content: String,
}

impl CreateAnswerParams {
    pub fn validate(&self) -> Result<(), ActionError> {
        let mut v = Validator::default();
        if v.required("content", &self.content) {
            v.check(
                char_len(&self.content) >= ANSWER_MIN_CHARS,
                "content",
                "Answer has to have more than 100 characters.",
            );
        }
        v.finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVoteParams {
    #[serde(flatten)]
    pub target: VoteTarget,
    pub vote_type: VoteType,
}

impl CreateVoteParams {
    pub fn validate(&self) -> Result<(), ActionError> {
        let mut v = Validator::default();
        v.check(self.target.raw_id() > 0, "targetId", "Target ID is required.");
        v.finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetQuestionsParams {
    #[serde(flatten)]
    pub pagination: Pagination,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub filter: QuestionFilter,
}

impl GetQuestionsParams {
    pub fn validate(&self) -> Result<(), ActionError> {
        self.pagination.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetAnswersParams {
    pub question_id: QuestionId,
    #[serde(flatten)]
    pub pagination: Pagination,
    #[serde(default)]
    pub filter: AnswerFilter,
}

impl GetAnswersParams {
    pub fn new(question_id: QuestionId) -> Self {
        Self {
            question_id,
            pagination: Pagination::default(),
            filter: AnswerFilter::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ActionError> {
        self.pagination.validate()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTagsParams {
    #[serde(flatten)]
    pub pagination: Pagination,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub filter: TagFilter,
}

impl GetTagsParams {
    pub fn validate(&self) -> Result<(), ActionError> {
        self.pagination.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTagQuestionsParams {
    pub tag_id: TagId,
    #[serde(flatten)]
    pub pagination: Pagination,
    #[serde(default)]
    pub query: Option<String>,
}

impl GetTagQuestionsParams {
    pub fn new(tag_id: TagId) -> Self {
        Self {
            tag_id,
            pagination: Pagination::default(),
            query: None,
        }
    }

    pub fn validate(&self) -> Result<(), ActionError> {
        self.pagination.validate()
    }
}

fn check_email(v: &mut Validator, email: &str) {
    if v.required("email", email) {
        let valid = email
            .trim()
            .split_once('@')
            .is_some_and(|(local, domain)| {
                !local.is_empty() && domain.contains('.') && !domain.ends_with('.')
            });
        v.check(valid, "email", "Please provide a valid email address.");
    }
}

fn check_image(v: &mut Validator, image: Option<&str>) {
    if let Some(image) = image {
        v.check(
            image.starts_with("https://") || image.starts_with("http://"),
            "image",
            "Please provide a valid URL.",
        );
    }
}

fn check_username(v: &mut Validator, username: &str) {
    if v.required("username", username) {
        let len = char_len(username);
        v.check(
            len >= USERNAME_MIN_CHARS,
            "username",
            "Username must be at least 3 characters long.",
        );
        v.check(
            len <= USERNAME_MAX_CHARS,
            "username",
            "Username cannot exceed 30 characters.",
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserParams {
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl CreateUserParams {
    pub fn validate(&self) -> Result<(), ActionError> {
        let mut v = Validator::default();
        v.required("name", &self.name);
        check_username(&mut v, &self.username);
        check_email(&mut v, &self.email);
        check_image(&mut v, self.image.as_deref());
        v.finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUsersParams {
    #[serde(flatten)]
    pub pagination: Pagination,
    /// Matched against name and username.
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub filter: UserFilter,
}

impl GetUsersParams {
    pub fn validate(&self) -> Result<(), ActionError> {
        self.pagination.validate()
    }
}

/// Partial user update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserParams {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl UpdateUserParams {
    pub fn validate(&self) -> Result<(), ActionError> {
        let mut v = Validator::default();
        if let Some(name) = &self.name {
            v.required("name", name);
        }
        if let Some(username) = &self.username {
            check_username(&mut v, username);
        }
        check_image(&mut v, self.image.as_deref());
        v.finish()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.username.is_none() && self.image.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountParams {
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    pub provider: Provider,
    pub provider_account_id: String,
}

impl CreateAccountParams {
    pub fn validate(&self) -> Result<(), ActionError> {
        let mut v = Validator::default();
        v.required("name", &self.name);
        v.required("providerAccountId", &self.provider_account_id);
        check_image(&mut v, self.image.as_deref());
        v.finish()
    }
}

/// Profile reported by an OAuth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthProfile {
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInWithOAuthParams {
    pub provider: Provider,
    pub provider_account_id: String,
    pub user: OAuthProfile,
}

impl SignInWithOAuthParams {
    pub fn validate(&self) -> Result<(), ActionError> {
        let mut v = Validator::default();
        v.check(
            self.provider.is_oauth(),
            "provider",
            "Provider must be github or google.",
        );
        v.required("providerAccountId", &self.provider_account_id);
        v.required("name", &self.user.name);
        check_username(&mut v, &self.user.username);
        check_email(&mut v, &self.user.email);
        check_image(&mut v, self.user.image.as_deref());
        v.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(title: &str, content: &str, tags: &[&str]) -> CreateQuestionParams {
        CreateQuestionParams {
            title: title.to_string(),
            content: content.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn details(err: ActionError) -> FieldErrors {
        err.details().cloned().expect("expected validation error")
    }

    #[test]
    fn valid_question_passes() {
        assert!(question("How do I borrow?", "Body", &["rust"]).validate().is_ok());
    }

    #[test]
    fn blank_title_is_required() {
        let err = question("   ", "Body", &["rust"]).validate().unwrap_err();
        assert_eq!(err.to_string(), "Title is required");
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn short_title_and_missing_tags_are_both_reported() {
        let err = question("Hey", "Body", &[]).validate().unwrap_err();
        let details = details(err);

        assert_eq!(details["title"], vec!["Title must be at least 5 characters."]);
        assert_eq!(details["tags"], vec!["At least one tag is required."]);
    }

    #[test]
    fn case_duplicates_do_not_count_against_tag_limit() {
        let params = question("Tag dedupe", "Body", &["a", "A", "b", "c"]);
        assert!(params.validate().is_ok());

        let params = question("Tag limit", "Body", &["a", "b", "c", "d"]);
        let details = details(params.validate().unwrap_err());
        assert_eq!(details["tags"], vec!["Cannot add more than 3 tags."]);
    }

    #[test]
    fn long_tag_is_rejected() {
        let long = "x".repeat(TAG_MAX_CHARS + 1);
        let err = question("Long tag", "Body", &[&long]).validate().unwrap_err();
        assert!(details(err).contains_key("tags"));
    }

    #[test]
    fn short_answer_is_rejected() {
        let params = CreateAnswerParams {
            question_id: QuestionId::new(1),
            content: "too short".to_string(),
        };
        let err = params.validate().unwrap_err();
        assert_eq!(err.to_string(), "Answer has to have more than 100 characters.");
    }

    #[test]
    fn pagination_bounds_are_enforced() {
        assert!(Pagination::new(1, 10).validate().is_ok());

        let details = details(Pagination::new(0, 500).validate().unwrap_err());
        assert!(details.contains_key("page"));
        assert!(details.contains_key("pageSize"));
    }

    #[test]
    fn page_past_the_offset_range_is_rejected() {
        let err = Pagination::new(i64::MAX, 100).validate().unwrap_err();

        assert_eq!(err.status_code(), 400);
        assert_eq!(details(err)["page"], vec!["Page is out of range."]);
        assert_eq!(Pagination::new(i64::MAX, 100).offset(), i64::MAX);
    }

    #[test]
    fn pagination_offset_is_zero_based() {
        assert_eq!(Pagination::new(1, 10).offset(), 0);
        assert_eq!(Pagination::new(3, 20).offset(), 40);
    }

    #[test]
    fn list_params_deserialize_with_defaults() {
        let params: GetQuestionsParams = serde_json::from_str(r#"{"filter": "unanswered"}"#).unwrap();
        assert_eq!(params.pagination, Pagination::default());
        assert_eq!(params.filter, QuestionFilter::Unanswered);
        assert_eq!(params.query, None);
    }

    #[test]
    fn vote_params_deserialize_from_flat_json() {
        let params: CreateVoteParams = serde_json::from_str(
            r#"{"targetType": "answer", "targetId": 3, "voteType": "downvote"}"#,
        )
        .unwrap();

        assert_eq!(params.target, VoteTarget::Answer(crate::models::AnswerId::new(3)));
        assert_eq!(params.vote_type, VoteType::Downvote);
    }

    #[test]
    fn user_email_must_look_like_an_address() {
        let params = CreateUserParams {
            name: "Ada".to_string(),
            username: "ada".to_string(),
            email: "ada-at-example".to_string(),
            image: None,
        };
        let details = details(params.validate().unwrap_err());
        assert_eq!(details["email"], vec!["Please provide a valid email address."]);
    }

    #[test]
    fn oauth_sign_in_rejects_credentials_provider() {
        let params = SignInWithOAuthParams {
            provider: Provider::Credentials,
            provider_account_id: "abc".to_string(),
            user: OAuthProfile {
                name: "Ada".to_string(),
                username: "ada".to_string(),
                email: "ada@example.com".to_string(),
                image: None,
            },
        };
        let details = details(params.validate().unwrap_err());
        assert!(details.contains_key("provider"));
    }
}
