//! Typed errors for forum operations.
//!
//! Every failure an operation can report maps to an HTTP-style status code so
//! the boundary can build the uniform response envelope without inspecting
//! messages.

use std::collections::BTreeMap;

use thiserror::Error;

/// Per-field validation messages, keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Message used for a field that was not supplied at all.
pub const REQUIRED: &str = "Required";

/// Message returned for any 500-class failure.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred.";

/// Errors that can occur while running a forum operation.
#[derive(Error, Debug)]
pub enum ActionError {
    /// Input rejected before any database access.
    #[error("{message}")]
    Validation {
        message: String,
        details: FieldErrors,
    },

    /// The named resource does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The caller is known but not allowed to do this.
    #[error("{0}")]
    Forbidden(String),

    /// No caller identity was supplied.
    #[error("{0}")]
    Unauthorized(String),

    /// SQLite error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Result type for forum operations
pub type ActionResult<T> = Result<T, ActionError>;

impl ActionError {
    /// Builds a validation error from field messages.
    pub fn validation(details: FieldErrors) -> Self {
        Self::Validation {
            message: format_field_errors(&details),
            details,
        }
    }

    /// Builds a validation error for a single field.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let mut details = FieldErrors::new();
        details.insert(field.to_string(), vec![message.into()]);
        Self::validation(details)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn unauthorized() -> Self {
        Self::Unauthorized("Unauthorized".to_string())
    }

    /// HTTP-style status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Whether the caller caused this error (4xx) rather than the system.
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }

    /// Message safe to show to the caller.
    ///
    /// Internal failures never leak their detail.
    pub fn public_message(&self) -> String {
        if self.is_client_error() {
            self.to_string()
        } else {
            UNEXPECTED_ERROR_MESSAGE.to_string()
        }
    }

    /// Field messages, for validation errors only.
    pub fn details(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation { details, .. } => Some(details),
            _ => None,
        }
    }
}

/// Turns field messages into one readable sentence.
///
/// A field whose first message is [`REQUIRED`] reads "`Field` is required";
/// otherwise its messages are joined with " and ". Fields are joined with ", ".
pub fn format_field_errors(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(field, messages)| {
            if messages.first().map(String::as_str) == Some(REQUIRED) {
                format!("{} is required", capitalize(field))
            } else {
                messages.join(" and ")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_field_reads_naturally() {
        let mut errors = FieldErrors::new();
        errors.insert("title".to_string(), vec![REQUIRED.to_string()]);

        assert_eq!(format_field_errors(&errors), "Title is required");
    }

    #[test]
    fn multiple_messages_are_joined() {
        let mut errors = FieldErrors::new();
        errors.insert(
            "content".to_string(),
            vec!["Too short".to_string(), "Must not be blank".to_string()],
        );
        errors.insert("tags".to_string(), vec![REQUIRED.to_string()]);

        assert_eq!(
            format_field_errors(&errors),
            "Too short and Must not be blank, Tags is required"
        );
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(ActionError::invalid_field("page", "bad").status_code(), 400);
        assert_eq!(ActionError::unauthorized().status_code(), 401);
        assert_eq!(ActionError::forbidden("no").status_code(), 403);
        assert_eq!(ActionError::NotFound("Question").status_code(), 404);
        assert_eq!(
            ActionError::Internal(anyhow::anyhow!("boom")).status_code(),
            500
        );
    }

    #[test]
    fn not_found_names_the_resource() {
        assert_eq!(ActionError::NotFound("Tag").to_string(), "Tag not found");
    }

    #[test]
    fn internal_errors_hide_their_detail() {
        let err = ActionError::Database(rusqlite::Error::QueryReturnedNoRows);

        assert!(!err.is_client_error());
        assert_eq!(err.public_message(), UNEXPECTED_ERROR_MESSAGE);
        assert!(err.details().is_none());
    }
}
