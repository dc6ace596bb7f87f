//! Uniform response envelope returned at the action boundary.

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{ActionError, ActionResult, FieldErrors};

/// Error half of the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<FieldErrors>,
}

/// `{success, data?, errors?, status?}` envelope.
///
/// Nothing past the action layer ever sees an `ActionError`; every result is
/// folded into this shape by [`ActionResponse::from_result`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<ErrorBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl<T> ActionResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            errors: None,
            status: None,
        }
    }

    pub fn failure(err: &ActionError) -> Self {
        if !err.is_client_error() {
            error!(error = %err, "action failed");
        }

        Self {
            success: false,
            data: None,
            errors: Some(ErrorBody {
                message: err.public_message(),
                details: err.details().cloned(),
            }),
            status: Some(err.status_code()),
        }
    }

    pub fn from_result(result: ActionResult<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::failure(&err),
        }
    }
}

impl<T> From<ActionResult<T>> for ActionResponse<T> {
    fn from(result: ActionResult<T>) -> Self {
        Self::from_result(result)
    }
}
