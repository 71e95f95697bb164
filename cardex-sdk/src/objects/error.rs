//! Error body returned by every endpoint on failure.

use serde::{Deserialize, Serialize};

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    Unauthorized,
    Forbidden,
    Conflict,
    InvalidTransition,
    NotFound,
    MissingCode,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorKind,
    pub message: String,
    /// Current status of the record for `invalid_transition` errors, so
    /// retries can treat the call as a no-op.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_status: Option<String>,
}
