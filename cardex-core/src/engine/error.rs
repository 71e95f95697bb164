use thiserror::Error;
use uuid::Uuid;

/// Failure of a settlement operation.
///
/// Every variant except [`EngineError::Database`] leaves state untouched.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    /// The action is not legal from the record's current status.
    #[error("cannot {action} {entity} in status {current}")]
    InvalidTransition {
        entity: &'static str,
        action: &'static str,
        current: String,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// A code was required (approval of a buy order, or a code read) but
    /// none is attached.
    #[error("{entity} {id} has no redemption code attached")]
    MissingCode { entity: &'static str, id: Uuid },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl EngineError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_transition(
        entity: &'static str,
        action: &'static str,
        current: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidTransition {
            entity,
            action,
            current: current.to_string(),
        }
    }

    /// The status the record was in when an illegal action was attempted.
    pub fn current_status(&self) -> Option<&str> {
        match self {
            Self::InvalidTransition { current, .. } => Some(current),
            _ => None,
        }
    }
}
