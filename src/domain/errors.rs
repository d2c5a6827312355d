//! Domain errors for the agent runtime.

use thiserror::Error;

/// Domain-level errors that can occur anywhere in the runtime core.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Thought not found: {0}")]
    ThoughtNotFound(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("No {service} provider available: {detail}")]
    ServiceUnavailable { service: String, detail: String },

    #[error("Circuit open for provider {0}")]
    CircuitOpen(String),

    #[error("Evaluator {evaluator} failed: {message}")]
    EvaluatorFailed { evaluator: String, message: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Shutdown in progress: {0}")]
    ShuttingDown(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Construct a [`DomainError::ServiceUnavailable`] for a named service type.
    pub fn service_unavailable(service: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            service: service.into(),
            detail: detail.into(),
        }
    }

    /// Whether this error means no provider could be reached at all.
    ///
    /// The SPEAK handler treats this as unrecoverable when communication is
    /// the agent's only contact channel.
    pub fn is_provider_unavailable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable { .. } | Self::CircuitOpen(_))
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
