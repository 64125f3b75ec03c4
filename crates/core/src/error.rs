//! Error type shared by every lifecycle operation.
//!
//! One enum covers the calculator, the state machines, the allocator and the
//! persistence layer so callers can match on a single set of kinds.

use kontrakt_shared::AppError;
use thiserror::Error;

/// Errors that can occur during lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// Entity id does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity kind, e.g. `deal`.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// Target state unreachable from the current state.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Precondition on the current state violated.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Malformed argument or cross-field combination.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Actor lacks permission for the mutation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Optimistic-lock conflict.
    #[error("{entity} {id} was modified concurrently")]
    ConcurrentModification {
        /// Entity kind.
        entity: &'static str,
        /// Identifier of the contended row.
        id: String,
    },

    /// The sequence allocator could not commit under contention.
    #[error("Could not allocate a number for {company}/{year} after {attempts} attempts")]
    RetryExhausted {
        /// Company the number was requested for.
        company: String,
        /// Year the number was requested for.
        year: i32,
        /// Attempts made.
        attempts: u32,
    },

    /// The per-company, per-year counter reached its upper bound.
    #[error("Number sequence exhausted for {company}/{year}")]
    SequenceExhausted {
        /// Company of the exhausted counter.
        company: String,
        /// Year of the exhausted counter.
        year: i32,
    },

    /// Store failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl LifecycleError {
    /// Builds a `NotFound` error.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Builds a `ConcurrentModification` error.
    pub fn conflict(entity: &'static str, id: impl ToString) -> Self {
        Self::ConcurrentModification {
            entity,
            id: id.to_string(),
        }
    }

    /// Builds the standard "cannot move X from A to B" transition error.
    pub fn transition(
        entity: &str,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidTransition(format!("cannot move {entity} from {from} to {to}"))
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::InvalidTransition(_) | Self::InvalidState(_) => 422,
            Self::InvalidArgument(_) => 400,
            Self::Forbidden(_) => 403,
            Self::ConcurrentModification { .. } | Self::RetryExhausted { .. } => 409,
            Self::SequenceExhausted { .. } | Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidTransition(_) => "INVALID_TRANSITION",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            Self::RetryExhausted { .. } => "RETRY_EXHAUSTED",
            Self::SequenceExhausted { .. } => "SEQUENCE_EXHAUSTED",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns true if the caller may retry the same request.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrentModification { .. } | Self::RetryExhausted { .. }
        )
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        let message = err.to_string();
        match err {
            LifecycleError::NotFound { .. } => Self::NotFound(message),
            LifecycleError::InvalidTransition(_) | LifecycleError::InvalidState(_) => {
                Self::BusinessRule(message)
            }
            LifecycleError::InvalidArgument(_) => Self::Validation(message),
            LifecycleError::Forbidden(_) => Self::Forbidden(message),
            LifecycleError::ConcurrentModification { .. }
            | LifecycleError::RetryExhausted { .. } => Self::Conflict(message),
            LifecycleError::SequenceExhausted { .. } => Self::Internal(message),
            LifecycleError::Database(_) => Self::Database(message),
        }
    }
}
