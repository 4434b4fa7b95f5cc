use thiserror::Error;

use crate::store::StoreError;

/// A single validation failure, tied to the request field that caused it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Application error taxonomy. Everything except `Internal` is expected,
/// user-facing and user-correctable; `Internal` carries full context for
/// the logs and surfaces to callers as a generic failure.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed: {}", format_field_errors(.0))]
    ValidationFailed(Vec<FieldError>),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    /// The operation conflicts with the entity's lifecycle state, e.g.
    /// responding to a cancelled event.
    #[error("{0}")]
    InvalidState(String),

    /// A race-safe capacity rejection. Distinct from `ValidationFailed`
    /// because it depends on live concurrent state.
    #[error("{0}")]
    CapacityExceeded(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl AppError {
    pub fn validation(errors: Vec<FieldError>) -> Self {
        AppError::ValidationFailed(errors)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        AppError::InvalidState(message.into())
    }

    pub fn capacity_exceeded(message: impl Into<String>) -> Self {
        AppError::CapacityExceeded(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal(message.into())
    }

    /// Field-level failures, when this is a validation error.
    pub fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            AppError::ValidationFailed(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AppError::NotFound(what),
            // A lost counter race is reported by the caller after its
            // retry; reaching here means the conflict was unhandled.
            StoreError::Conflict(what) => {
                AppError::Internal(format!("Unhandled store conflict: {}", what))
            }
            StoreError::Internal(what) => AppError::Internal(what),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
