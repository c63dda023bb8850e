use serde::Serialize;
use thiserror::Error;

/// Taxonomy from spec.md §7: errors are values, mapped to the normative
/// HTTP-like status family from spec.md §6.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict { detail: String, code: Option<&'static str> },

    #[error("{0}")]
    TypeViolation(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("lock contention: {0}")]
    Contention(String),

    #[error("internal invariant violation: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn conflict(detail: impl Into<String>) -> Self {
        CoreError::Conflict { detail: detail.into(), code: None }
    }

    pub fn conflict_coded(detail: impl Into<String>, code: &'static str) -> Self {
        CoreError::Conflict { detail: detail.into(), code: Some(code) }
    }

    pub fn status(&self) -> u16 {
        match self {
            CoreError::Validation(_) => 400,
            CoreError::Authorization(_) => 403,
            CoreError::NotFound(_) => 404,
            CoreError::Conflict { .. } => 409,
            CoreError::TypeViolation(_) => 422,
            CoreError::Unavailable(_) => 503,
            CoreError::Contention(_) => 409,
            CoreError::Internal(_) => 500,
        }
    }

    pub fn code(&self) -> Option<&'static str> {
        match self {
            CoreError::Conflict { code, .. } => *code,
            CoreError::Contention(_) => Some("contention"),
            CoreError::Internal(_) => Some("internal"),
            _ => None,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            CoreError::Conflict { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}

/// Wire shape for `{"success": false, ...}` per spec.md §6.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub status: u16,
    pub detail: String,
    pub code: Option<&'static str>,
}

impl From<&CoreError> for ErrorEnvelope {
    fn from(err: &CoreError) -> Self {
        ErrorEnvelope {
            success: false,
            status: err.status(),
            detail: err.detail(),
            code: err.code(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
