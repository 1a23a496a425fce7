//! Unified error handling for the weft services.

use serde::Serialize;
use std::fmt;
use weft_core::{RepoError, CODE_FAIL};

/// Application-wide error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Authentication
    #[error("auth fail")]
    InvalidCredentials,

    #[error("auth fail")]
    InvalidToken,

    // Validation
    #[error("validation error: {0}")]
    Validation(String),

    // Resources
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    // Admission
    #[error("too many connections")]
    TooManyConnections,

    // Infrastructure
    #[error("database error: {0}")]
    Database(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("queue error: {0}")]
    Queue(String),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    /// The unified wire code for this error. Every variant maps to the
    /// failure code; success codes exist only on the success path.
    #[must_use]
    pub fn code(&self) -> i32 {
        CODE_FAIL
    }

    /// Whether the caller should see the error text, or a generic message.
    ///
    /// Authentication failures are deliberately vague; tokens and stored
    /// credentials never appear in messages.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::InvalidCredentials | Self::InvalidToken)
    }

    #[must_use]
    pub fn validation(msg: impl fmt::Display) -> Self {
        Self::Validation(msg.to_string())
    }

    #[must_use]
    pub fn not_found(what: impl fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }

    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(what) => Self::NotFound(what),
            RepoError::AlreadyExists(what) => Self::AlreadyExists(what),
            RepoError::Database(msg) => Self::Database(msg),
        }
    }
}

/// Error payload in unified API responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: i32,
    pub message: String,
}

impl From<&AppError> for ErrorBody {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_error_maps_to_fail_code() {
        assert_eq!(AppError::InvalidToken.code(), CODE_FAIL);
        assert_eq!(AppError::Validation("x".into()).code(), CODE_FAIL);
        assert_eq!(AppError::Database("x".into()).code(), CODE_FAIL);
    }

    #[test]
    fn auth_errors_are_generic() {
        assert_eq!(AppError::InvalidCredentials.to_string(), "auth fail");
        assert_eq!(AppError::InvalidToken.to_string(), "auth fail");
        assert!(AppError::InvalidToken.is_auth());
        assert!(!AppError::Queue("down".into()).is_auth());
    }

    #[test]
    fn repo_errors_convert() {
        let err: AppError = RepoError::AlreadyExists("user alice".into()).into();
        assert!(matches!(err, AppError::AlreadyExists(_)));
    }
}
