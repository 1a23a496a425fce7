//! Mapping from sqlx errors to the repository error surface.

use weft_core::RepoError;

/// Unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

pub fn map_db_error(err: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return RepoError::AlreadyExists(db_err.message().to_string());
        }
    }
    RepoError::Database(err.to_string())
}
