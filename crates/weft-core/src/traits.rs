//! Repository traits: the directory defines what it needs from storage,
//! `weft-db` provides the PostgreSQL implementation.

use crate::entity::{ChatMessage, User};
use async_trait::async_trait;

/// Error surface of the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("database error: {0}")]
    Database(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Fails with [`RepoError::AlreadyExists`] when the
    /// name is taken.
    async fn create(&self, user_name: &str, password_hash: &str) -> RepoResult<User>;

    async fn find_by_name(&self, user_name: &str) -> RepoResult<Option<User>>;

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<User>>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Insert a message record, returning it with its assigned id and
    /// server-stamped create time.
    async fn insert(&self, message: &ChatMessage) -> RepoResult<ChatMessage>;

    /// Direct-message history between two users, newest first.
    async fn single_history(
        &self,
        user_a: i64,
        user_b: i64,
        limit: i64,
        offset: i64,
    ) -> RepoResult<Vec<ChatMessage>>;

    /// Room history, newest first.
    async fn room_history(&self, room_id: i64, limit: i64, offset: i64)
        -> RepoResult<Vec<ChatMessage>>;
}
