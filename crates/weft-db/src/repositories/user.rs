//! PostgreSQL implementation of `UserRepository`.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use weft_core::entity::User;
use weft_core::traits::{RepoError, RepoResult, UserRepository};

use super::error::map_db_error;
use crate::models::UserModel;

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self, password_hash))]
    async fn create(&self, user_name: &str, password_hash: &str) -> RepoResult<User> {
        let model = sqlx::query_as::<_, UserModel>(
            r#"
            INSERT INTO "user" (user_name, password, create_time)
            VALUES ($1, $2, NOW())
            RETURNING id, user_name, password, create_time
            "#,
        )
        .bind(user_name)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match map_db_error(e) {
            RepoError::AlreadyExists(_) => {
                RepoError::AlreadyExists(format!("user {user_name}"))
            }
            other => other,
        })?;

        Ok(model.into())
    }

    #[instrument(skip(self))]
    async fn find_by_name(&self, user_name: &str) -> RepoResult<Option<User>> {
        let model = sqlx::query_as::<_, UserModel>(
            r#"
            SELECT id, user_name, password, create_time
            FROM "user"
            WHERE user_name = $1
            "#,
        )
        .bind(user_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(model.map(User::from))
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<User>> {
        let model = sqlx::query_as::<_, UserModel>(
            r#"
            SELECT id, user_name, password, create_time
            FROM "user"
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(model.map(User::from))
    }
}
