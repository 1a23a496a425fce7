//! PostgreSQL implementation of `MessageRepository`.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use weft_core::entity::ChatMessage;
use weft_core::traits::{MessageRepository, RepoResult};

use super::error::map_db_error;
use crate::models::MessageModel;

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    #[instrument(skip(self, message))]
    async fn insert(&self, message: &ChatMessage) -> RepoResult<ChatMessage> {
        let model = sqlx::query_as::<_, MessageModel>(
            r#"
            INSERT INTO message
                (from_user_id, from_user_name, to_user_id, to_user_name,
                 room_id, message_type, content, content_type, create_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            RETURNING id, from_user_id, from_user_name, to_user_id, to_user_name,
                      room_id, message_type, content, content_type, create_time
            "#,
        )
        .bind(message.from_user_id)
        .bind(&message.from_user_name)
        .bind(message.to_user_id)
        .bind(&message.to_user_name)
        .bind(message.room_id)
        .bind(message.message_type)
        .bind(&message.content)
        .bind(message.content_type.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(model.into())
    }

    #[instrument(skip(self))]
    async fn single_history(
        &self,
        user_a: i64,
        user_b: i64,
        limit: i64,
        offset: i64,
    ) -> RepoResult<Vec<ChatMessage>> {
        let models = sqlx::query_as::<_, MessageModel>(
            r#"
            SELECT id, from_user_id, from_user_name, to_user_id, to_user_name,
                   room_id, message_type, content, content_type, create_time
            FROM message
            WHERE ((from_user_id = $1 AND to_user_id = $2)
                OR (from_user_id = $2 AND to_user_id = $1))
              AND room_id = 0
            ORDER BY create_time DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(models.into_iter().map(ChatMessage::from).collect())
    }

    #[instrument(skip(self))]
    async fn room_history(
        &self,
        room_id: i64,
        limit: i64,
        offset: i64,
    ) -> RepoResult<Vec<ChatMessage>> {
        let models = sqlx::query_as::<_, MessageModel>(
            r#"
            SELECT id, from_user_id, from_user_name, to_user_id, to_user_name,
                   room_id, message_type, content, content_type, create_time
            FROM message
            WHERE room_id = $1
            ORDER BY create_time DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(room_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(models.into_iter().map(ChatMessage::from).collect())
    }
}
