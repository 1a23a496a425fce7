//! The directory service proper: users, sessions, roster, message
//! persistence, and envelope publishing.

use crate::auth::{generate_token, hash_password, verify_password};
use std::collections::HashMap;
use std::sync::Arc;
use weft_cache::{AuthInfo, RoomRosterStore, SessionStore};
use weft_common::{AppError, AppResult};
use weft_core::entity::{ChatMessage, CREATE_TIME_FORMAT};
use weft_core::proto::{ConnectRequest, MessageItem, Send};
use weft_core::{
    ContentType, MessageRepository, Op, RouteMsg, SnowflakeGenerator, UserRepository,
};
use weft_queue::QueuePublisher;

/// Caps applied to history pagination.
const HISTORY_MAX_LIMIT: i64 = 100;
const HISTORY_DEFAULT_LIMIT: i64 = 50;

pub struct DirectoryService {
    users: Arc<dyn UserRepository>,
    messages: Arc<dyn MessageRepository>,
    sessions: SessionStore,
    roster: RoomRosterStore,
    publisher: Arc<QueuePublisher>,
    snowflake: Arc<SnowflakeGenerator>,
}

impl DirectoryService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        messages: Arc<dyn MessageRepository>,
        sessions: SessionStore,
        roster: RoomRosterStore,
        publisher: Arc<QueuePublisher>,
        snowflake: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            users,
            messages,
            sessions,
            roster,
            publisher,
            snowflake,
        }
    }

    /// Verify credentials and materialise a session token.
    pub async fn login(&self, name: &str, password: &str) -> AppResult<String> {
        let user = self
            .users
            .find_by_name(name)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &user.password)? {
            return Err(AppError::InvalidCredentials);
        }

        self.issue_token(user.id, &user.user_name).await
    }

    /// Create a user and log them in.
    pub async fn register(&self, name: &str, password: &str) -> AppResult<String> {
        if name.is_empty() || password.is_empty() {
            return Err(AppError::validation("name and password are required"));
        }

        let hash = hash_password(password)?;
        let user = self.users.create(name, &hash).await?;
        tracing::info!(user_id = user.id, user_name = %name, "user registered");

        self.issue_token(user.id, &user.user_name).await
    }

    async fn issue_token(&self, user_id: i64, user_name: &str) -> AppResult<String> {
        let token = generate_token();
        let info = AuthInfo {
            user_id,
            user_name: user_name.to_string(),
        };
        self.sessions
            .put(&token, &info)
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;
        Ok(token)
    }

    /// Resolve a token to its session. Fails on miss or expiry.
    pub async fn check_auth(&self, token: &str) -> AppResult<AuthInfo> {
        self.sessions
            .get(token)
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?
            .ok_or(AppError::InvalidToken)
    }

    /// Drop a session. Roster entries are untouched; they clear as
    /// disconnects propagate.
    pub async fn logout(&self, token: &str) -> AppResult<()> {
        let existed = self
            .sessions
            .delete(token)
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;
        if !existed {
            return Err(AppError::InvalidToken);
        }
        Ok(())
    }

    pub async fn get_user_info(&self, user_id: i64) -> AppResult<AuthInfo> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {user_id}")))?;
        Ok(AuthInfo {
            user_id: user.id,
            user_name: user.user_name,
        })
    }

    /// Register a live channel: verify the token, write the roster entry,
    /// and fan out fresh room metadata. Idempotent on re-registration.
    pub async fn connect(&self, req: &ConnectRequest) -> AppResult<i64> {
        if req.server_id.is_empty() {
            return Err(AppError::validation("serverId is required"));
        }

        let info = self.check_auth(&req.auth_token).await?;
        self.roster
            .add(req.room_id, info.user_id, &req.server_id, &info.user_name)
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;

        tracing::debug!(
            user_id = info.user_id,
            room_id = req.room_id,
            server_id = %req.server_id,
            "channel registered"
        );

        self.publish_room_meta(req.room_id).await?;
        Ok(info.user_id)
    }

    /// Remove a roster entry and redraw room metadata on every gateway.
    pub async fn disconnect(&self, room_id: i64, user_id: i64) -> AppResult<bool> {
        let existed = self
            .roster
            .remove(room_id, user_id)
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;

        tracing::debug!(user_id, room_id, existed, "channel deregistered");

        self.publish_room_meta(room_id).await?;
        Ok(existed)
    }

    /// Persist a direct message and publish its routing envelope.
    pub async fn push(&self, send: &Send) -> AppResult<Send> {
        if send.to_user_id <= 0 {
            return Err(AppError::validation("toUserId is required"));
        }
        if send.room_id <= 0 {
            // Without a room there is no roster entry to route by.
            return Err(AppError::validation("roomId is required"));
        }

        // Direct messages persist with roomId = 0; the envelope keeps the
        // room for roster lookup.
        let record = self
            .persist(send, Op::SingleSend, send.to_user_id, 0)
            .await?;
        let stamped = stamped_send(send, &record, Op::SingleSend);

        let envelope = RouteMsg {
            op: Op::SingleSend.code(),
            seq_id: self.snowflake.generate(),
            to_user_id: send.to_user_id,
            room_id: send.room_id,
            msg: serde_json::to_value(&stamped).map_err(AppError::internal)?,
            ..Default::default()
        };
        self.publish(&envelope).await?;
        Ok(stamped)
    }

    /// Persist a room broadcast and publish its routing envelope.
    pub async fn push_room(&self, send: &Send) -> AppResult<Send> {
        if send.room_id <= 0 {
            return Err(AppError::validation("roomId is required"));
        }

        let record = self.persist(send, Op::RoomSend, 0, send.room_id).await?;
        let stamped = stamped_send(send, &record, Op::RoomSend);

        let envelope = RouteMsg {
            op: Op::RoomSend.code(),
            seq_id: self.snowflake.generate(),
            room_id: send.room_id,
            msg: serde_json::to_value(&stamped).map_err(AppError::internal)?,
            ..Default::default()
        };
        self.publish(&envelope).await?;
        Ok(stamped)
    }

    /// Publish the live occupancy of a room.
    pub async fn count(&self, room_id: i64) -> AppResult<i64> {
        if room_id <= 0 {
            return Err(AppError::validation("roomId is required"));
        }
        let count = self
            .roster
            .count(room_id)
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;

        let envelope = RouteMsg {
            op: Op::RoomCountSend.code(),
            seq_id: self.snowflake.generate(),
            room_id,
            count,
            ..Default::default()
        };
        self.publish(&envelope).await?;
        Ok(count)
    }

    /// Publish the roster snapshot of a room.
    pub async fn room_info(&self, room_id: i64) -> AppResult<HashMap<String, String>> {
        if room_id <= 0 {
            return Err(AppError::validation("roomId is required"));
        }
        let members = self
            .roster
            .members(room_id)
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;

        let envelope = RouteMsg {
            op: Op::RoomInfoSend.code(),
            seq_id: self.snowflake.generate(),
            room_id,
            count: members.len() as i64,
            room_user_info: members.clone(),
            ..Default::default()
        };
        self.publish(&envelope).await?;
        Ok(members)
    }

    pub async fn single_history(
        &self,
        current_user_id: i64,
        other_user_id: i64,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<MessageItem>> {
        let (limit, offset) = clamp_page(limit, offset);
        let messages = self
            .messages
            .single_history(current_user_id, other_user_id, limit, offset)
            .await?;
        Ok(messages.iter().map(ChatMessage::to_item).collect())
    }

    pub async fn room_history(
        &self,
        room_id: i64,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<MessageItem>> {
        if room_id <= 0 {
            return Err(AppError::validation("roomId is required"));
        }
        let (limit, offset) = clamp_page(limit, offset);
        let messages = self.messages.room_history(room_id, limit, offset).await?;
        Ok(messages.iter().map(ChatMessage::to_item).collect())
    }

    async fn persist(
        &self,
        send: &Send,
        op: Op,
        to_user_id: i64,
        room_id: i64,
    ) -> AppResult<ChatMessage> {
        let record = ChatMessage {
            id: 0,
            from_user_id: send.from_user_id,
            from_user_name: send.from_user_name.clone(),
            to_user_id,
            to_user_name: send.to_user_name.clone(),
            room_id,
            message_type: op.code(),
            content: send.msg.clone(),
            content_type: send.content_type.unwrap_or(ContentType::Text),
            create_time: chrono::Utc::now(),
        };
        Ok(self.messages.insert(&record).await?)
    }

    /// Fan out count and roster snapshot envelopes after a membership
    /// change.
    async fn publish_room_meta(&self, room_id: i64) -> AppResult<()> {
        self.count(room_id).await?;
        self.room_info(room_id).await?;
        Ok(())
    }

    async fn publish(&self, envelope: &RouteMsg) -> AppResult<()> {
        let key = envelope
            .routing_key()
            .map_err(|e| AppError::Queue(e.to_string()))?;
        self.publisher
            .publish(key, envelope)
            .await
            .map_err(|e| AppError::Queue(e.to_string()))?;
        Ok(())
    }
}

/// Copy the caller's payload, stamping op, server-assigned create time, and
/// the success code clients expect on their sockets.
fn stamped_send(send: &Send, record: &ChatMessage, op: Op) -> Send {
    Send {
        code: weft_core::CODE_OK,
        msg: send.msg.clone(),
        from_user_id: send.from_user_id,
        from_user_name: send.from_user_name.clone(),
        to_user_id: send.to_user_id,
        to_user_name: send.to_user_name.clone(),
        room_id: send.room_id,
        op: op.code(),
        create_time: record.create_time.format(CREATE_TIME_FORMAT).to_string(),
        content_type: Some(record.content_type),
    }
}

fn clamp_page(limit: i64, offset: i64) -> (i64, i64) {
    let limit = if limit <= 0 {
        HISTORY_DEFAULT_LIMIT
    } else {
        limit.min(HISTORY_MAX_LIMIT)
    };
    (limit, offset.max(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamping() {
        assert_eq!(clamp_page(0, 0), (HISTORY_DEFAULT_LIMIT, 0));
        assert_eq!(clamp_page(-5, -3), (HISTORY_DEFAULT_LIMIT, 0));
        assert_eq!(clamp_page(10, 20), (10, 20));
        assert_eq!(clamp_page(10_000, 0), (HISTORY_MAX_LIMIT, 0));
    }

    #[test]
    fn stamped_send_carries_server_fields() {
        let send = Send {
            msg: "hi".into(),
            from_user_id: 1,
            from_user_name: "alice".into(),
            to_user_id: 2,
            to_user_name: "bob".into(),
            room_id: 1,
            ..Default::default()
        };
        let record = ChatMessage {
            id: 5,
            from_user_id: 1,
            from_user_name: "alice".into(),
            to_user_id: 2,
            to_user_name: "bob".into(),
            room_id: 0,
            message_type: Op::SingleSend.code(),
            content: "hi".into(),
            content_type: ContentType::Text,
            create_time: chrono::Utc::now(),
        };
        let stamped = stamped_send(&send, &record, Op::SingleSend);
        assert_eq!(stamped.code, weft_core::CODE_OK);
        assert_eq!(stamped.op, 2);
        assert!(!stamped.create_time.is_empty());
        assert_eq!(stamped.content_type, Some(ContentType::Text));
    }
}
