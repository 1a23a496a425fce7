//! Persistent entities: users and message records.

use crate::ops::ContentType;
use crate::proto::MessageItem;
use chrono::{DateTime, Utc};

/// Wire format for `createTime` fields.
pub const CREATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub user_name: String,
    /// Salted hash, never the credential itself.
    pub password: String,
    pub create_time: DateTime<Utc>,
}

/// A persisted chat message. Immutable after insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: i64,
    pub from_user_id: i64,
    pub from_user_name: String,
    /// 0 for room broadcasts.
    pub to_user_id: i64,
    pub to_user_name: String,
    /// 0 for direct messages.
    pub room_id: i64,
    /// The op code the message was sent under.
    pub message_type: i32,
    pub content: String,
    pub content_type: ContentType,
    pub create_time: DateTime<Utc>,
}

impl ChatMessage {
    /// True if this is a direct (single-recipient) message.
    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.room_id == 0 && self.to_user_id > 0
    }

    /// Render as a wire-facing history item.
    #[must_use]
    pub fn to_item(&self) -> MessageItem {
        MessageItem {
            id: self.id,
            from_user_id: self.from_user_id,
            from_user_name: self.from_user_name.clone(),
            to_user_id: self.to_user_id,
            to_user_name: self.to_user_name.clone(),
            room_id: self.room_id,
            content: self.content.clone(),
            content_type: self.content_type.as_str().to_string(),
            create_time: self.create_time.format(CREATE_TIME_FORMAT).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> ChatMessage {
        ChatMessage {
            id: 10,
            from_user_id: 1,
            from_user_name: "alice".into(),
            to_user_id: 2,
            to_user_name: "bob".into(),
            room_id: 0,
            message_type: 2,
            content: "hi".into(),
            content_type: ContentType::Text,
            create_time: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    #[test]
    fn direct_vs_room_classification() {
        let direct = sample();
        assert!(direct.is_direct());

        let mut room = sample();
        room.to_user_id = 0;
        room.room_id = 7;
        assert!(!room.is_direct());
    }

    #[test]
    fn history_item_formats_create_time() {
        let item = sample().to_item();
        assert_eq!(item.create_time, "2026-01-02 03:04:05");
        assert_eq!(item.content_type, "text");
    }
}
