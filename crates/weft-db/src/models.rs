//! Row models mapped with sqlx, converted into domain entities at the
//! repository boundary.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use weft_core::entity::{ChatMessage, User};
use weft_core::ops::ContentType;

#[derive(Debug, Clone, FromRow)]
pub struct UserModel {
    pub id: i64,
    pub user_name: String,
    pub password: String,
    pub create_time: DateTime<Utc>,
}

impl From<UserModel> for User {
    fn from(model: UserModel) -> Self {
        Self {
            id: model.id,
            user_name: model.user_name,
            password: model.password,
            create_time: model.create_time,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct MessageModel {
    pub id: i64,
    pub from_user_id: i64,
    pub from_user_name: String,
    pub to_user_id: i64,
    pub to_user_name: String,
    pub room_id: i64,
    pub message_type: i32,
    pub content: String,
    pub content_type: String,
    pub create_time: DateTime<Utc>,
}

impl From<MessageModel> for ChatMessage {
    fn from(model: MessageModel) -> Self {
        Self {
            id: model.id,
            from_user_id: model.from_user_id,
            from_user_name: model.from_user_name,
            to_user_id: model.to_user_id,
            to_user_name: model.to_user_name,
            room_id: model.room_id,
            message_type: model.message_type,
            content: model.content,
            content_type: model.content_type.parse().unwrap_or(ContentType::Text),
            create_time: model.create_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn unknown_content_type_degrades_to_text() {
        let model = MessageModel {
            id: 1,
            from_user_id: 1,
            from_user_name: "a".into(),
            to_user_id: 2,
            to_user_name: "b".into(),
            room_id: 0,
            message_type: 2,
            content: "x".into(),
            content_type: "weird".into(),
            create_time: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        };
        let message: ChatMessage = model.into();
        assert_eq!(message.content_type, ContentType::Text);
    }
}
