//! Request/reply DTOs for the directory RPC surface and the client-facing
//! push payload.
//!
//! Field names follow the wire contract (camelCase JSON); these types are
//! shared by the RPC layer, the HTTP front-end, and the gateways.

use crate::ops::{ContentType, Op};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub password: String,
}

/// Reply to `Login` and `Register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenReply {
    pub code: i32,
    #[serde(default)]
    pub auth_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAuthRequest {
    pub auth_token: String,
}

/// Reply to `CheckAuth` and `GetUserInfoByUserId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfoReply {
    pub code: i32,
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub user_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub auth_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUserInfoRequest {
    pub user_id: i64,
}

/// Generic reply carrying only a result code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeReply {
    pub code: i32,
}

/// First frame of every client socket: the session handshake.
///
/// `serverId` is filled in by the accepting gateway, never by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    pub auth_token: String,
    #[serde(default)]
    pub room_id: i64,
    #[serde(default)]
    pub server_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectReply {
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectRequest {
    pub room_id: i64,
    pub user_id: i64,
}

/// The chat payload: what clients receive on their sockets and what the
/// directory persists and routes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Send {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub from_user_id: i64,
    #[serde(default)]
    pub from_user_name: String,
    #[serde(default)]
    pub to_user_id: i64,
    #[serde(default)]
    pub to_user_name: String,
    #[serde(default)]
    pub room_id: i64,
    #[serde(default = "default_op_code")]
    pub op: i32,
    #[serde(default)]
    pub create_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
}

fn default_op_code() -> i32 {
    Op::SingleSend.code()
}

/// Framed-TCP variant of [`Send`]: carries the auth token so the first
/// packet can double as the handshake.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTcp {
    #[serde(flatten)]
    pub send: Send,
    #[serde(default)]
    pub auth_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleHistoryRequest {
    pub current_user_id: i64,
    pub other_user_id: i64,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomHistoryRequest {
    pub room_id: i64,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// One message in a history reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageItem {
    pub id: i64,
    pub from_user_id: i64,
    pub from_user_name: String,
    pub to_user_id: i64,
    pub to_user_name: String,
    pub room_id: i64,
    pub content: String,
    pub content_type: String,
    pub create_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryReply {
    pub code: i32,
    #[serde(default)]
    pub messages: Vec<MessageItem>,
}

/// Push a single message to one user on one gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMsgRequest {
    pub user_id: i64,
    pub msg: crate::envelope::Msg,
}

/// Push a message to every member of a room on one gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRoomMsgRequest {
    pub room_id: i64,
    pub msg: crate::envelope::Msg,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_uses_camel_case_wire_names() {
        let send = Send {
            code: 0,
            msg: "hi".into(),
            from_user_id: 1,
            from_user_name: "alice".into(),
            to_user_id: 2,
            to_user_name: "bob".into(),
            room_id: 1,
            op: Op::SingleSend.code(),
            create_time: "2026-01-01 00:00:00".into(),
            content_type: Some(ContentType::Text),
        };
        let json = serde_json::to_value(&send).unwrap();
        assert_eq!(json["fromUserId"], 1);
        assert_eq!(json["toUserName"], "bob");
        assert_eq!(json["contentType"], "text");
        assert_eq!(json["op"], 2);
    }

    #[test]
    fn send_content_type_is_omitted_when_absent() {
        let send = Send::default();
        let json = serde_json::to_string(&send).unwrap();
        assert!(!json.contains("contentType"));
    }

    #[test]
    fn send_tcp_flattens_the_payload() {
        let json = r#"{"msg":"hello","roomId":7,"op":3,"authToken":"tok"}"#;
        let tcp: SendTcp = serde_json::from_str(json).unwrap();
        assert_eq!(tcp.auth_token, "tok");
        assert_eq!(tcp.send.room_id, 7);
        assert_eq!(tcp.send.op, Op::RoomSend.code());
    }

    #[test]
    fn connect_request_defaults_server_id() {
        let req: ConnectRequest = serde_json::from_str(r#"{"authToken":"t","roomId":1}"#).unwrap();
        assert_eq!(req.server_id, "");
        assert_eq!(req.room_id, 1);
    }
}
