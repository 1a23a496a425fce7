//! Queue envelopes and gateway push frames.
//!
//! The directory publishes a [`RouteMsg`] under the op's routing key; the
//! dispatcher translates it into a [`Msg`] pushed to gateways over RPC. The
//! `body` of a [`Msg`] is opaque to the transport: gateways forward it to
//! client sockets verbatim.

use crate::ops::Op;
use crate::snowflake::Snowflake;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The versioned frame a gateway writes to a client socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Msg {
    pub ver: i32,
    pub operation: i32,
    pub seq_id: Snowflake,
    pub body: serde_json::Value,
}

impl Msg {
    #[must_use]
    pub fn new(op: Op, seq_id: Snowflake, body: serde_json::Value) -> Self {
        Self {
            ver: crate::ops::MSG_VERSION,
            operation: op.code(),
            seq_id,
            body,
        }
    }
}

/// The routing envelope the directory publishes to the queue.
///
/// `roomId == 0` means direct-only; `toUserId == 0` means room-only. Exactly
/// which fields are meaningful depends on `op`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMsg {
    pub op: i32,
    /// Sequence id stamped by the directory at publish time.
    #[serde(default)]
    pub seq_id: Snowflake,
    #[serde(default)]
    pub to_user_id: i64,
    #[serde(default)]
    pub room_id: i64,
    #[serde(default)]
    pub count: i64,
    /// Serialized [`crate::proto::Send`] for message ops; unused for meta ops.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub msg: serde_json::Value,
    /// Roster snapshot (`userId → userName`) for `room_info` envelopes.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub room_user_info: HashMap<String, String>,
}

impl RouteMsg {
    /// The routing key this envelope must be published under.
    pub fn routing_key(&self) -> Result<&'static str, crate::ops::UnknownOp> {
        let op = Op::try_from(self.op)?;
        op.routing_key().ok_or(crate::ops::UnknownOp(self.op))
    }
}

/// Body of a `room_count` push, as clients see it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCountBody {
    pub room_id: i64,
    pub count: i64,
    pub op: i32,
}

/// Body of a `room_info` push, as clients see it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfoBody {
    pub room_id: i64,
    pub count: i64,
    pub op: i32,
    pub room_user_info: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msg_carries_protocol_version() {
        let msg = Msg::new(Op::RoomSend, Snowflake::new(7), serde_json::json!({"a": 1}));
        assert_eq!(msg.ver, crate::ops::MSG_VERSION);
        assert_eq!(msg.operation, 3);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["seqId"], 7);
        assert_eq!(json["body"]["a"], 1);
    }

    #[test]
    fn route_msg_resolves_routing_key_from_op() {
        let env = RouteMsg {
            op: Op::SingleSend.code(),
            to_user_id: 2,
            room_id: 1,
            ..Default::default()
        };
        assert_eq!(env.routing_key().unwrap(), "single_send");

        let bad = RouteMsg {
            op: 99,
            ..Default::default()
        };
        assert!(bad.routing_key().is_err());
    }

    #[test]
    fn route_msg_omits_empty_optional_fields() {
        let env = RouteMsg {
            op: Op::RoomCountSend.code(),
            room_id: 9,
            count: 3,
            ..Default::default()
        };
        let json = serde_json::to_string(&env).unwrap();
        assert!(!json.contains("roomUserInfo"));
        assert!(!json.contains("\"msg\""));
    }
}
