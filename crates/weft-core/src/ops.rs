//! Operation codes and wire-level constants.

use serde::{Deserialize, Serialize};

/// Protocol version carried in every queue envelope and RPC push.
pub const MSG_VERSION: i32 = 1;

/// Success code in unified API responses and RPC replies.
pub const CODE_OK: i32 = 0;

/// Failure code in unified API responses and RPC replies.
pub const CODE_FAIL: i32 = 1;

/// Operation codes shared by the HTTP front-end, the queue, and the
/// gateway push frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum Op {
    /// Framed-TCP handshake: first packet carrying the auth token.
    BuildTcpConn,
    /// Single-recipient message.
    SingleSend,
    /// Room broadcast message.
    RoomSend,
    /// Room online-count update.
    RoomCountSend,
    /// Room roster snapshot update.
    RoomInfoSend,
}

impl Op {
    /// The numeric code used on the wire.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::BuildTcpConn => 1,
            Self::SingleSend => 2,
            Self::RoomSend => 3,
            Self::RoomCountSend => 4,
            Self::RoomInfoSend => 5,
        }
    }

    /// Routing key used when an envelope with this op is published.
    ///
    /// `BuildTcpConn` never crosses the queue.
    #[must_use]
    pub const fn routing_key(self) -> Option<&'static str> {
        match self {
            Self::BuildTcpConn => None,
            Self::SingleSend => Some("single_send"),
            Self::RoomSend => Some("room_send"),
            Self::RoomCountSend => Some("room_count"),
            Self::RoomInfoSend => Some("room_info"),
        }
    }
}

impl From<Op> for i32 {
    fn from(op: Op) -> Self {
        op.code()
    }
}

impl TryFrom<i32> for Op {
    type Error = UnknownOp;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::BuildTcpConn),
            2 => Ok(Self::SingleSend),
            3 => Ok(Self::RoomSend),
            4 => Ok(Self::RoomCountSend),
            5 => Ok(Self::RoomInfoSend),
            other => Err(UnknownOp(other)),
        }
    }
}

/// Error for an operation code outside the known range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation code {0}")]
pub struct UnknownOp(pub i32);

/// Message content types persisted alongside each message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
    /// Content holds a URL to an uploaded image blob.
    Image,
}

impl ContentType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentType {
    type Err = UnknownContentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            other => Err(UnknownContentType(other.to_string())),
        }
    }
}

/// Error for a content type outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown content type {0:?}")]
pub struct UnknownContentType(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_codes_are_stable() {
        assert_eq!(Op::BuildTcpConn.code(), 1);
        assert_eq!(Op::SingleSend.code(), 2);
        assert_eq!(Op::RoomSend.code(), 3);
        assert_eq!(Op::RoomCountSend.code(), 4);
        assert_eq!(Op::RoomInfoSend.code(), 5);
    }

    #[test]
    fn op_round_trips_through_wire_code() {
        for code in 1..=5 {
            let op = Op::try_from(code).unwrap();
            assert_eq!(i32::from(op), code);
        }
        assert!(Op::try_from(0).is_err());
        assert!(Op::try_from(42).is_err());
    }

    #[test]
    fn op_serializes_as_integer() {
        let json = serde_json::to_string(&Op::RoomSend).unwrap();
        assert_eq!(json, "3");
        let op: Op = serde_json::from_str("2").unwrap();
        assert_eq!(op, Op::SingleSend);
    }

    #[test]
    fn routing_keys_match_bindings() {
        assert_eq!(Op::SingleSend.routing_key(), Some("single_send"));
        assert_eq!(Op::RoomSend.routing_key(), Some("room_send"));
        assert_eq!(Op::RoomCountSend.routing_key(), Some("room_count"));
        assert_eq!(Op::RoomInfoSend.routing_key(), Some("room_info"));
        assert_eq!(Op::BuildTcpConn.routing_key(), None);
    }

    #[test]
    fn content_type_defaults_to_text() {
        assert_eq!("".parse::<ContentType>().unwrap(), ContentType::Text);
        assert_eq!("text".parse::<ContentType>().unwrap(), ContentType::Text);
        assert_eq!("image".parse::<ContentType>().unwrap(), ContentType::Image);
        assert!("video".parse::<ContentType>().is_err());
    }
}
