//! RPC envelope: JSON request/response correlated by id.

use serde::{Deserialize, Serialize};
use weft_core::{CODE_FAIL, CODE_OK};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Transport-level reply. `code` reports whether the method dispatched and
/// ran; the method's own result (including any application-level code)
/// lives in `body`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: u64,
    pub code: i32,
    #[serde(default)]
    pub body: serde_json::Value,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl RpcResponse {
    #[must_use]
    pub fn ok(id: u64, body: serde_json::Value) -> Self {
        Self {
            id,
            code: CODE_OK,
            body,
            message: String::new(),
        }
    }

    #[must_use]
    pub fn fail(id: u64, message: impl Into<String>) -> Self {
        Self {
            id,
            code: CODE_FAIL,
            body: serde_json::Value::Null,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips() {
        let req = RpcRequest {
            id: 9,
            method: "CheckAuth".into(),
            params: serde_json::json!({"authToken": "t"}),
        };
        let json = serde_json::to_string(&req).unwrap();
        let back: RpcRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, 9);
        assert_eq!(back.method, "CheckAuth");
    }

    #[test]
    fn failure_replies_carry_a_message() {
        let resp = RpcResponse::fail(3, "unknown method");
        assert_eq!(resp.code, CODE_FAIL);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("unknown method"));

        let ok = RpcResponse::ok(3, serde_json::json!({}));
        let json = serde_json::to_string(&ok).unwrap();
        assert!(!json.contains("message"));
    }
}
