//! Unified `{code, message, data}` responses: `code = 0` success, `code = 1`
//! failure. Failures ride an HTTP 200; the code field is the contract.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use weft_core::{CODE_FAIL, CODE_OK};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    #[must_use]
    pub fn success(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            code: CODE_OK,
            message: message.into(),
            data,
        }
    }
}

impl ApiResponse<serde_json::Value> {
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            code: CODE_FAIL,
            message: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Shorthand for a success response.
pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> ApiResponse<T> {
    ApiResponse::success(message, Some(data))
}

/// Shorthand for a success response with no data.
#[must_use]
pub fn ok_empty(message: impl Into<String>) -> ApiResponse<serde_json::Value> {
    ApiResponse::success(message, None)
}

/// Shorthand for a failure response.
#[must_use]
pub fn fail(message: impl Into<String>) -> ApiResponse<serde_json::Value> {
    ApiResponse::fail(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_shape() {
        let response = ok("login success", "token123");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["code"], 0);
        assert_eq!(json["message"], "login success");
        assert_eq!(json["data"], "token123");
    }

    #[test]
    fn failure_omits_data() {
        let response = fail("auth fail");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["code"], 1);
        assert!(json.get("data").is_none());
    }
}
