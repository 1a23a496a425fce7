//! Session-check middleware.
//!
//! Every protected route carries an `authToken` field in its JSON body.
//! The middleware buffers the body, resolves the token (local cache first,
//! directory on miss), stashes the request-scoped identity as an
//! extension, and restores the body for the handler's own extraction.

use crate::response::fail;
use crate::state::AppState;
use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

/// Largest JSON body a protected route accepts.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Request-scoped identity resolved from the session token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub user_name: String,
    pub auth_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenField {
    #[serde(default)]
    auth_token: String,
}

pub async fn session_check(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return fail("request body too large").into_response(),
    };

    let token = match extract_token(&bytes) {
        Some(token) => token,
        None => return fail("authToken is required").into_response(),
    };

    let Some((user_id, user_name)) = state.resolve_token(&token).await else {
        return fail("auth fail").into_response();
    };

    parts.extensions.insert(AuthUser {
        user_id,
        user_name,
        auth_token: token,
    });

    let request = Request::from_parts(parts, Body::from(bytes));
    next.run(request).await
}

fn extract_token(bytes: &Bytes) -> Option<String> {
    let field: TokenField = serde_json::from_slice(bytes).ok()?;
    if field.auth_token.is_empty() {
        None
    } else {
        Some(field.auth_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_extraction() {
        let body = Bytes::from(r#"{"authToken":"abc","roomId":1}"#);
        assert_eq!(extract_token(&body), Some("abc".to_string()));

        let missing = Bytes::from(r#"{"roomId":1}"#);
        assert_eq!(extract_token(&missing), None);

        let invalid = Bytes::from("not json");
        assert_eq!(extract_token(&invalid), None);
    }
}
