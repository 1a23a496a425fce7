//! `/user/*` handlers.

use crate::middleware::AuthUser;
use crate::response::{fail, ok, ok_empty, ApiResponse};
use crate::state::AppState;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use weft_core::CODE_OK;

#[derive(Debug, Deserialize)]
pub struct FormLogin {
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "passWord")]
    pub password: String,
}

pub async fn login(State(state): State<AppState>, Json(form): Json<FormLogin>) -> Response {
    if form.user_name.is_empty() || form.password.is_empty() {
        return fail("userName and passWord are required").into_response();
    }

    match state.directory().login(&form.user_name, &form.password).await {
        Ok(reply) if reply.code == CODE_OK && !reply.auth_token.is_empty() => {
            ok("login success", reply.auth_token).into_response()
        }
        Ok(_) => fail("auth fail").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "login rpc failed");
            fail("login fail").into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FormRegister {
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "passWord")]
    pub password: String,
}

pub async fn register(State(state): State<AppState>, Json(form): Json<FormRegister>) -> Response {
    if form.user_name.is_empty() || form.password.is_empty() {
        return fail("userName and passWord are required").into_response();
    }

    match state
        .directory()
        .register(&form.user_name, &form.password)
        .await
    {
        Ok(reply) if reply.code == CODE_OK && !reply.auth_token.is_empty() => {
            ok("register success", reply.auth_token).into_response()
        }
        Ok(_) => fail("register fail: name already exists").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "register rpc failed");
            fail("register fail").into_response()
        }
    }
}

/// The middleware already validated the token; echo the identity back.
pub async fn check_auth(Extension(auth): Extension<AuthUser>) -> ApiResponse<serde_json::Value> {
    ok(
        "auth success",
        serde_json::json!({
            "userId": auth.user_id,
            "userName": auth.user_name,
        }),
    )
}

pub async fn logout(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> Response {
    // Local invalidation first: the cached entry must not outlive the
    // session.
    state.token_cache().delete(&auth.auth_token);

    match state.directory().logout(&auth.auth_token).await {
        Ok(reply) if reply.code == CODE_OK => ok_empty("logout ok").into_response(),
        Ok(_) => fail("logout fail").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "logout rpc failed");
            fail("logout fail").into_response()
        }
    }
}
