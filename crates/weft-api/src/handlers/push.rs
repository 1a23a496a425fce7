//! `/push/*` send handlers.

use crate::middleware::AuthUser;
use crate::response::{fail, ok_empty};
use crate::state::AppState;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use weft_core::proto::Send;
use weft_core::{ContentType, Op, CODE_OK};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormPush {
    pub msg: String,
    pub to_user_id: i64,
    pub room_id: i64,
    #[serde(default)]
    pub content_type: Option<ContentType>,
}

pub async fn push(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(form): Json<FormPush>,
) -> Response {
    if form.msg.is_empty() {
        return fail("msg is required").into_response();
    }
    if form.to_user_id <= 0 && form.room_id <= 0 {
        return fail("toUserId or roomId is required").into_response();
    }
    if form.to_user_id <= 0 {
        return fail("toUserId is required").into_response();
    }

    let to_user_name = match state.directory().get_user_info(form.to_user_id).await {
        Ok(reply) if reply.code == CODE_OK => reply.user_name,
        Ok(_) => return fail("unknown recipient").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "get user info rpc failed");
            return fail("push fail").into_response();
        }
    };

    let send = Send {
        msg: form.msg,
        from_user_id: auth.user_id,
        from_user_name: auth.user_name,
        to_user_id: form.to_user_id,
        to_user_name,
        room_id: form.room_id,
        op: Op::SingleSend.code(),
        content_type: Some(form.content_type.unwrap_or_default()),
        ..Default::default()
    };

    match state.directory().push(&send).await {
        Ok(reply) if reply.code == CODE_OK => ok_empty("ok").into_response(),
        Ok(_) => fail("push fail").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "push rpc failed");
            fail("push fail").into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRoom {
    pub msg: String,
    pub room_id: i64,
    #[serde(default)]
    pub content_type: Option<ContentType>,
}

pub async fn push_room(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(form): Json<FormRoom>,
) -> Response {
    if form.msg.is_empty() {
        return fail("msg is required").into_response();
    }
    if form.room_id <= 0 {
        return fail("roomId is required").into_response();
    }

    let send = Send {
        msg: form.msg,
        from_user_id: auth.user_id,
        from_user_name: auth.user_name,
        room_id: form.room_id,
        op: Op::RoomSend.code(),
        content_type: Some(form.content_type.unwrap_or_default()),
        ..Default::default()
    };

    match state.directory().push_room(&send).await {
        Ok(reply) if reply.code == CODE_OK => ok_empty("ok").into_response(),
        Ok(_) => fail("push room fail").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "push room rpc failed");
            fail("push room fail").into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRoomId {
    pub room_id: i64,
}

pub async fn count(State(state): State<AppState>, Json(form): Json<FormRoomId>) -> Response {
    if form.room_id <= 0 {
        return fail("roomId is required").into_response();
    }

    match state.directory().count(form.room_id).await {
        Ok(reply) if reply.code == CODE_OK => ok_empty("ok").into_response(),
        Ok(_) => fail("get room count fail").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "count rpc failed");
            fail("get room count fail").into_response()
        }
    }
}

pub async fn get_room_info(State(state): State<AppState>, Json(form): Json<FormRoomId>) -> Response {
    if form.room_id <= 0 {
        return fail("roomId is required").into_response();
    }

    match state.directory().room_info(form.room_id).await {
        Ok(reply) if reply.code == CODE_OK => ok_empty("ok").into_response(),
        Ok(_) => fail("get room info fail").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "room info rpc failed");
            fail("get room info fail").into_response()
        }
    }
}
