//! `/push/history/*` handlers: bounded history pagination.

use crate::middleware::AuthUser;
use crate::response::{fail, ok};
use crate::state::AppState;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use weft_core::proto::{RoomHistoryRequest, SingleHistoryRequest};
use weft_core::CODE_OK;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSingleHistory {
    pub other_user_id: i64,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

pub async fn single_history(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(form): Json<FormSingleHistory>,
) -> Response {
    if form.other_user_id <= 0 {
        return fail("otherUserId is required").into_response();
    }

    let request = SingleHistoryRequest {
        current_user_id: auth.user_id,
        other_user_id: form.other_user_id,
        limit: form.limit,
        offset: form.offset,
    };

    match state.directory().single_history(&request).await {
        Ok(reply) if reply.code == CODE_OK => ok("ok", reply.messages).into_response(),
        Ok(_) => fail("get history fail").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "single history rpc failed");
            fail("get history fail").into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRoomHistory {
    pub room_id: i64,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

pub async fn room_history(
    State(state): State<AppState>,
    Json(form): Json<FormRoomHistory>,
) -> Response {
    if form.room_id <= 0 {
        return fail("roomId is required").into_response();
    }

    let request = RoomHistoryRequest {
        room_id: form.room_id,
        limit: form.limit,
        offset: form.offset,
    };

    match state.directory().room_history(&request).await {
        Ok(reply) if reply.code == CODE_OK => ok("ok", reply.messages).into_response(),
        Ok(_) => fail("get history fail").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "room history rpc failed");
            fail("get history fail").into_response()
        }
    }
}
