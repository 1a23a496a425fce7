//! RPC surface of the directory: maps wire methods onto
//! [`DirectoryService`] calls.
//!
//! User-facing failures (bad credentials, invalid tokens, validation)
//! surface as replies with `code = 1`; infrastructure failures become
//! transport-level errors so callers can tell the two apart.

use crate::service::DirectoryService;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use weft_common::AppError;
use weft_core::proto::{
    CheckAuthRequest, CodeReply, ConnectReply, ConnectRequest, DisconnectRequest,
    GetUserInfoRequest, HistoryReply, LoginRequest, LogoutRequest, RegisterRequest,
    RoomHistoryRequest, Send, SingleHistoryRequest, TokenReply, UserInfoReply,
};
use weft_core::{CODE_FAIL, CODE_OK};
use weft_rpc::{RpcError, RpcService};

pub struct DirectoryRpc {
    service: Arc<DirectoryService>,
}

impl DirectoryRpc {
    #[must_use]
    pub fn new(service: Arc<DirectoryService>) -> Self {
        Self { service }
    }
}

fn parse<T: DeserializeOwned>(params: Value) -> Result<T, RpcError> {
    serde_json::from_value(params).map_err(|e| RpcError::BadParams(e.to_string()))
}

fn reply<T: serde::Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::Internal(e.to_string()))
}

/// Whether an error belongs in a coded reply rather than a transport
/// failure.
fn is_user_facing(err: &AppError) -> bool {
    matches!(
        err,
        AppError::InvalidCredentials
            | AppError::InvalidToken
            | AppError::Validation(_)
            | AppError::NotFound(_)
            | AppError::AlreadyExists(_)
    )
}

fn infra(err: AppError) -> RpcError {
    RpcError::Internal(err.to_string())
}

#[async_trait]
impl RpcService for DirectoryRpc {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "Login" => {
                let req: LoginRequest = parse(params)?;
                match self.service.login(&req.name, &req.password).await {
                    Ok(token) => reply(TokenReply {
                        code: CODE_OK,
                        auth_token: token,
                    }),
                    Err(e) if is_user_facing(&e) => reply(TokenReply {
                        code: CODE_FAIL,
                        auth_token: String::new(),
                    }),
                    Err(e) => Err(infra(e)),
                }
            }
            "Register" => {
                let req: RegisterRequest = parse(params)?;
                match self.service.register(&req.name, &req.password).await {
                    Ok(token) => reply(TokenReply {
                        code: CODE_OK,
                        auth_token: token,
                    }),
                    Err(e) if is_user_facing(&e) => reply(TokenReply {
                        code: CODE_FAIL,
                        auth_token: String::new(),
                    }),
                    Err(e) => Err(infra(e)),
                }
            }
            "CheckAuth" => {
                let req: CheckAuthRequest = parse(params)?;
                match self.service.check_auth(&req.auth_token).await {
                    Ok(info) => reply(UserInfoReply {
                        code: CODE_OK,
                        user_id: info.user_id,
                        user_name: info.user_name,
                    }),
                    Err(e) if is_user_facing(&e) => reply(UserInfoReply {
                        code: CODE_FAIL,
                        user_id: 0,
                        user_name: String::new(),
                    }),
                    Err(e) => Err(infra(e)),
                }
            }
            "Logout" => {
                let req: LogoutRequest = parse(params)?;
                match self.service.logout(&req.auth_token).await {
                    Ok(()) => reply(CodeReply { code: CODE_OK }),
                    Err(e) if is_user_facing(&e) => reply(CodeReply { code: CODE_FAIL }),
                    Err(e) => Err(infra(e)),
                }
            }
            "GetUserInfoByUserId" => {
                let req: GetUserInfoRequest = parse(params)?;
                match self.service.get_user_info(req.user_id).await {
                    Ok(info) => reply(UserInfoReply {
                        code: CODE_OK,
                        user_id: info.user_id,
                        user_name: info.user_name,
                    }),
                    Err(e) if is_user_facing(&e) => reply(UserInfoReply {
                        code: CODE_FAIL,
                        user_id: 0,
                        user_name: String::new(),
                    }),
                    Err(e) => Err(infra(e)),
                }
            }
            "Connect" => {
                let req: ConnectRequest = parse(params)?;
                match self.service.connect(&req).await {
                    Ok(user_id) => reply(ConnectReply { user_id }),
                    // The gateway treats userId = 0 as an invalid token.
                    Err(e) if is_user_facing(&e) => reply(ConnectReply { user_id: 0 }),
                    Err(e) => Err(infra(e)),
                }
            }
            "Disconnect" => {
                let req: DisconnectRequest = parse(params)?;
                match self.service.disconnect(req.room_id, req.user_id).await {
                    Ok(_) => reply(CodeReply { code: CODE_OK }),
                    Err(e) if is_user_facing(&e) => reply(CodeReply { code: CODE_FAIL }),
                    Err(e) => Err(infra(e)),
                }
            }
            "Push" => {
                let send: Send = parse(params)?;
                match self.service.push(&send).await {
                    Ok(_) => reply(CodeReply { code: CODE_OK }),
                    Err(e) if is_user_facing(&e) => reply(CodeReply { code: CODE_FAIL }),
                    Err(e) => Err(infra(e)),
                }
            }
            "PushRoom" => {
                let send: Send = parse(params)?;
                match self.service.push_room(&send).await {
                    Ok(_) => reply(CodeReply { code: CODE_OK }),
                    Err(e) if is_user_facing(&e) => reply(CodeReply { code: CODE_FAIL }),
                    Err(e) => Err(infra(e)),
                }
            }
            "Count" => {
                let send: Send = parse(params)?;
                match self.service.count(send.room_id).await {
                    Ok(_) => reply(CodeReply { code: CODE_OK }),
                    Err(e) if is_user_facing(&e) => reply(CodeReply { code: CODE_FAIL }),
                    Err(e) => Err(infra(e)),
                }
            }
            "GetRoomInfo" => {
                let send: Send = parse(params)?;
                match self.service.room_info(send.room_id).await {
                    Ok(_) => reply(CodeReply { code: CODE_OK }),
                    Err(e) if is_user_facing(&e) => reply(CodeReply { code: CODE_FAIL }),
                    Err(e) => Err(infra(e)),
                }
            }
            "GetSingleChatHistory" => {
                let req: SingleHistoryRequest = parse(params)?;
                match self
                    .service
                    .single_history(req.current_user_id, req.other_user_id, req.limit, req.offset)
                    .await
                {
                    // An empty conversation is an empty list, not an error.
                    Ok(messages) => reply(HistoryReply {
                        code: CODE_OK,
                        messages,
                    }),
                    Err(e) if is_user_facing(&e) => reply(HistoryReply {
                        code: CODE_FAIL,
                        messages: Vec::new(),
                    }),
                    Err(e) => Err(infra(e)),
                }
            }
            "GetRoomHistory" => {
                let req: RoomHistoryRequest = parse(params)?;
                match self
                    .service
                    .room_history(req.room_id, req.limit, req.offset)
                    .await
                {
                    Ok(messages) => reply(HistoryReply {
                        code: CODE_OK,
                        messages,
                    }),
                    Err(e) if is_user_facing(&e) => reply(HistoryReply {
                        code: CODE_FAIL,
                        messages: Vec::new(),
                    }),
                    Err(e) => Err(infra(e)),
                }
            }
            other => Err(RpcError::UnknownMethod(other.to_string())),
        }
    }
}
