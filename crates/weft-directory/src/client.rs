//! Typed client for the directory RPC surface, used by the HTTP front-end
//! and the gateway operator.

use std::sync::Arc;
use weft_core::proto::{
    CheckAuthRequest, CodeReply, ConnectReply, ConnectRequest, DisconnectRequest,
    GetUserInfoRequest, HistoryReply, LoginRequest, LogoutRequest, RegisterRequest,
    RoomHistoryRequest, Send, SingleHistoryRequest, TokenReply, UserInfoReply,
};
use weft_rpc::{RpcClient, RpcError};

#[derive(Clone)]
pub struct DirectoryClient {
    rpc: Arc<RpcClient>,
}

impl DirectoryClient {
    #[must_use]
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self { rpc }
    }

    pub async fn login(&self, name: &str, password: &str) -> Result<TokenReply, RpcError> {
        self.rpc
            .call(
                "Login",
                &LoginRequest {
                    name: name.to_string(),
                    password: password.to_string(),
                },
            )
            .await
    }

    pub async fn register(&self, name: &str, password: &str) -> Result<TokenReply, RpcError> {
        self.rpc
            .call(
                "Register",
                &RegisterRequest {
                    name: name.to_string(),
                    password: password.to_string(),
                },
            )
            .await
    }

    pub async fn check_auth(&self, auth_token: &str) -> Result<UserInfoReply, RpcError> {
        self.rpc
            .call(
                "CheckAuth",
                &CheckAuthRequest {
                    auth_token: auth_token.to_string(),
                },
            )
            .await
    }

    pub async fn logout(&self, auth_token: &str) -> Result<CodeReply, RpcError> {
        self.rpc
            .call(
                "Logout",
                &LogoutRequest {
                    auth_token: auth_token.to_string(),
                },
            )
            .await
    }

    pub async fn get_user_info(&self, user_id: i64) -> Result<UserInfoReply, RpcError> {
        self.rpc
            .call("GetUserInfoByUserId", &GetUserInfoRequest { user_id })
            .await
    }

    pub async fn connect(&self, req: &ConnectRequest) -> Result<ConnectReply, RpcError> {
        self.rpc.call("Connect", req).await
    }

    pub async fn disconnect(&self, room_id: i64, user_id: i64) -> Result<CodeReply, RpcError> {
        self.rpc
            .call("Disconnect", &DisconnectRequest { room_id, user_id })
            .await
    }

    pub async fn push(&self, send: &Send) -> Result<CodeReply, RpcError> {
        self.rpc.call("Push", send).await
    }

    pub async fn push_room(&self, send: &Send) -> Result<CodeReply, RpcError> {
        self.rpc.call("PushRoom", send).await
    }

    pub async fn count(&self, room_id: i64) -> Result<CodeReply, RpcError> {
        let send = Send {
            room_id,
            op: weft_core::Op::RoomCountSend.code(),
            ..Default::default()
        };
        self.rpc.call("Count", &send).await
    }

    pub async fn room_info(&self, room_id: i64) -> Result<CodeReply, RpcError> {
        let send = Send {
            room_id,
            op: weft_core::Op::RoomInfoSend.code(),
            ..Default::default()
        };
        self.rpc.call("GetRoomInfo", &send).await
    }

    pub async fn single_history(
        &self,
        req: &SingleHistoryRequest,
    ) -> Result<HistoryReply, RpcError> {
        self.rpc.call("GetSingleChatHistory", req).await
    }

    pub async fn room_history(&self, req: &RoomHistoryRequest) -> Result<HistoryReply, RpcError> {
        self.rpc.call("GetRoomHistory", req).await
    }
}

impl std::fmt::Debug for DirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryClient").finish()
    }
}
