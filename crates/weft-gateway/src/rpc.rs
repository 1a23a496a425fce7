//! The gateway's RPC surface, called by the dispatcher.
//!
//! Clients receive the push's `body` verbatim; the `Msg` wrapper stays
//! between the dispatcher and the gateway.

use crate::server::GatewayServer;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use weft_core::proto::{CodeReply, PushMsgRequest, PushRoomMsgRequest};
use weft_core::CODE_OK;
use weft_rpc::{RpcError, RpcService};

pub struct GatewayRpc {
    server: Arc<GatewayServer>,
}

impl GatewayRpc {
    #[must_use]
    pub fn new(server: Arc<GatewayServer>) -> Self {
        Self { server }
    }

    fn frame_of(body: &Value) -> Result<String, RpcError> {
        serde_json::to_string(body).map_err(|e| RpcError::Internal(e.to_string()))
    }

    fn ok() -> Result<Value, RpcError> {
        serde_json::to_value(CodeReply { code: CODE_OK })
            .map_err(|e| RpcError::Internal(e.to_string()))
    }
}

fn parse<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, RpcError> {
    serde_json::from_value(params).map_err(|e| RpcError::BadParams(e.to_string()))
}

#[async_trait]
impl RpcService for GatewayRpc {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "PushSingleMsg" => {
                let req: PushMsgRequest = parse(params)?;
                let outcome = self
                    .server
                    .push_single(req.user_id, Self::frame_of(&req.msg.body)?);
                tracing::debug!(user_id = req.user_id, ?outcome, "single push");
                Self::ok()
            }
            "PushRoomMsg" | "PushRoomCount" | "PushRoomInfo" => {
                let req: PushRoomMsgRequest = parse(params)?;
                let delivered = self
                    .server
                    .push_room(req.room_id, &Self::frame_of(&req.msg.body)?);
                tracing::debug!(room_id = req.room_id, delivered, method, "room push");
                Self::ok()
            }
            other => Err(RpcError::UnknownMethod(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::{Operator, OperatorError};
    use crate::server::{GatewayServer, ServerOptions};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;
    use weft_core::proto::ConnectRequest;
    use weft_core::{Msg, Op, Snowflake};

    struct NullOperator;

    #[async_trait]
    impl Operator for NullOperator {
        async fn connect(&self, _req: &ConnectRequest) -> Result<i64, OperatorError> {
            Ok(1)
        }

        async fn disconnect(&self, _room_id: i64, _user_id: i64) -> Result<(), OperatorError> {
            Ok(())
        }
    }

    fn rpc_with_member(user_id: i64, room_id: i64) -> (GatewayRpc, mpsc::Receiver<String>) {
        let server = GatewayServer::new(
            4,
            ServerOptions::default(),
            Arc::new(NullOperator),
            "connect-test",
        );
        let (tx, rx) = mpsc::channel(8);
        server.register(user_id, room_id, tx, CancellationToken::new());
        (GatewayRpc::new(server), rx)
    }

    #[tokio::test]
    async fn push_single_writes_the_body_to_the_socket() {
        let (rpc, mut rx) = rpc_with_member(5, 1);
        let req = PushMsgRequest {
            user_id: 5,
            msg: Msg::new(
                Op::SingleSend,
                Snowflake::new(1),
                serde_json::json!({"msg": "hi", "fromUserName": "alice"}),
            ),
        };
        let params = serde_json::to_value(&req).unwrap();

        rpc.call("PushSingleMsg", params).await.unwrap();
        let frame = rx.recv().await.unwrap();
        let body: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(body["msg"], "hi");
        assert_eq!(body["fromUserName"], "alice");
    }

    #[tokio::test]
    async fn push_room_reaches_room_members() {
        let (rpc, mut rx) = rpc_with_member(5, 7);
        let req = PushRoomMsgRequest {
            room_id: 7,
            msg: Msg::new(Op::RoomSend, Snowflake::new(2), serde_json::json!({"msg": "hello"})),
        };

        rpc.call("PushRoomMsg", serde_json::to_value(&req).unwrap())
            .await
            .unwrap();
        assert!(rx.recv().await.unwrap().contains("hello"));

        // A different room does not leak here.
        let other = PushRoomMsgRequest {
            room_id: 8,
            msg: Msg::new(Op::RoomSend, Snowflake::new(3), serde_json::json!({"msg": "nope"})),
        };
        rpc.call("PushRoomMsg", serde_json::to_value(&other).unwrap())
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unknown_method_is_rejected() {
        let (rpc, _rx) = rpc_with_member(5, 7);
        assert!(matches!(
            rpc.call("Nope", Value::Null).await,
            Err(RpcError::UnknownMethod(_))
        ));
    }
}
