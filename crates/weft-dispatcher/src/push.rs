//! Envelope routing: queue deliveries become gateway RPC pushes.
//!
//! Per-envelope delivery failures are logged and the entry is still
//! acknowledged; messages are fire-and-forget once they leave the queue.
//! Only returning an error from the handler (never done here for delivery
//! faults) would hold an entry for redelivery.

use crate::coalesce::{RoomInfoCoalescer, Snapshot};
use async_trait::async_trait;
use std::sync::Arc;
use weft_cache::RoomRosterStore;
use weft_core::proto::{CodeReply, PushMsgRequest, PushRoomMsgRequest};
use weft_core::{Msg, Op, RoomCountBody, RoomInfoBody, RouteMsg, Snowflake, SnowflakeGenerator};
use weft_queue::{EnvelopeHandler, QueueError, QueueResult, KEY_ROOM_COUNT, KEY_ROOM_INFO, KEY_ROOM_SEND, KEY_SINGLE_SEND};
use weft_rpc::RpcRegistry;

pub struct Pusher {
    registry: Arc<RpcRegistry>,
    roster: RoomRosterStore,
    coalescer: Arc<RoomInfoCoalescer>,
    snowflake: Arc<SnowflakeGenerator>,
}

impl Pusher {
    #[must_use]
    pub fn new(
        registry: Arc<RpcRegistry>,
        roster: RoomRosterStore,
        coalescer: Arc<RoomInfoCoalescer>,
        snowflake: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            registry,
            roster,
            coalescer,
            snowflake,
        }
    }

    /// The envelope's sequence id, falling back to a fresh one for
    /// envelopes from publishers that did not stamp one.
    fn seq_id(&self, envelope: &RouteMsg) -> Snowflake {
        if envelope.seq_id.is_zero() {
            self.snowflake.generate()
        } else {
            envelope.seq_id
        }
    }

    /// Deliver to the single gateway hosting the target user.
    async fn push_single(&self, envelope: RouteMsg) -> QueueResult<()> {
        let entry = match self
            .roster
            .get(envelope.room_id, envelope.to_user_id)
            .await
        {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                tracing::debug!(
                    user_id = envelope.to_user_id,
                    room_id = envelope.room_id,
                    "recipient not in roster, dropping"
                );
                return Ok(());
            }
            Err(e) => {
                // Roster unavailable: hold the entry for redelivery.
                return Err(QueueError::Handler(e.to_string()));
            }
        };

        let request = PushMsgRequest {
            user_id: envelope.to_user_id,
            msg: Msg::new(Op::SingleSend, self.seq_id(&envelope), envelope.msg),
        };

        let client = match self.registry.client_by_server_id(&entry.server_id) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(server_id = %entry.server_id, error = %e, "no gateway client");
                return Ok(());
            }
        };

        if let Err(e) = client.call::<_, CodeReply>("PushSingleMsg", &request).await {
            tracing::warn!(
                user_id = envelope.to_user_id,
                server_id = %entry.server_id,
                error = %e,
                "single push failed"
            );
        }
        Ok(())
    }

    /// Broadcast one request to every known gateway, logging individual
    /// failures.
    async fn broadcast(&self, method: &str, request: &PushRoomMsgRequest) {
        let clients = self.registry.all_gateway_clients();
        if clients.is_empty() {
            tracing::warn!(method, room_id = request.room_id, "no gateways to broadcast to");
            return;
        }
        for client in clients {
            if let Err(e) = client.call::<_, CodeReply>(method, request).await {
                tracing::warn!(
                    method,
                    room_id = request.room_id,
                    addr = %client.addr(),
                    error = %e,
                    "broadcast push failed"
                );
            }
        }
    }

    async fn push_room(&self, envelope: RouteMsg) -> QueueResult<()> {
        let request = PushRoomMsgRequest {
            room_id: envelope.room_id,
            msg: Msg::new(Op::RoomSend, self.seq_id(&envelope), envelope.msg),
        };
        self.broadcast("PushRoomMsg", &request).await;
        Ok(())
    }

    async fn push_room_count(&self, envelope: RouteMsg) -> QueueResult<()> {
        let body = RoomCountBody {
            room_id: envelope.room_id,
            count: envelope.count,
            op: Op::RoomCountSend.code(),
        };
        let body = serde_json::to_value(&body)?;
        let request = PushRoomMsgRequest {
            room_id: envelope.room_id,
            msg: Msg::new(Op::RoomCountSend, self.seq_id(&envelope), body),
        };
        self.broadcast("PushRoomCount", &request).await;
        Ok(())
    }

    /// Coalesced path: actual broadcasting happens in
    /// [`Pusher::broadcast_room_info`] when the coalescer flushes.
    async fn push_room_info(&self, envelope: RouteMsg) -> QueueResult<()> {
        self.coalescer
            .clone()
            .offer(envelope.room_id, envelope.room_user_info)
            .await;
        Ok(())
    }

    /// Sink for coalescer output.
    pub async fn broadcast_room_info(&self, room_id: i64, members: Snapshot) {
        let body = RoomInfoBody {
            room_id,
            count: members.len() as i64,
            op: Op::RoomInfoSend.code(),
            room_user_info: members,
        };
        let body = match serde_json::to_value(&body) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(room_id, error = %e, "unserializable room info");
                return;
            }
        };
        let request = PushRoomMsgRequest {
            room_id,
            msg: Msg::new(Op::RoomInfoSend, self.snowflake.generate(), body),
        };
        self.broadcast("PushRoomInfo", &request).await;
    }
}

#[async_trait]
impl EnvelopeHandler for Pusher {
    async fn handle(&self, routing_key: &str, envelope: RouteMsg) -> QueueResult<()> {
        tracing::debug!(routing_key, op = envelope.op, room_id = envelope.room_id, "envelope received");
        match routing_key {
            KEY_SINGLE_SEND => self.push_single(envelope).await,
            KEY_ROOM_SEND => self.push_room(envelope).await,
            KEY_ROOM_COUNT => self.push_room_count(envelope).await,
            KEY_ROOM_INFO => self.push_room_info(envelope).await,
            other => {
                tracing::error!(routing_key = other, "envelope on unexpected routing key");
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for Pusher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pusher").finish()
    }
}
