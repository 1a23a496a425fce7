//! Serialised envelope publisher.
//!
//! All publishes in a process go through one managed connection behind a
//! mutex, so envelopes under the same routing key are appended in call
//! order.

use crate::{stream_key, QueueResult, PAYLOAD_FIELD};
use redis::aio::ConnectionManager;
use redis::streams::StreamMaxlen;
use redis::AsyncCommands;
use tokio::sync::Mutex;
use weft_core::RouteMsg;

pub struct QueuePublisher {
    conn: Mutex<ConnectionManager>,
    max_len: usize,
}

impl QueuePublisher {
    /// Connect the publisher. The managed connection re-dials on its own
    /// after broker restarts.
    pub async fn connect(redis_url: &str, max_len: usize) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!(max_len, "queue publisher connected");
        Ok(Self {
            conn: Mutex::new(conn),
            max_len,
        })
    }

    /// Publish an envelope under its routing key. Returns the stream entry
    /// id.
    pub async fn publish(&self, routing_key: &str, envelope: &RouteMsg) -> QueueResult<String> {
        let payload = serde_json::to_string(envelope)?;
        let stream = stream_key(routing_key);

        let mut conn = self.conn.lock().await;
        let id: String = conn
            .xadd_maxlen(
                &stream,
                StreamMaxlen::Approx(self.max_len),
                "*",
                &[(PAYLOAD_FIELD, payload.as_str())],
            )
            .await?;
        drop(conn);

        tracing::debug!(stream = %stream, entry = %id, op = envelope.op, "envelope published");
        Ok(id)
    }
}

impl std::fmt::Debug for QueuePublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuePublisher")
            .field("max_len", &self.max_len)
            .finish()
    }
}
