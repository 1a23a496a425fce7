//! Queue consumers: one consumer group per queue, reading every stream the
//! queue is bound to.
//!
//! A consumer drains its pending list first (entries delivered before a
//! crash or disconnect and never acknowledged), then block-reads new
//! entries with the configured prefetch. Acknowledgement happens only after
//! the handler returns success; a handler error leaves the entry pending
//! and it is redelivered on the next (re)connect. Consumer names must be
//! stable per service instance for the pending drain to find prior
//! deliveries.

use crate::{routing_key_of, stream_key, Binding, QueueError, QueueResult, PAYLOAD_FIELD};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use weft_core::RouteMsg;

/// Block timeout for each group read.
const BLOCK_MS: usize = 5_000;

/// Downstream processing of one envelope.
#[async_trait]
pub trait EnvelopeHandler: Send + Sync {
    /// Process an envelope delivered under `routing_key`. Returning an
    /// error leaves the entry unacknowledged for redelivery.
    async fn handle(&self, routing_key: &str, envelope: RouteMsg) -> QueueResult<()>;
}

pub struct QueueConsumer {
    client: redis::Client,
    group: String,
    streams: Vec<String>,
    consumer_name: String,
    prefetch: usize,
    reconnect_delay: Duration,
}

impl QueueConsumer {
    pub fn new(
        redis_url: &str,
        binding: Binding,
        consumer_name: impl Into<String>,
        prefetch: usize,
        reconnect_delay: Duration,
    ) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            group: binding.queue.to_string(),
            streams: binding.keys.iter().map(|key| stream_key(key)).collect(),
            consumer_name: consumer_name.into(),
            prefetch,
            reconnect_delay,
        })
    }

    /// Supervisor loop: consume until an error, then back off and redial.
    /// Returns when `shutdown` fires.
    pub async fn run<H: EnvelopeHandler + 'static>(
        &self,
        handler: Arc<H>,
        shutdown: CancellationToken,
    ) {
        loop {
            if shutdown.is_cancelled() {
                return;
            }

            if let Err(e) = self.consume(handler.as_ref(), &shutdown).await {
                tracing::warn!(
                    queue = %self.group,
                    error = %e,
                    delay_ms = self.reconnect_delay.as_millis() as u64,
                    "consumer lost its connection, reconnecting"
                );
            }

            tokio::select! {
                () = shutdown.cancelled() => return,
                () = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }

    /// One connection's lifetime: declare, drain pending, then follow new
    /// entries. Any redis error propagates to the supervisor.
    async fn consume<H: EnvelopeHandler>(
        &self,
        handler: &H,
        shutdown: &CancellationToken,
    ) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        self.ensure_groups(&mut conn).await?;
        tracing::info!(queue = %self.group, streams = ?self.streams, "consuming");

        // Entries delivered to this consumer before a restart.
        loop {
            let delivered = self.read_batch(&mut conn, handler, "0").await?;
            if delivered == 0 {
                break;
            }
            tracing::info!(queue = %self.group, redelivered = delivered, "pending entries replayed");
        }

        loop {
            if shutdown.is_cancelled() {
                return Ok(());
            }
            tokio::select! {
                () = shutdown.cancelled() => return Ok(()),
                read = self.read_batch(&mut conn, handler, ">") => {
                    read?;
                }
            }
        }
    }

    /// Idempotently declare each stream and the consumer group on it.
    async fn ensure_groups(&self, conn: &mut MultiplexedConnection) -> QueueResult<()> {
        for stream in &self.streams {
            let created: Result<(), redis::RedisError> = redis::cmd("XGROUP")
                .arg("CREATE")
                .arg(stream)
                .arg(&self.group)
                .arg("0")
                .arg("MKSTREAM")
                .query_async(conn)
                .await;

            match created {
                Ok(()) => {}
                // Group already declared by a previous run.
                Err(e) if e.to_string().contains("BUSYGROUP") => {}
                Err(e) => return Err(QueueError::Redis(e)),
            }
        }
        Ok(())
    }

    /// Read one batch with the given start id (`"0"` = pending, `">"` =
    /// new), dispatch each entry, ack successes. Returns how many entries
    /// the batch carried.
    async fn read_batch<H: EnvelopeHandler>(
        &self,
        conn: &mut MultiplexedConnection,
        handler: &H,
        start_id: &str,
    ) -> QueueResult<usize> {
        let opts = StreamReadOptions::default()
            .group(&self.group, &self.consumer_name)
            .count(self.prefetch)
            .block(BLOCK_MS);
        let ids: Vec<&str> = self.streams.iter().map(|_| start_id).collect();

        let reply: StreamReadReply = conn.xread_options(&self.streams, &ids, &opts).await?;

        let mut total = 0;
        for stream in reply.keys {
            let routing_key = routing_key_of(&stream.key).unwrap_or(&stream.key).to_string();
            for entry in stream.ids {
                total += 1;

                let envelope = match entry
                    .map
                    .get(PAYLOAD_FIELD)
                    .ok_or_else(|| QueueError::Handler("missing payload field".into()))
                    .and_then(|value| {
                        redis::from_redis_value::<String>(value).map_err(QueueError::Redis)
                    })
                    .and_then(|payload| {
                        serde_json::from_str::<RouteMsg>(&payload).map_err(QueueError::Decode)
                    }) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        // Poison entry: ack it away rather than loop forever.
                        tracing::error!(
                            queue = %self.group,
                            entry = %entry.id,
                            error = %e,
                            "dropping undecodable envelope"
                        );
                        conn.xack::<_, _, _, ()>(&stream.key, &self.group, &[&entry.id])
                            .await?;
                        continue;
                    }
                };

                match handler.handle(&routing_key, envelope).await {
                    Ok(()) => {
                        conn.xack::<_, _, _, ()>(&stream.key, &self.group, &[&entry.id])
                            .await?;
                    }
                    Err(e) => {
                        tracing::warn!(
                            queue = %self.group,
                            entry = %entry.id,
                            error = %e,
                            "handler failed, leaving entry pending"
                        );
                    }
                }
            }
        }

        Ok(total)
    }
}

impl std::fmt::Debug for QueueConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueConsumer")
            .field("group", &self.group)
            .field("streams", &self.streams)
            .field("consumer", &self.consumer_name)
            .finish()
    }
}
