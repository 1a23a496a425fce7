//! The gateway core: sharded buckets, admission control, and fan-out.

use crate::bucket::{Bucket, PushOutcome};
use crate::channel::Channel;
use crate::operator::Operator;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Socket-level tuning, shared by the WebSocket and TCP listeners.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub write_wait: Duration,
    pub pong_wait: Duration,
    pub ping_period: Duration,
    pub max_message_size: usize,
    pub broadcast_size: usize,
    pub max_connections: i64,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            write_wait: Duration::from_secs(10),
            pong_wait: Duration::from_secs(60),
            ping_period: Duration::from_secs(54),
            max_message_size: 512,
            broadcast_size: 512,
            max_connections: 10_000,
        }
    }
}

pub struct GatewayServer {
    buckets: Vec<Bucket>,
    options: ServerOptions,
    operator: Arc<dyn Operator>,
    server_id: String,
    active: AtomicI64,
}

impl GatewayServer {
    #[must_use]
    pub fn new(
        bucket_count: usize,
        options: ServerOptions,
        operator: Arc<dyn Operator>,
        server_id: impl Into<String>,
    ) -> Arc<Self> {
        assert!(bucket_count > 0, "at least one bucket is required");
        Arc::new(Self {
            buckets: (0..bucket_count).map(Bucket::new).collect(),
            options,
            operator,
            server_id: server_id.into(),
            active: AtomicI64::new(0),
        })
    }

    #[must_use]
    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    #[must_use]
    pub fn operator(&self) -> &Arc<dyn Operator> {
        &self.operator
    }

    #[must_use]
    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// The shard index for a user. Stable for the whole process lifetime,
    /// so a channel never migrates buckets.
    #[must_use]
    pub fn bucket_index(&self, user_id: i64) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        user_id.hash(&mut hasher);
        (hasher.finish() % self.buckets.len() as u64) as usize
    }

    #[must_use]
    pub fn bucket(&self, user_id: i64) -> &Bucket {
        &self.buckets[self.bucket_index(user_id)]
    }

    /// Admission control: reserve a connection slot, refusing above the
    /// cap.
    pub fn try_acquire(&self) -> bool {
        if self.active.fetch_add(1, Ordering::AcqRel) >= self.options.max_connections {
            self.active.fetch_sub(1, Ordering::AcqRel);
            return false;
        }
        true
    }

    /// Release a slot reserved by [`GatewayServer::try_acquire`].
    pub fn release(&self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }

    #[must_use]
    pub fn active_connections(&self) -> i64 {
        self.active.load(Ordering::Acquire)
    }

    /// Register an authenticated socket into its bucket. Any prior channel
    /// for the user is closed by the bucket.
    pub fn register(
        &self,
        user_id: i64,
        room_id: i64,
        sender: mpsc::Sender<String>,
        done: CancellationToken,
    ) -> Arc<Channel> {
        let channel = Arc::new(Channel::new(user_id, room_id, sender, done));
        if let Some(evicted) = self.bucket(user_id).put(channel.clone()) {
            tracing::debug!(
                user_id,
                room_id = evicted.room_id(),
                "prior channel replaced by re-registration"
            );
        }
        channel
    }

    /// Remove a channel. Returns whether it was still current (stale
    /// channels skip the directory disconnect).
    pub fn unregister(&self, channel: &Arc<Channel>) -> bool {
        self.bucket(channel.user_id()).delete_channel(channel)
    }

    /// Offer a frame to one user.
    pub fn push_single(&self, user_id: i64, frame: String) -> PushOutcome {
        self.bucket(user_id).push_single(user_id, frame)
    }

    /// Offer a frame to every member of a room, bucket by bucket. No
    /// global lock is taken.
    pub fn push_room(&self, room_id: i64, frame: &str) -> usize {
        self.buckets
            .iter()
            .map(|bucket| bucket.push_room(room_id, frame))
            .sum()
    }

    /// Members of a room on this gateway.
    #[must_use]
    pub fn room_count(&self, room_id: i64) -> usize {
        self.buckets.iter().map(|b| b.room_count(room_id)).sum()
    }
}

impl std::fmt::Debug for GatewayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayServer")
            .field("server_id", &self.server_id)
            .field("buckets", &self.buckets.len())
            .field("active", &self.active_connections())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::{Operator, OperatorError};
    use async_trait::async_trait;
    use weft_core::proto::ConnectRequest;

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

    fn server(max_connections: i64) -> Arc<GatewayServer> {
        GatewayServer::new(
            8,
            ServerOptions {
                max_connections,
                ..Default::default()
            },
            Arc::new(NullOperator),
            "connect-test",
        )
    }

    fn register(server: &GatewayServer, user_id: i64, room_id: i64) -> Arc<Channel> {
        let (tx, rx) = mpsc::channel(8);
        // Keep receivers alive for the test's duration.
        std::mem::forget(rx);
        server.register(user_id, room_id, tx, CancellationToken::new())
    }

    #[tokio::test]
    async fn bucket_index_is_stable_and_in_range() {
        let server = server(100);
        for user_id in [1_i64, 42, 9_999_999, i64::MAX] {
            let first = server.bucket_index(user_id);
            assert!(first < 8);
            assert_eq!(first, server.bucket_index(user_id));
        }
    }

    #[tokio::test]
    async fn admission_refuses_above_cap() {
        let server = server(2);
        assert!(server.try_acquire());
        assert!(server.try_acquire());
        // The (max+1)-th socket is refused.
        assert!(!server.try_acquire());
        server.release();
        assert!(server.try_acquire());
    }

    #[tokio::test]
    async fn room_fanout_spans_buckets() {
        let server = server(100);
        let mut receivers = Vec::new();
        for user_id in 1..=20 {
            let (tx, rx) = mpsc::channel(8);
            receivers.push(rx);
            server.register(user_id, 7, tx, CancellationToken::new());
        }

        assert_eq!(server.room_count(7), 20);
        assert_eq!(server.push_room(7, "hello"), 20);
        for rx in &mut receivers {
            assert_eq!(rx.recv().await.unwrap(), "hello");
        }
    }

    #[tokio::test]
    async fn reregistration_keeps_one_channel_per_user() {
        let server = server(100);
        let old = register(&server, 1, 7);
        let new = register(&server, 1, 7);

        assert!(old.is_closed());
        assert!(!new.is_closed());
        assert_eq!(server.room_count(7), 1);

        // Stale cleanup does not disturb the live registration.
        assert!(!server.unregister(&old));
        assert_eq!(server.room_count(7), 1);
        assert!(server.unregister(&new));
        assert_eq!(server.room_count(7), 0);
    }
}
