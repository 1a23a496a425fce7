//! # weft-queue
//!
//! The queue role on Redis Streams: a durable topic broker with per-queue
//! consumer groups, prefetch, manual acknowledgement, and at-least-once
//! delivery.
//!
//! Each routing key is one stream (`queue:{key}`); a queue is a consumer
//! group bound to one or more streams. Entries read but not acknowledged
//! stay in the group's pending list and are re-read when a consumer
//! restarts, which is what makes delivery at-least-once across crashes and
//! broker restarts.

pub mod consumer;
pub mod publisher;

pub use consumer::{EnvelopeHandler, QueueConsumer};
pub use publisher::QueuePublisher;

/// Routing keys.
pub const KEY_SINGLE_SEND: &str = "single_send";
pub const KEY_ROOM_SEND: &str = "room_send";
pub const KEY_ROOM_COUNT: &str = "room_count";
pub const KEY_ROOM_INFO: &str = "room_info";

/// Queue names (consumer groups).
pub const QUEUE_SINGLE: &str = "single_send";
pub const QUEUE_ROOM: &str = "room_send";
pub const QUEUE_META: &str = "meta";

/// Field under which the envelope JSON is stored in each stream entry.
pub(crate) const PAYLOAD_FIELD: &str = "payload";

/// A queue and the routing keys it is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub queue: &'static str,
    pub keys: &'static [&'static str],
}

/// The full binding table. `meta` coalesces both metadata keys into one
/// consumer.
pub const BINDINGS: &[Binding] = &[
    Binding {
        queue: QUEUE_SINGLE,
        keys: &[KEY_SINGLE_SEND],
    },
    Binding {
        queue: QUEUE_ROOM,
        keys: &[KEY_ROOM_SEND],
    },
    Binding {
        queue: QUEUE_META,
        keys: &[KEY_ROOM_COUNT, KEY_ROOM_INFO],
    },
];

/// Stream key for a routing key.
#[must_use]
pub fn stream_key(routing_key: &str) -> String {
    format!("queue:{routing_key}")
}

/// Routing key for a stream key, if it carries the expected prefix.
#[must_use]
pub fn routing_key_of(stream: &str) -> Option<&str> {
    stream.strip_prefix("queue:")
}

/// Error surface of the queue layer.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("envelope decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("handler error: {0}")]
    Handler(String),
}

pub type QueueResult<T> = Result<T, QueueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings_cover_every_routing_key() {
        let bound: Vec<&str> = BINDINGS.iter().flat_map(|b| b.keys.iter().copied()).collect();
        for key in [KEY_SINGLE_SEND, KEY_ROOM_SEND, KEY_ROOM_COUNT, KEY_ROOM_INFO] {
            assert!(bound.contains(&key), "routing key {key} must be bound");
        }
    }

    #[test]
    fn meta_queue_binds_both_metadata_keys() {
        let meta = BINDINGS.iter().find(|b| b.queue == QUEUE_META).unwrap();
        assert_eq!(meta.keys, &[KEY_ROOM_COUNT, KEY_ROOM_INFO]);
    }

    #[test]
    fn stream_keys_round_trip() {
        let stream = stream_key(KEY_ROOM_SEND);
        assert_eq!(stream, "queue:room_send");
        assert_eq!(routing_key_of(&stream), Some(KEY_ROOM_SEND));
        assert_eq!(routing_key_of("other:room_send"), None);
    }
}
