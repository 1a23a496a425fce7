//! Lock-striped shards of the gateway's socket map.
//!
//! Each bucket owns a `userId → Channel` map and the rooms those channels
//! belong to, behind its own lock. Ties between concurrent registration and
//! removal for the same user resolve by lock acquisition order: the later
//! `put` wins and closes the prior channel.

use crate::channel::{Channel, OfferError};
use crate::room::Room;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct Inner {
    channels: HashMap<i64, Arc<Channel>>,
    rooms: HashMap<i64, Room>,
}

pub struct Bucket {
    id: usize,
    inner: RwLock<Inner>,
}

/// Result of a single-recipient offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Delivered,
    /// No live channel for the user in this bucket.
    NotFound,
    /// The channel was slow or dead and has been evicted.
    Evicted,
}

impl Bucket {
    #[must_use]
    pub fn new(id: usize) -> Self {
        Self {
            id,
            inner: RwLock::new(Inner::default()),
        }
    }

    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Register a channel: atomically replaces any prior channel for the
    /// same user (closing it) and links the newcomer into its room.
    /// Returns the evicted channel, if any.
    pub fn put(&self, channel: Arc<Channel>) -> Option<Arc<Channel>> {
        let user_id = channel.user_id();
        let room_id = channel.room_id();

        let mut inner = self.inner.write();

        let evicted = inner.channels.insert(user_id, channel.clone());
        if let Some(old) = &evicted {
            if old.room_id() != 0 {
                let emptied = {
                    let room = inner.rooms.get_mut(&old.room_id());
                    room.map_or(false, |room| {
                        room.remove(old);
                        room.is_empty()
                    })
                };
                if emptied {
                    inner.rooms.remove(&old.room_id());
                }
            }
            old.close();
        }

        if room_id != 0 {
            inner
                .rooms
                .entry(room_id)
                .or_insert_with(|| Room::new(room_id))
                .put(channel);
        }

        evicted
    }

    /// Remove a channel if it is still the registered one for its user.
    /// Rooms left empty are dropped. Returns whether the channel was
    /// current (callers skip the directory disconnect for stale channels).
    pub fn delete_channel(&self, channel: &Arc<Channel>) -> bool {
        let user_id = channel.user_id();
        let room_id = channel.room_id();

        let mut inner = self.inner.write();

        let current = inner
            .channels
            .get(&user_id)
            .is_some_and(|c| Arc::ptr_eq(c, channel));
        if !current {
            return false;
        }
        inner.channels.remove(&user_id);

        if room_id != 0 {
            let emptied = inner.rooms.get_mut(&room_id).map_or(false, |room| {
                room.remove(channel);
                room.is_empty()
            });
            if emptied {
                inner.rooms.remove(&room_id);
            }
        }

        true
    }

    /// Offer a frame to one user's channel. Slow consumers are evicted and
    /// closed.
    pub fn push_single(&self, user_id: i64, frame: String) -> PushOutcome {
        let channel = {
            let inner = self.inner.read();
            match inner.channels.get(&user_id) {
                Some(channel) => channel.clone(),
                None => return PushOutcome::NotFound,
            }
        };

        match channel.offer(frame) {
            Ok(()) => PushOutcome::Delivered,
            Err(reason) => {
                tracing::warn!(
                    user_id,
                    bucket = self.id,
                    ?reason,
                    "evicting unresponsive channel"
                );
                self.delete_channel(&channel);
                channel.close();
                PushOutcome::Evicted
            }
        }
    }

    /// Offer a frame to every member of a room in this bucket. Returns how
    /// many channels accepted it.
    pub fn push_room(&self, room_id: i64, frame: &str) -> usize {
        let members = {
            let inner = self.inner.read();
            match inner.rooms.get(&room_id) {
                Some(room) => room.channels(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        let mut slow = Vec::new();
        for channel in members {
            match channel.offer(frame.to_string()) {
                Ok(()) => delivered += 1,
                Err(_) => slow.push(channel),
            }
        }

        for channel in slow {
            tracing::warn!(
                user_id = channel.user_id(),
                room_id,
                bucket = self.id,
                "evicting slow room member"
            );
            self.delete_channel(&channel);
            channel.close();
        }

        delivered
    }

    /// Members of a room resident in this bucket.
    #[must_use]
    pub fn room_count(&self, room_id: i64) -> usize {
        self.inner.read().rooms.get(&room_id).map_or(0, Room::len)
    }

    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.inner.read().channels.len()
    }
}

impl std::fmt::Debug for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Bucket")
            .field("id", &self.id)
            .field("channels", &inner.channels.len())
            .field("rooms", &inner.rooms.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    fn channel(user_id: i64, room_id: i64, capacity: usize) -> (Arc<Channel>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Arc::new(Channel::new(user_id, room_id, tx, CancellationToken::new())),
            rx,
        )
    }

    #[tokio::test]
    async fn put_links_channel_and_room() {
        let bucket = Bucket::new(0);
        let (ch, _rx) = channel(1, 7, 4);
        assert!(bucket.put(ch).is_none());
        assert_eq!(bucket.channel_count(), 1);
        assert_eq!(bucket.room_count(7), 1);
    }

    #[tokio::test]
    async fn reregistration_evicts_and_closes_the_prior_channel() {
        let bucket = Bucket::new(0);
        let (old, _old_rx) = channel(1, 7, 4);
        let (new, _new_rx) = channel(1, 7, 4);

        bucket.put(old.clone());
        let evicted = bucket.put(new.clone()).expect("old channel evicted");

        assert!(Arc::ptr_eq(&evicted, &old));
        assert!(old.is_closed());
        assert!(!new.is_closed());
        // One live channel per user, room size unchanged.
        assert_eq!(bucket.channel_count(), 1);
        assert_eq!(bucket.room_count(7), 1);
    }

    #[tokio::test]
    async fn delete_ignores_stale_channels() {
        let bucket = Bucket::new(0);
        let (old, _old_rx) = channel(1, 7, 4);
        let (new, _new_rx) = channel(1, 7, 4);

        bucket.put(old.clone());
        bucket.put(new.clone());

        // The evicted channel's cleanup must not unregister the newcomer.
        assert!(!bucket.delete_channel(&old));
        assert_eq!(bucket.channel_count(), 1);
        assert_eq!(bucket.room_count(7), 1);

        assert!(bucket.delete_channel(&new));
        assert_eq!(bucket.channel_count(), 0);
        assert_eq!(bucket.room_count(7), 0);
    }

    #[tokio::test]
    async fn empty_rooms_are_dropped() {
        let bucket = Bucket::new(0);
        let (a, _a_rx) = channel(1, 7, 4);
        let (b, _b_rx) = channel(2, 7, 4);
        bucket.put(a.clone());
        bucket.put(b.clone());
        assert_eq!(bucket.room_count(7), 2);

        bucket.delete_channel(&a);
        assert_eq!(bucket.room_count(7), 1);
        bucket.delete_channel(&b);
        assert_eq!(bucket.room_count(7), 0);
    }

    #[tokio::test]
    async fn push_single_delivers_or_reports_absent() {
        let bucket = Bucket::new(0);
        let (ch, mut rx) = channel(1, 7, 4);
        bucket.put(ch);

        assert_eq!(bucket.push_single(1, "hello".into()), PushOutcome::Delivered);
        assert_eq!(rx.recv().await.unwrap(), "hello");
        assert_eq!(bucket.push_single(99, "x".into()), PushOutcome::NotFound);
    }

    #[tokio::test]
    async fn slow_consumer_is_evicted_within_one_cycle() {
        let bucket = Bucket::new(0);
        let (ch, _rx) = channel(1, 7, 1);
        bucket.put(ch.clone());

        assert_eq!(bucket.push_single(1, "one".into()), PushOutcome::Delivered);
        // Queue full now: the next offer drops the channel.
        assert_eq!(bucket.push_single(1, "two".into()), PushOutcome::Evicted);
        assert!(ch.is_closed());
        assert_eq!(bucket.channel_count(), 0);
    }

    #[tokio::test]
    async fn room_push_skips_other_rooms() {
        let bucket = Bucket::new(0);
        let (a, mut a_rx) = channel(1, 1, 4);
        let (b, mut b_rx) = channel(2, 2, 4);
        bucket.put(a);
        bucket.put(b);

        assert_eq!(bucket.push_room(1, "hi"), 1);
        assert_eq!(a_rx.recv().await.unwrap(), "hi");
        assert!(b_rx.try_recv().is_err());
    }
}
