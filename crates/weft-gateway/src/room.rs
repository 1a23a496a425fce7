//! A room inside one bucket: the channels of the room's members that hash
//! into this shard. Guarded by the owning bucket's lock.

use crate::channel::Channel;
use std::collections::HashMap;
use std::sync::Arc;

pub struct Room {
    id: i64,
    channels: HashMap<i64, Arc<Channel>>,
}

impl Room {
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self {
            id,
            channels: HashMap::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn put(&mut self, channel: Arc<Channel>) {
        self.channels.insert(channel.user_id(), channel);
    }

    /// Remove a member only when the given channel is still the one
    /// registered. Returns whether anything was removed.
    pub fn remove(&mut self, channel: &Arc<Channel>) -> bool {
        match self.channels.get(&channel.user_id()) {
            Some(current) if Arc::ptr_eq(current, channel) => {
                self.channels.remove(&channel.user_id());
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Snapshot of member channels, for fan-out outside the lock.
    #[must_use]
    pub fn channels(&self) -> Vec<Arc<Channel>> {
        self.channels.values().cloned().collect()
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.id)
            .field("members", &self.channels.len())
            .finish()
    }
}
