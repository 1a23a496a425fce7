//! Authoritative room roster: `room:{roomId}` hash of
//! `userId → "serverId,userName"`.
//!
//! An entry exists iff some gateway holds a live channel for that
//! (room, user) pair. A lost disconnect leaves a stale field which is
//! reconciled when the owning gateway next observes the socket dead.

use crate::pool::{RedisPool, RedisResult};
use redis::AsyncCommands;
use std::collections::HashMap;

/// Parsed roster field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub server_id: String,
    pub user_name: String,
}

impl RosterEntry {
    /// Parse `"serverId,userName"`. The user name may itself contain commas;
    /// only the first one separates.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let (server_id, user_name) = value.split_once(',')?;
        if server_id.is_empty() {
            return None;
        }
        Some(Self {
            server_id: server_id.to_string(),
            user_name: user_name.to_string(),
        })
    }

    #[must_use]
    pub fn encode(server_id: &str, user_name: &str) -> String {
        format!("{server_id},{user_name}")
    }
}

/// Redis-backed room roster store.
#[derive(Debug, Clone)]
pub struct RoomRosterStore {
    pool: RedisPool,
}

impl RoomRosterStore {
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    fn key(room_id: i64) -> String {
        format!("room:{room_id}")
    }

    /// Record that `user_id` is live in `room_id` on `server_id`.
    /// Idempotent on re-registration.
    pub async fn add(
        &self,
        room_id: i64,
        user_id: i64,
        server_id: &str,
        user_name: &str,
    ) -> RedisResult<()> {
        let mut conn = self.pool.get().await?;
        conn.hset::<_, _, _, ()>(
            Self::key(room_id),
            user_id.to_string(),
            RosterEntry::encode(server_id, user_name),
        )
        .await?;
        Ok(())
    }

    /// Remove the roster entry. Returns whether it existed.
    pub async fn remove(&self, room_id: i64, user_id: i64) -> RedisResult<bool> {
        let mut conn = self.pool.get().await?;
        let removed: i64 = conn.hdel(Self::key(room_id), user_id.to_string()).await?;
        Ok(removed > 0)
    }

    /// Resolve one member's entry.
    pub async fn get(&self, room_id: i64, user_id: i64) -> RedisResult<Option<RosterEntry>> {
        let mut conn = self.pool.get().await?;
        let value: Option<String> = conn.hget(Self::key(room_id), user_id.to_string()).await?;
        Ok(value.as_deref().and_then(RosterEntry::parse))
    }

    /// Full membership snapshot: `userId → userName`.
    pub async fn members(&self, room_id: i64) -> RedisResult<HashMap<String, String>> {
        let mut conn = self.pool.get().await?;
        let raw: HashMap<String, String> = conn.hgetall(Self::key(room_id)).await?;
        Ok(raw
            .into_iter()
            .filter_map(|(user_id, value)| {
                RosterEntry::parse(&value).map(|entry| (user_id, entry.user_name))
            })
            .collect())
    }

    /// Live member count.
    pub async fn count(&self, room_id: i64) -> RedisResult<i64> {
        let mut conn = self.pool.get().await?;
        let count: i64 = conn.hlen(Self::key(room_id)).await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_round_trips() {
        let encoded = RosterEntry::encode("connect-2", "alice");
        let entry = RosterEntry::parse(&encoded).unwrap();
        assert_eq!(entry.server_id, "connect-2");
        assert_eq!(entry.user_name, "alice");
    }

    #[test]
    fn entry_tolerates_commas_in_user_name() {
        let entry = RosterEntry::parse("connect-1,smith, john").unwrap();
        assert_eq!(entry.server_id, "connect-1");
        assert_eq!(entry.user_name, "smith, john");
    }

    #[test]
    fn entry_rejects_malformed_values() {
        assert!(RosterEntry::parse("no-separator").is_none());
        assert!(RosterEntry::parse(",nameonly").is_none());
    }

    #[test]
    fn roster_keys_are_namespaced() {
        assert_eq!(RoomRosterStore::key(42), "room:42");
    }
}
