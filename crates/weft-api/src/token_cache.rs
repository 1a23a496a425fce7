//! Process-local auth-token cache.
//!
//! Hits bypass the directory's `CheckAuth` RPC. Entries expire on a short
//! TTL; a periodic sweep removes the expired ones and logout invalidates
//! locally and synchronously.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry {
    user_id: i64,
    user_name: String,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct AuthCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl AuthCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Cached `(userId, userName)` for a token, or `None` on miss or
    /// expiry. Expired entries are removed on the way out.
    #[must_use]
    pub fn get(&self, token: &str) -> Option<(i64, String)> {
        let expired = {
            let entries = self.entries.read();
            match entries.get(token) {
                None => return None,
                Some(entry) if Instant::now() >= entry.expires_at => true,
                Some(entry) => return Some((entry.user_id, entry.user_name.clone())),
            }
        };

        if expired {
            self.entries.write().remove(token);
        }
        None
    }

    pub fn set(&self, token: &str, user_id: i64, user_name: &str) {
        let entry = CacheEntry {
            user_id,
            user_name: user_name.to_string(),
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().insert(token.to_string(), entry);
    }

    /// Synchronous local invalidation, used on logout.
    pub fn delete(&self, token: &str) {
        self.entries.write().remove(token);
    }

    /// One sweep pass over expired entries. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Periodic sweep loop; spawn once per process.
    pub async fn run_sweeper(self: std::sync::Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let swept = self.sweep();
            if swept > 0 {
                tracing::debug!(swept, remaining = self.len(), "auth cache swept");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn hit_returns_cached_identity() {
        let cache = AuthCache::new(Duration::from_secs(30));
        cache.set("tok", 7, "alice");
        assert_eq!(cache.get("tok"), Some((7, "alice".to_string())));
        assert_eq!(cache.get("other"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_misses_and_is_dropped() {
        let cache = AuthCache::new(Duration::from_secs(30));
        cache.set("tok", 7, "alice");

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(cache.get("tok"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn delete_is_immediate() {
        let cache = AuthCache::new(Duration::from_secs(30));
        cache.set("tok", 7, "alice");
        cache.delete("tok");
        assert_eq!(cache.get("tok"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_removes_only_expired_entries() {
        let cache = AuthCache::new(Duration::from_secs(30));
        cache.set("old", 1, "a");
        tokio::time::advance(Duration::from_secs(20)).await;
        cache.set("fresh", 2, "b");
        tokio::time::advance(Duration::from_secs(15)).await;

        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.get("fresh"), Some((2, "b".to_string())));
        assert_eq!(cache.get("old"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_evicts_within_one_interval() {
        let cache = Arc::new(AuthCache::new(Duration::from_secs(30)));
        cache.set("tok", 1, "a");

        let sweeper = tokio::spawn(cache.clone().run_sweeper(Duration::from_secs(60)));
        tokio::time::advance(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;

        assert!(cache.is_empty());
        sweeper.abort();
    }
}
