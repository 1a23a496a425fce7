//! Session token store: `session:{token}` → auth info, with TTL.

use crate::pool::{RedisPool, RedisResult};
use serde::{Deserialize, Serialize};

/// What a valid session token resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthInfo {
    pub user_id: i64,
    pub user_name: String,
}

/// Redis-backed session store shared by the directory and anything that
/// validates tokens.
#[derive(Debug, Clone)]
pub struct SessionStore {
    pool: RedisPool,
    ttl_secs: u64,
}

impl SessionStore {
    #[must_use]
    pub fn new(pool: RedisPool, ttl_secs: u64) -> Self {
        Self { pool, ttl_secs }
    }

    fn key(token: &str) -> String {
        format!("session:{token}")
    }

    /// Materialise a session: token → (userId, userName), expiring after the
    /// configured TTL.
    pub async fn put(&self, token: &str, info: &AuthInfo) -> RedisResult<()> {
        self.pool
            .set(&Self::key(token), info, Some(self.ttl_secs))
            .await
    }

    /// Resolve a token. `None` on miss or expiry.
    pub async fn get(&self, token: &str) -> RedisResult<Option<AuthInfo>> {
        self.pool.get_value(&Self::key(token)).await
    }

    /// Invalidate a token. Returns whether it existed.
    pub async fn delete(&self, token: &str) -> RedisResult<bool> {
        self.pool.delete(&Self::key(token)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_keys_are_namespaced() {
        assert_eq!(SessionStore::key("abc123"), "session:abc123");
    }

    #[test]
    fn auth_info_wire_shape() {
        let info = AuthInfo {
            user_id: 7,
            user_name: "alice".into(),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["userId"], 7);
        assert_eq!(json["userName"], "alice");
    }
}
