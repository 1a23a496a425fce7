//! Gateway discovery registry.
//!
//! Each gateway maintains `discovery:connect:{serverId}` →
//! `"{rpcAddr}?serverType=connect&serverId={serverId}"` with a short TTL and
//! refreshes it on a heartbeat. Watchers scan the namespace; a key that
//! misses its refresh simply expires and the instance drops out of rotation.

use crate::pool::{RedisPool, RedisResult};
use redis::AsyncCommands;

const PREFIX: &str = "discovery:connect:";

/// One discovered gateway registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub server_id: String,
    pub addr: String,
    pub server_type: String,
}

impl Registration {
    /// Parse `"{addr}?serverType=…&serverId=…"`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let (addr, query) = value.split_once('?')?;
        let server_type = param_by_key(query, "serverType")?;
        let server_id = param_by_key(query, "serverId")?;
        if addr.is_empty() || server_type.is_empty() || server_id.is_empty() {
            return None;
        }
        Some(Self {
            server_id: server_id.to_string(),
            addr: addr.to_string(),
            server_type: server_type.to_string(),
        })
    }

    #[must_use]
    pub fn encode(addr: &str, server_type: &str, server_id: &str) -> String {
        format!("{addr}?serverType={server_type}&serverId={server_id}")
    }
}

/// Extract a value from a `k=v&k=v` query string.
#[must_use]
pub fn param_by_key<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then_some(v)
    })
}

/// Redis-backed registry of live gateway instances.
#[derive(Debug, Clone)]
pub struct DiscoveryRegistry {
    pool: RedisPool,
    ttl_secs: u64,
}

impl DiscoveryRegistry {
    #[must_use]
    pub fn new(pool: RedisPool, ttl_secs: u64) -> Self {
        Self { pool, ttl_secs }
    }

    fn key(server_id: &str) -> String {
        format!("{PREFIX}{server_id}")
    }

    /// Register (or refresh) a gateway instance.
    pub async fn register(&self, server_id: &str, rpc_addr: &str) -> RedisResult<()> {
        let mut conn = self.pool.get().await?;
        conn.set_ex::<_, _, ()>(
            Self::key(server_id),
            Registration::encode(rpc_addr, "connect", server_id),
            self.ttl_secs,
        )
        .await?;
        Ok(())
    }

    /// Remove a registration eagerly (graceful shutdown).
    pub async fn deregister(&self, server_id: &str) -> RedisResult<()> {
        self.pool.delete(&Self::key(server_id)).await?;
        Ok(())
    }

    /// Snapshot of all live registrations.
    pub async fn list(&self) -> RedisResult<Vec<Registration>> {
        let keys = self.pool.scan_keys(&format!("{PREFIX}*"), 100).await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.pool.get().await?;
        let mut registrations = Vec::with_capacity(keys.len());
        for key in keys {
            // Keys can expire between SCAN and GET; skip the gaps.
            let value: Option<String> = conn.get(&key).await?;
            if let Some(registration) = value.as_deref().and_then(Registration::parse) {
                registrations.push(registration);
            }
        }
        Ok(registrations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_round_trips() {
        let encoded = Registration::encode("10.0.0.5:6923", "connect", "connect-3");
        let parsed = Registration::parse(&encoded).unwrap();
        assert_eq!(parsed.addr, "10.0.0.5:6923");
        assert_eq!(parsed.server_type, "connect");
        assert_eq!(parsed.server_id, "connect-3");
    }

    #[test]
    fn registration_rejects_missing_params() {
        assert!(Registration::parse("10.0.0.5:6923").is_none());
        assert!(Registration::parse("10.0.0.5:6923?serverType=connect").is_none());
        assert!(Registration::parse("?serverType=connect&serverId=x").is_none());
    }

    #[test]
    fn param_lookup_finds_only_exact_keys() {
        let query = "serverType=connect&serverId=connect-1";
        assert_eq!(param_by_key(query, "serverType"), Some("connect"));
        assert_eq!(param_by_key(query, "serverId"), Some("connect-1"));
        assert_eq!(param_by_key(query, "server"), None);
    }
}
