//! Gateway discovery: registration heartbeat on the gateway side, the
//! polling watcher and round-robin client registry on the dispatcher side.

use crate::client::RpcClient;
use crate::error::RpcError;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use weft_cache::{DiscoveryRegistry, Registration};

/// Per-call timeout for clients minted by the watcher.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Live gateway clients, keyed by server id, with per-server round-robin.
#[derive(Default)]
pub struct RpcRegistry {
    servers: DashMap<String, Vec<Arc<RpcClient>>>,
    index: DashMap<String, usize>,
}

impl RpcRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Round-robin pick among the instances registered for `server_id`.
    pub fn client_by_server_id(&self, server_id: &str) -> Result<Arc<RpcClient>, RpcError> {
        let instances = self
            .servers
            .get(server_id)
            .filter(|list| !list.is_empty())
            .ok_or_else(|| RpcError::NoEndpoint(server_id.to_string()))?;

        let mut slot = self.index.entry(server_id.to_string()).or_insert(0);
        let picked = instances[*slot % instances.len()].clone();
        *slot = (*slot + 1) % instances.len();
        Ok(picked)
    }

    /// One client per known server id, for broadcasts.
    #[must_use]
    pub fn all_gateway_clients(&self) -> Vec<Arc<RpcClient>> {
        let server_ids: Vec<String> = self.servers.iter().map(|e| e.key().clone()).collect();
        server_ids
            .iter()
            .filter_map(|id| self.client_by_server_id(id).ok())
            .collect()
    }

    /// Swap in a freshly discovered view.
    pub fn replace(&self, map: HashMap<String, Vec<Arc<RpcClient>>>) {
        self.servers.retain(|id, _| map.contains_key(id));
        self.index.retain(|id, _| map.contains_key(id));
        for (server_id, clients) in map {
            self.servers.insert(server_id, clients);
        }
    }

    #[must_use]
    pub fn server_count(&self) -> usize {
        self.servers.len()
    }
}

impl std::fmt::Debug for RpcRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcRegistry")
            .field("servers", &self.servers.len())
            .finish()
    }
}

/// Polls the discovery namespace and rebuilds the registry on change,
/// reusing clients whose address is unchanged so pipelined connections
/// survive refreshes.
pub struct GatewayWatcher {
    discovery: DiscoveryRegistry,
    registry: Arc<RpcRegistry>,
    interval: Duration,
}

impl GatewayWatcher {
    #[must_use]
    pub fn new(discovery: DiscoveryRegistry, registry: Arc<RpcRegistry>, interval: Duration) -> Self {
        Self {
            discovery,
            registry,
            interval,
        }
    }

    pub async fn run(&self, shutdown: CancellationToken) {
        // addr → client, kept across polls for connection reuse.
        let mut known: HashMap<String, Arc<RpcClient>> = HashMap::new();

        loop {
            match self.discovery.list().await {
                Ok(registrations) => {
                    if registrations.is_empty() {
                        tracing::warn!("no gateway instances registered");
                    }
                    let map = build_map(&registrations, &mut known);
                    self.registry.replace(map);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "discovery poll failed");
                }
            }

            tokio::select! {
                () = shutdown.cancelled() => return,
                () = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

fn build_map(
    registrations: &[Registration],
    known: &mut HashMap<String, Arc<RpcClient>>,
    ) -> HashMap<String, Vec<Arc<RpcClient>>> {
    let mut map: HashMap<String, Vec<Arc<RpcClient>>> = HashMap::new();

    for registration in registrations {
        if registration.server_type != "connect" {
            continue;
        }
        let client = known
            .entry(registration.addr.clone())
            .or_insert_with(|| Arc::new(RpcClient::new(registration.addr.clone(), CLIENT_TIMEOUT)))
            .clone();
        map.entry(registration.server_id.clone()).or_default().push(client);
    }

    // Forget clients for addresses that vanished.
    let live: std::collections::HashSet<&str> =
        registrations.iter().map(|r| r.addr.as_str()).collect();
    known.retain(|addr, _| live.contains(addr.as_str()));

    map
}

/// Gateway-side registration heartbeat. Registers immediately, refreshes on
/// an interval, deregisters on shutdown.
pub struct GatewayRegistration {
    discovery: DiscoveryRegistry,
    server_id: String,
    rpc_addr: String,
    heartbeat: Duration,
}

impl GatewayRegistration {
    #[must_use]
    pub fn new(
        discovery: DiscoveryRegistry,
        server_id: impl Into<String>,
        rpc_addr: impl Into<String>,
        heartbeat: Duration,
    ) -> Self {
        Self {
            discovery,
            server_id: server_id.into(),
            rpc_addr: rpc_addr.into(),
            heartbeat,
        }
    }

    pub async fn run(&self, shutdown: CancellationToken) {
        loop {
            if let Err(e) = self.discovery.register(&self.server_id, &self.rpc_addr).await {
                tracing::warn!(server_id = %self.server_id, error = %e, "registration refresh failed");
            }

            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(self.heartbeat) => {}
            }
        }

        if let Err(e) = self.discovery.deregister(&self.server_id).await {
            tracing::warn!(server_id = %self.server_id, error = %e, "deregistration failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(addr: &str) -> Arc<RpcClient> {
        Arc::new(RpcClient::new(addr, CLIENT_TIMEOUT))
    }

    #[test]
    fn round_robin_rotates_instances() {
        let registry = RpcRegistry::new();
        let a = client("10.0.0.1:1");
        let b = client("10.0.0.2:1");
        let mut map = HashMap::new();
        map.insert("connect-1".to_string(), vec![a.clone(), b.clone()]);
        registry.replace(map);

        let first = registry.client_by_server_id("connect-1").unwrap();
        let second = registry.client_by_server_id("connect-1").unwrap();
        let third = registry.client_by_server_id("connect-1").unwrap();
        assert_eq!(first.addr(), a.addr());
        assert_eq!(second.addr(), b.addr());
        assert_eq!(third.addr(), a.addr());
    }

    #[test]
    fn unknown_server_id_is_an_error() {
        let registry = RpcRegistry::new();
        assert!(matches!(
            registry.client_by_server_id("nope"),
            Err(RpcError::NoEndpoint(_))
        ));
    }

    #[test]
    fn broadcast_returns_one_client_per_server() {
        let registry = RpcRegistry::new();
        let mut map = HashMap::new();
        map.insert("connect-1".to_string(), vec![client("10.0.0.1:1"), client("10.0.0.1:2")]);
        map.insert("connect-2".to_string(), vec![client("10.0.0.2:1")]);
        registry.replace(map);

        assert_eq!(registry.all_gateway_clients().len(), 2);
    }

    #[test]
    fn replace_drops_vanished_servers() {
        let registry = RpcRegistry::new();
        let mut map = HashMap::new();
        map.insert("connect-1".to_string(), vec![client("10.0.0.1:1")]);
        registry.replace(map);
        assert_eq!(registry.server_count(), 1);

        registry.replace(HashMap::new());
        assert_eq!(registry.server_count(), 0);
        assert!(registry.all_gateway_clients().is_empty());
    }

    #[test]
    fn build_map_reuses_clients_and_filters_types() {
        let mut known = HashMap::new();
        let regs = vec![
            Registration {
                server_id: "connect-1".into(),
                addr: "10.0.0.1:1".into(),
                server_type: "connect".into(),
            },
            Registration {
                server_id: "other".into(),
                addr: "10.0.0.9:1".into(),
                server_type: "logic".into(),
            },
        ];

        let map = build_map(&regs, &mut known);
        assert_eq!(map.len(), 1);
        let before = map["connect-1"][0].clone();

        let map = build_map(&regs, &mut known);
        assert!(Arc::ptr_eq(&before, &map["connect-1"][0]));
    }
}
