//! Test helpers: spin up the directory RPC server and the HTTP front-end
//! in-process against real PostgreSQL and Redis instances.

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use weft_api::{AppState, AuthCache};
use weft_cache::{RedisPool, RedisPoolConfig, RoomRosterStore, SessionStore};
use weft_common::StorageConfig;
use weft_core::SnowflakeGenerator;
use weft_directory::{DirectoryClient, DirectoryRpc, DirectoryService};
use weft_queue::QueuePublisher;
use weft_rpc::RpcClient;

/// Session TTL used by the test directory.
const TEST_SESSION_TTL_SECS: u64 = 3600;

/// True when the backing services are reachable; otherwise prints a skip
/// notice. Tests return early on false so the suite passes without
/// infrastructure.
pub async fn check_test_env() -> bool {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("skipping: DATABASE_URL not set");
        return false;
    };
    let Ok(redis_url) = std::env::var("REDIS_URL") else {
        eprintln!("skipping: REDIS_URL not set");
        return false;
    };

    let db_ok = tokio::time::timeout(Duration::from_secs(2), async {
        weft_db::create_pool(&weft_db::DatabaseConfig {
            url: database_url,
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
    })
    .await;
    if !matches!(db_ok, Ok(Ok(_))) {
        eprintln!("skipping: PostgreSQL not reachable");
        return false;
    }

    let redis_ok = match RedisPool::new(RedisPoolConfig {
        url: redis_url,
        max_connections: 1,
    }) {
        Ok(pool) => tokio::time::timeout(Duration::from_secs(2), pool.health_check())
            .await
            .map(|r| r.is_ok())
            .unwrap_or(false),
        Err(_) => false,
    };
    if !redis_ok {
        eprintln!("skipping: Redis not reachable");
        return false;
    }

    true
}

/// The in-process stack under test: directory RPC + HTTP API.
pub struct TestStack {
    pub api_addr: SocketAddr,
    pub client: reqwest::Client,
    shutdown: CancellationToken,
}

impl TestStack {
    pub async fn start() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let redis_url = std::env::var("REDIS_URL")?;

        let pool = weft_db::create_pool(&weft_db::DatabaseConfig {
            url: database_url,
            max_connections: 4,
            min_connections: 1,
            ..Default::default()
        })
        .await?;

        let redis_pool = RedisPool::new(RedisPoolConfig {
            url: redis_url.clone(),
            max_connections: 4,
        })?;

        let publisher = Arc::new(QueuePublisher::connect(&redis_url, 10_000).await?);

        let service = Arc::new(DirectoryService::new(
            Arc::new(weft_db::PgUserRepository::new(pool.clone())),
            Arc::new(weft_db::PgMessageRepository::new(pool)),
            SessionStore::new(redis_pool.clone(), TEST_SESSION_TTL_SECS),
            RoomRosterStore::new(redis_pool),
            publisher,
            Arc::new(SnowflakeGenerator::new(1)),
        ));

        let shutdown = CancellationToken::new();

        // Directory RPC on an ephemeral port.
        let rpc_listener = TcpListener::bind("127.0.0.1:0").await?;
        let rpc_addr = rpc_listener.local_addr()?;
        {
            let shutdown = shutdown.clone();
            let rpc = Arc::new(DirectoryRpc::new(service));
            tokio::spawn(async move {
                weft_rpc::serve_listener(rpc_listener, rpc, shutdown).await.ok();
            });
        }

        // HTTP front-end against that directory.
        let directory = DirectoryClient::new(Arc::new(RpcClient::new(
            rpc_addr.to_string(),
            Duration::from_secs(5),
        )));
        let token_cache = Arc::new(AuthCache::new(Duration::from_secs(30)));
        let state = AppState::new(
            directory,
            token_cache,
            StorageConfig {
                upload_dir: std::env::temp_dir()
                    .join("weft-test-uploads")
                    .to_string_lossy()
                    .into_owned(),
                max_file_size_mb: 5,
            },
        );

        let api_listener = TcpListener::bind("127.0.0.1:0").await?;
        let api_addr = api_listener.local_addr()?;
        let app = weft_api::create_app(state);
        tokio::spawn(async move {
            axum::serve(api_listener, app).await.ok();
        });

        // Give both servers a beat to start accepting.
        tokio::time::sleep(Duration::from_millis(50)).await;

        Ok(Self {
            api_addr,
            client: reqwest::Client::new(),
            shutdown,
        })
    }

    /// POST a JSON body and return the unified response as a value.
    pub async fn post(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        let url = format!("http://{}{}", self.api_addr, path);
        let response = self.client.post(&url).json(body).send().await?;
        Ok(response.json().await?)
    }
}

impl Drop for TestStack {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
