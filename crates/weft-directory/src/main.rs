//! Directory server entry point.
//!
//! Configuration is loaded from environment variables; infrastructure that
//! is unreachable at startup is fatal and the process exits for the
//! supervisor to restart.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use weft_cache::{RedisPool, RoomRosterStore, SessionStore};
use weft_common::{try_init_tracing, AppConfig};
use weft_directory::{DirectoryRpc, DirectoryService};
use weft_queue::QueuePublisher;

#[tokio::main]
async fn main() {
    if let Err(e) = try_init_tracing() {
        eprintln!("warning: failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(error = %e, "directory failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("starting weft directory...");

    let config = AppConfig::from_env()?;

    info!("connecting to PostgreSQL...");
    let db_config = weft_db::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        ..Default::default()
    };
    let pool = weft_db::create_pool(&db_config).await?;
    info!("PostgreSQL connection established");

    info!("connecting to Redis...");
    let redis_pool = RedisPool::from_config(&config.redis)?;
    redis_pool.health_check().await?;
    info!("Redis connection established");

    let publisher = Arc::new(
        QueuePublisher::connect(redis_pool.url(), config.queue.stream_max_len).await?,
    );

    let service = Arc::new(DirectoryService::new(
        Arc::new(weft_db::PgUserRepository::new(pool.clone())),
        Arc::new(weft_db::PgMessageRepository::new(pool)),
        SessionStore::new(redis_pool.clone(), config.session.ttl_secs),
        RoomRosterStore::new(redis_pool),
        publisher,
        Arc::new(weft_core::SnowflakeGenerator::new(config.snowflake.worker_id)),
    ));

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_token.cancel();
        }
    });

    let rpc = Arc::new(DirectoryRpc::new(service));
    weft_rpc::serve(&config.directory.rpc_address(), rpc, shutdown).await?;

    info!("directory stopped");
    Ok(())
}
