//! Dispatcher entry point: one consumer per queue, the discovery watcher,
//! and the room-info coalescer.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use weft_cache::{DiscoveryRegistry, RedisPool, RoomRosterStore};
use weft_common::{try_init_tracing, AppConfig};
use weft_dispatcher::{Pusher, RoomInfoCoalescer};
use weft_queue::QueueConsumer;
use weft_rpc::{GatewayWatcher, RpcRegistry};

/// Buffered coalescer flushes awaiting broadcast.
const ROOM_INFO_BUFFER: usize = 256;

#[tokio::main]
async fn main() {
    if let Err(e) = try_init_tracing() {
        eprintln!("warning: failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(error = %e, "dispatcher failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("starting weft dispatcher...");

    let config = AppConfig::from_env()?;

    let redis_pool = RedisPool::from_config(&config.redis)?;
    redis_pool.health_check().await?;
    info!("Redis connection established");

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_token.cancel();
        }
    });

    // Discovery: keep the gateway client map fresh.
    let registry = Arc::new(RpcRegistry::new());
    let watcher = GatewayWatcher::new(
        DiscoveryRegistry::new(redis_pool.clone(), config.discovery.registration_ttl_secs),
        registry.clone(),
        config.discovery.watch_interval(),
    );
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { watcher.run(shutdown).await });
    }

    // Coalescer and its broadcast sink.
    let (info_tx, mut info_rx) = mpsc::channel(ROOM_INFO_BUFFER);
    let coalescer = RoomInfoCoalescer::new(info_tx);
    tokio::spawn(coalescer.clone().run_sweeper(shutdown.clone()));

    let pusher = Arc::new(Pusher::new(
        registry,
        RoomRosterStore::new(redis_pool.clone()),
        coalescer,
        Arc::new(weft_core::SnowflakeGenerator::new(config.snowflake.worker_id)),
    ));

    {
        let pusher = pusher.clone();
        tokio::spawn(async move {
            while let Some((room_id, members)) = info_rx.recv().await {
                pusher.broadcast_room_info(room_id, members).await;
            }
        });
    }

    // One consumer task per queue. Consumer names are stable per worker so
    // pending entries are replayed to the same identity after a restart.
    let consumer_name = format!("dispatcher-{}", config.snowflake.worker_id);
    let mut consumers = Vec::new();
    for binding in weft_queue::BINDINGS {
        let consumer = QueueConsumer::new(
            redis_pool.url(),
            *binding,
            consumer_name.clone(),
            config.queue.prefetch,
            config.queue.reconnect_delay(),
        )?;
        let pusher = pusher.clone();
        let shutdown = shutdown.clone();
        consumers.push(tokio::spawn(async move {
            consumer.run(pusher, shutdown).await;
        }));
    }

    info!(consumers = consumers.len(), "dispatcher running");
    for consumer in consumers {
        consumer.await.ok();
    }

    info!("dispatcher stopped");
    Ok(())
}
