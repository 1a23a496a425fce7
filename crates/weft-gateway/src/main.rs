//! Gateway server entry point: WebSocket listener, framed-TCP listener,
//! push RPC server, and the discovery registration heartbeat.

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use weft_cache::{DiscoveryRegistry, RedisPool};
use weft_common::{try_init_tracing, AppConfig};
use weft_directory::DirectoryClient;
use weft_gateway::{DirectoryOperator, GatewayRpc, GatewayServer, ServerOptions};
use weft_rpc::{GatewayRegistration, RpcClient};

/// Per-call timeout toward the directory.
const DIRECTORY_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    if let Err(e) = try_init_tracing() {
        eprintln!("warning: failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(error = %e, "gateway failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("starting weft gateway...");

    let config = AppConfig::from_env()?;
    let gateway = config.gateway.clone();

    let redis_pool = RedisPool::from_config(&config.redis)?;
    redis_pool.health_check().await?;
    info!("Redis connection established");

    let operator = Arc::new(DirectoryOperator::new(DirectoryClient::new(Arc::new(
        RpcClient::new(config.directory.rpc_address(), DIRECTORY_TIMEOUT),
    ))));

    let options = ServerOptions {
        write_wait: gateway.write_wait(),
        pong_wait: gateway.pong_wait(),
        ping_period: gateway.ping_period(),
        max_message_size: gateway.max_message_size,
        broadcast_size: gateway.broadcast_size,
        max_connections: gateway.max_connections,
    };
    let server = GatewayServer::new(
        gateway.bucket_count,
        options,
        operator,
        gateway.server_id.clone(),
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_token.cancel();
        }
    });

    // Register in discovery and keep the TTL fresh.
    let registration = GatewayRegistration::new(
        DiscoveryRegistry::new(redis_pool, config.discovery.registration_ttl_secs),
        gateway.server_id.clone(),
        gateway.rpc_address(),
        config.discovery.heartbeat(),
    );
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { registration.run(shutdown).await });
    }

    // Push RPC server for the dispatcher.
    let rpc = Arc::new(GatewayRpc::new(server.clone()));
    let rpc_addr = gateway.rpc_address();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = weft_rpc::serve(&rpc_addr, rpc, shutdown).await {
                error!(error = %e, "rpc server failed");
            }
        });
    }

    // Framed-TCP listener.
    {
        let server = server.clone();
        let addr = gateway.tcp_address();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = weft_gateway::tcp::serve(&addr, server, shutdown).await {
                error!(error = %e, "tcp listener failed");
            }
        });
    }

    // WebSocket listener on the main task.
    let app = weft_gateway::ws::create_app(server);
    let ws_addr = gateway.ws_address();
    let listener = TcpListener::bind(&ws_addr).await?;
    info!(server_id = %gateway.server_id, addr = %ws_addr, "gateway listening on ws://{ws_addr}/ws");

    let ws_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { ws_shutdown.cancelled().await })
        .await?;

    info!("gateway stopped");
    Ok(())
}
