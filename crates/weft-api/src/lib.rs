//! # weft-api
//!
//! The HTTP front-end: JSON routes over the directory RPC surface, with a
//! process-local auth-token cache in front of `CheckAuth`.

pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;
pub mod token_cache;

pub use middleware::AuthUser;
pub use response::ApiResponse;
pub use routes::create_app;
pub use state::AppState;
pub use token_cache::AuthCache;

use std::sync::Arc;
use std::time::Duration;
use weft_common::AppConfig;
use weft_directory::DirectoryClient;
use weft_rpc::RpcClient;

/// Sweep cadence for the token cache.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Per-call timeout toward the directory.
const DIRECTORY_TIMEOUT: Duration = Duration::from_secs(5);

/// Wire up the front-end state from configuration and start the cache
/// sweeper.
#[must_use]
pub fn create_app_state(config: &AppConfig) -> AppState {
    let directory = DirectoryClient::new(Arc::new(RpcClient::new(
        config.directory.rpc_address(),
        DIRECTORY_TIMEOUT,
    )));

    let token_cache = Arc::new(AuthCache::new(Duration::from_secs(
        config.session.token_cache_ttl_secs,
    )));
    tokio::spawn(token_cache.clone().run_sweeper(SWEEP_INTERVAL));

    AppState::new(directory, token_cache, config.storage.clone())
}
