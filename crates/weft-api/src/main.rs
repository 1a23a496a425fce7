//! HTTP front-end entry point.

use tokio::net::TcpListener;
use tracing::{error, info};
use weft_common::{try_init_tracing, AppConfig};

#[tokio::main]
async fn main() {
    if let Err(e) = try_init_tracing() {
        eprintln!("warning: failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(error = %e, "api failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("starting weft api...");

    let config = AppConfig::from_env()?;
    let addr = config.api.address();

    let state = weft_api::create_app_state(&config);
    let app = weft_api::create_app(state);

    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "api listening");

    axum::serve(listener, app).await?;
    Ok(())
}
