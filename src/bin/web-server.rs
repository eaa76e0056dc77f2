//! Stocklens web server
//!
//! Serves the dashboard page, the JSON price API, health and metrics.
//! All settings come from the environment; there are no flags.

use dotenvy::dotenv;
use stocklens::config::Config;
use stocklens::core::http::start_server;
use stocklens::logging;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let config = Config::from_env();
    logging::init_logging(&config);

    info!("Starting Stocklens web server");
    info!(environment = %config.environment, "Environment");
    info!(
        provider = ?config.provider,
        base_url = %config.market_data_base_url,
        default_period = %config.default_period,
        "Market data"
    );
    info!(port = config.port, "HTTP Server: http://0.0.0.0:{}", config.port);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(config).await {
            error!(error = %e, "HTTP server error");
        }
    });

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutting down web server...");
        }
        _ = server_handle => {
            error!("HTTP server stopped");
        }
    }

    Ok(())
}
