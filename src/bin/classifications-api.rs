use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use voice_classifier::api::{ApiState, classification_routes};
use voice_classifier::config::ApiConfig;
use voice_classifier::logging;
use voice_classifier::store::LibSqlBackend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    let config = match ApiConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let backend = Arc::new(
        LibSqlBackend::open(&config.database.url, &config.database.auth_token)
            .await
            .with_context(|| format!("Failed to open database at {}", config.database.url))?,
    );

    let app = classification_routes(ApiState { backend });

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "Classifications API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl-C");
            }
        })
        .await
        .context("Server error")?;

    info!("Classifications API stopped");
    Ok(())
}
