use anyhow::Context;
use tracing::{error, info};

use voice_classifier::config::ClassifierConfig;
use voice_classifier::logging;
use voice_classifier::pipeline::ClassificationScheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    let config = match ClassifierConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    eprintln!("📞 Voice Classifier v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.model);
    eprintln!("   Database: {}", config.database.url);
    eprintln!("   Poll interval: {:?}\n", config.poll_interval);

    let scheduler = ClassificationScheduler::from_config(&config)
        .await
        .context("Failed to start classifier")?;
    let (handle, shutdown) = scheduler.spawn();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutdown requested, waiting for the current tick to finish");

    // The loop also exits if the receiver is already gone.
    let _ = shutdown.send(true);
    handle.await.context("Scheduler task panicked")?;

    Ok(())
}
