use authbin::{logging, server, Config, Result};
use clap::Parser;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    config.validate()?;

    logging::init(&config.log_level)?;

    info!(
        "Starting authbin v{} (realm: {})",
        env!("CARGO_PKG_VERSION"),
        config.realm
    );

    if let Err(e) = server::serve(&config).await {
        error!("Server error: {}", e);
        return Err(e);
    }

    info!("Shutdown complete");
    Ok(())
}
