//! storefront HTTP service
//!
//! Serves CRUD endpoints for users, customers, products and orders backed by
//! PostgreSQL.

use anyhow::Result;
use storefront_api::{config::Config, server, telemetry};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    telemetry::init(&config.log_level, config.log_format)?;

    info!("Starting storefront");
    info!(listen_addr = %config.listen_addr, migrate = config.migrate, "Configuration loaded");

    server::run(config, server::shutdown_signal()).await?;

    info!("storefront shutdown complete");
    Ok(())
}
