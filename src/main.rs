use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use wayfarer::api::AppState;
use wayfarer::config::LoggingConfig;
use wayfarer::{WayfarerConfig, web};

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    if logging.format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = WayfarerConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging);
    tracing::info!(version = wayfarer::VERSION, "starting wayfarer");

    let state = AppState::from_config(&config)?;
    web::run(Arc::new(state), &config.server).await
}
