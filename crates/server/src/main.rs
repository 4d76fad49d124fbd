mod bootstrap;
mod health;
mod query;

use anyhow::Result;
use salescope_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use salescope_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.pool.clone(),
    )
    .await?;

    tracing::info!(
        event_name = "system.server.started",
        query_port = app.config.server.query_port,
        "salescope-server started"
    );

    // Blocks until ctrl-c triggers the graceful shutdown.
    query::serve(
        &app.config.server.bind_address,
        app.config.server.query_port,
        app.runtime.clone(),
        std::time::Duration::from_secs(app.config.server.graceful_shutdown_secs),
    )
    .await?;

    tracing::info!(event_name = "system.server.stopping", "salescope-server stopping");

    if let Some(credentials) = &app.credentials {
        credentials.release().await;
        tracing::info!(
            event_name = "system.server.credentials_released",
            "calendar credential released"
        );
    }
    app.pool.close().await;

    Ok(())
}
