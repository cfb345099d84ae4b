mod app;
mod bootstrap;
mod cart;
mod catalog;
mod error;
mod health;
mod session;

use std::future::IntoFuture;
use std::time::Duration;

use anyhow::Result;
use storefront_core::config::{AppConfig, LoadOptions};
use tokio::sync::watch;

fn init_logging(config: &AppConfig) {
    use storefront_core::config::LogFormat::*;
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
    // Logging needs the config, so load it before bootstrap.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let application = bootstrap::bootstrap_with_config(config).await?;
    let address =
        format!("{}:{}", application.config.server.bind_address, application.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    let grace = Duration::from_secs(application.config.server.graceful_shutdown_secs);

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let router = app::router(application.state.clone(), application.db_pool.clone());
    let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
        let _ = stop_rx.changed().await;
    });
    let mut server = tokio::spawn(serve.into_future());

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "storefront-server started"
    );

    tokio::select! {
        joined = &mut server => {
            joined??;
            return Ok(());
        }
        signal = wait_for_shutdown() => signal?,
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        grace_secs = grace.as_secs(),
        "storefront-server stopping"
    );
    let _ = stop_tx.send(true);

    match tokio::time::timeout(grace, server).await {
        Ok(joined) => joined??,
        Err(_) => tracing::warn!(
            event_name = "system.server.shutdown_timeout",
            correlation_id = "shutdown",
            "in-flight requests did not finish within the grace period"
        ),
    }

    application.db_pool.close().await;
    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
