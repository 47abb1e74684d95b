//! Board host binary.
//!
//! Reads configuration from the environment (a `.env` file is honoured),
//! loads the content directory and runs one board until Ctrl-C.

mod config;

use anyhow::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use vtt_content::ContentFactory;
use vtt_runtime::{Event, Runtime, RuntimeHandle, Topic};

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    setup_logging();

    let config = ServerConfig::from_env();
    tracing::info!(
        board = %config.runtime.board_name,
        data_dir = %config.data_dir.display(),
        tick = ?config.runtime.tick_interval,
        "starting board host"
    );

    // 1. Runtime with content from the data directory
    let runtime = Runtime::builder()
        .config(config.runtime.clone())
        .content_dir(&config.data_dir)
        .build()
        .context("failed to build runtime")?;
    let handle = runtime.handle();

    // 2. Log what happens on the board
    let logger = tokio::spawn(log_events(handle.clone()));

    // 3. Run until interrupted
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown requested");

    if config.save_on_exit {
        let compendium = handle.compendium().await?;
        ContentFactory::new(&config.data_dir).save_compendium(&compendium)?;
        tracing::info!(entries = compendium.len(), "compendium saved");
    }

    logger.abort();
    runtime.shutdown().await?;
    Ok(())
}

fn setup_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn log_events(handle: RuntimeHandle) {
    let mut combat = handle.subscribe(Topic::Combat);
    let mut board = handle.subscribe(Topic::Board);
    loop {
        let received = tokio::select! {
            event = combat.recv() => event,
            event = board.recv() => event,
        };
        match received {
            Ok(Event::CreatureDied { entity, name }) => {
                tracing::info!(%entity, %name, "died");
            }
            Ok(Event::Ticked { .. }) => {}
            Ok(Event::Change(change)) => tracing::debug!(?change, "board change"),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event log fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
