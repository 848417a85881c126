//! Territory game server binary.
//!
//! Composition root that loads configuration, installs logging, starts the
//! runtime and keeps it running until Ctrl-C.
//!
//! # Examples
//!
//! ```bash
//! # Single instance, in-process distribution
//! cargo run -p bitsplat-server
//!
//! # Persist snapshots and events under ./data
//! BITSPLAT_DISTRIBUTION=file RUST_LOG=debug cargo run -p bitsplat-server
//! ```

use anyhow::{Context, Result};
use runtime::{DistributionMode, EventEnvelope, Runtime, RuntimeConfig, SubjectFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = RuntimeConfig::from_env();
    let game = &config.game_config;
    tracing::info!("Starting bitsplat");
    tracing::info!(
        "Grid {}x{}, {} teams, round {:?}",
        game.grid_width,
        game.grid_height,
        game.teams.len(),
        game.round_duration
    );
    if let DistributionMode::File { data_dir } = &config.distribution {
        tracing::info!("Data directory: {}", data_dir.display());
    }

    let runtime = Runtime::builder()
        .config(config)
        .build()
        .await
        .context("failed to start runtime")?;
    let handle = runtime.handle();

    let events = handle.subscribe_events(SubjectFilter::all(), log_event);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    tracing::info!("Shutdown requested");

    events.abort();
    drop(handle);
    runtime.shutdown().await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn log_event(envelope: EventEnvelope) {
    match (&envelope.player_id, &envelope.team_id) {
        (Some(player), Some(team)) => tracing::info!(
            "{} player={} team={} {}",
            envelope.subject(),
            player,
            team,
            envelope.data
        ),
        _ => tracing::info!("{} {}", envelope.subject(), envelope.data),
    }
}
