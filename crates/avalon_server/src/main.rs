//! Avalon RTS - Dedicated Server
//!
//! ```bash
//! avalon_server --config server.ron --bind 127.0.0.1:3000 --seed 42
//! ```
//!
//! Log filtering follows `RUST_LOG`; `--verbose` raises the default to debug.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use avalon_server::{network, ServerConfig};

#[derive(Parser)]
#[command(name = "avalon_server")]
#[command(about = "Authoritative Avalon RTS server")]
#[command(version)]
struct Cli {
    /// RON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides the config file
    #[arg(short, long)]
    bind: Option<String>,

    /// Fixed map seed for every game
    #[arg(long)]
    seed: Option<u64>,

    /// Ruleset RON file replacing the built-in balance
    #[arg(long)]
    ruleset: Option<PathBuf>,

    /// Simulation ticks per second
    #[arg(long)]
    tick_rate: Option<u32>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    if let Some(seed) = cli.seed {
        config.map_seed = Some(seed);
    }
    if let Some(path) = cli.ruleset {
        config.ruleset_path = Some(path);
    }
    if let Some(rate) = cli.tick_rate {
        config.tick_rate = rate;
    }
    config.validate()?;

    let ruleset = config.load_ruleset()?;
    tracing::info!(
        bind = %config.bind,
        tick_rate = config.tick_rate,
        grid_size = config.grid_size,
        "starting Avalon RTS server"
    );
    network::run(config, ruleset).await?;
    Ok(())
}
