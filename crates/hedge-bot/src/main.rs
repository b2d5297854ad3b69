//! Gamma/delta hedging engine - Entry Point
//!
//! Observation mode: analyze exposure and plan hedges only
//! Trading mode: execute hedges through the paper gateway

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Gamma/delta exposure monitoring and hedging engine
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via HEDGE_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Force observation mode: analyze and plan, never execute
    #[arg(long)]
    observe: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config path: CLI arg > HEDGE_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("HEDGE_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    let mut config = hedge_bot::AppConfig::load(&config_path)?;
    if args.observe {
        config.force_observation();
    }

    hedge_telemetry::init_logging(&config.log_filter)?;
    info!("Starting hedge-bot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        config_path = %config_path,
        mode = ?config.mode,
        positions = config.positions.len(),
        "Configuration loaded"
    );

    let app = hedge_bot::Application::new(config)?;

    if args.once {
        app.run_once().await;
        return Ok(());
    }

    app.run().await?;

    Ok(())
}
