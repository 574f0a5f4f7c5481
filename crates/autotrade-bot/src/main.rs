//! Auto-trader entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use autotrade_bot::config::DEFAULT_CONFIG_PATH;

/// Condition-search intraday auto-trader
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via AUTOTRADE_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // CLI arg > AUTOTRADE_CONFIG > default
    let config_path = args
        .config
        .or_else(|| std::env::var("AUTOTRADE_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = autotrade_bot::AppConfig::load(&config_path)?;
    autotrade_telemetry::init_logging(&config.telemetry.log_level)?;

    info!("Starting autotrade v{}", env!("CARGO_PKG_VERSION"));
    info!(
        config_path = %config_path,
        mode = ?config.gateway.mode,
        data_dir = %config.persistence.data_dir.display(),
        "Configuration loaded"
    );

    let app = autotrade_bot::Application::new(config)?;
    app.run().await?;

    Ok(())
}
