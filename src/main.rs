//! GT06 gateway - TCP listener for GT06-family GPS tracking devices.

use std::path::PathBuf;

use clap::Parser;
use gt06_gateway as app;
use tracing::info;

use app::config::{AppConfig, ConfigLoadResult};
use app::server;
use app::sink::JsonlSink;

/// TCP gateway for GT06-family GPS tracking devices.
#[derive(Parser)]
#[command(name = "gt06-gateway")]
struct Cli {
    /// Path to config.toml (default: next to the executable)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use config.toml from current directory (dev mode)
    #[arg(long)]
    dev: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    info!("gt06-gateway starting...");

    let config_path = if let Some(path) = cli.config {
        path
    } else if cli.dev {
        info!("Dev mode: loading config from current directory");
        PathBuf::from("config.toml")
    } else {
        AppConfig::default_path()
    };
    info!("Config path: {config_path:?}");

    let config = match AppConfig::try_load(&config_path) {
        ConfigLoadResult::Loaded(config) => {
            info!("Config loaded successfully");
            config
        }
        ConfigLoadResult::Missing => {
            info!("Config missing, running on defaults");
            AppConfig::default()
        }
        ConfigLoadResult::Invalid(e) => {
            anyhow::bail!("config {config_path:?} is invalid: {e}");
        }
    };

    let output = config.storage.output_path();
    let sink = JsonlSink::open(&output)?;
    info!("Writing decoded records to {output:?}");

    let records = server::spawn_sink_writer(Box::new(sink));
    server::run(&config, records).await?;

    info!("gt06-gateway stopped");
    Ok(())
}
