//! embedserve API Server
//!
//! HTTP service that encodes text into sentence embeddings on the best
//! available device.

use anyhow::Context;
use clap::Parser;
use embedserve_api::bootstrap;
use embedserve_common::{LogFormat, init_tracing, initialize_environment};
use embedserve_config::{ConfigurationLoader, EnvironmentSource, TomlFileSource, Validate};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "embedserve", version, about = "Sentence-embedding HTTP service")]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "EMBEDSERVE_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Address to bind (overrides configuration)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides configuration)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize environment (load .env, etc.)
    initialize_environment();
    let cli = Cli::parse();

    let mut loader = ConfigurationLoader::new().add_source(Box::new(EnvironmentSource));
    if let Some(path) = &cli.config {
        loader = loader.add_source(Box::new(TomlFileSource::new(path)));
    }
    let mut config = loader.load().context("Failed to load configuration")?;

    if let Some(host) = cli.host {
        config.api.host = host;
    }
    if let Some(port) = cli.port {
        config.api.port = port;
    }
    config.validate().context("Invalid command-line overrides")?;

    let log_format = if config.telemetry.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    init_tracing(&config.telemetry.tracing_level, log_format)?;
    info!("Configuration loaded: {config:?}");

    bootstrap::run(config)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("embedserve exited with an error")
}
