mod server;

use anyhow::Result;
use chunkrelay_core::{logging, Config};
use clap::Parser;
use tracing::info;

use server::RelayServer;

#[derive(Parser, Debug)]
#[command(name = "chunkrelay")]
#[command(about = "In-memory media chunk relay", long_about = None)]
struct Args {
    /// Path to a configuration file (toml, yaml or json)
    #[arg(short, long, env = "CHUNKRELAY_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load configuration
    let config = Config::load(args.config.as_deref())?;

    // 2. Validate configuration (fail fast on misconfigurations)
    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("Config validation error: {e}");
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s)",
            errors.len()
        ));
    }

    // 3. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("Chunk relay starting...");
    info!("HTTP address: {}", config.http_address());
    info!(
        max_chunk_bytes = config.relay.max_chunk_bytes,
        sweep_interval_seconds = config.relay.sweep_interval_seconds,
        consumer_idle_timeout_seconds = config.relay.consumer_idle_timeout_seconds,
        "Relay limits"
    );

    // 4. Wire components and run until shutdown
    RelayServer::build(config)?.start().await
}
