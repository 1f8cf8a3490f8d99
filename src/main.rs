//! Lambda development server.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────┐
//!                    │                  DEV SERVER                       │
//!   Browser          │  ┌─────────┐   ┌──────────┐   ┌───────────────┐  │
//!   ─────────────────┼─▶│  http   │──▶│  event   │──▶│    handler    │  │
//!                    │  │ server  │   │translate │   │ invoke (wasm) │  │
//!                    │  └────┬────┘   └──────────┘   └───────┬───────┘  │
//!                    │       │                                │          │
//!                    │       ▼                                ▼          │
//!                    │  ┌─────────┐                   ┌───────────────┐  │
//!   ◀────────────────┼──│response │◀──────────────────│ result / error│  │
//!                    │  └─────────┘                   └───────────────┘  │
//!                    │       ▲                                           │
//!                    │  ┌────┴──────────────┐      artifact on disk      │
//!                    │  │ loader (mtime)    │◀──── written by lambda-watch│
//!                    │  └───────────────────┘                            │
//!                    └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use lambda_dev_server::config::resolve_config;
use lambda_dev_server::http::DevServer;
use lambda_dev_server::lifecycle::{signals, startup, Shutdown};
use lambda_dev_server::observability;

#[derive(Parser)]
#[command(name = "lambda-dev-server")]
#[command(about = "Serve a compiled lambda handler over HTTP with hot reload", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./lambda-dev.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref())?;
    observability::init(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.server.bind_address(),
        artifact = %config.artifact.path,
        "lambda-dev-server starting"
    );

    let listener = startup::bind_listener(&config).await?;
    let local_addr = listener.local_addr()?;
    startup::log_banner(&config, local_addr);

    let loader = startup::build_loader(&config);

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(&shutdown);

    let server = DevServer::new(config, loader);
    server.run(listener, shutdown.subscribe()).await?;

    Ok(())
}
