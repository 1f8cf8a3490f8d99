//! Rebuild the lambda artifact whenever its sources change.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use lambda_dev_server::config::resolve_config;
use lambda_dev_server::lifecycle::{signals, Shutdown};
use lambda_dev_server::observability;
use lambda_dev_server::watch::{BuildWatcher, CommandRunner, SourceWatcher};

#[derive(Parser)]
#[command(name = "lambda-watch")]
#[command(about = "Watch lambda sources and rebuild the artifact on change", long_about = None)]
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

    let runner = Arc::new(CommandRunner::new(config.build.command.clone()));

    tracing::info!("🚀 Starting file watcher for lambda development...");
    tracing::info!(
        command = %runner.command(),
        debounce_ms = config.build.debounce_ms,
        "This will rebuild the lambda when source files change."
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(&shutdown);

    let (sources, changes) = SourceWatcher::new(&config.build);
    // Dropping the notify handle stops event delivery.
    let _watcher = sources.run()?;
    tracing::info!("Press Ctrl+C to stop watching...");

    BuildWatcher::new(runner, Duration::from_millis(config.build.debounce_ms))
        .build_on_start(config.build.build_on_start)
        .run(changes, shutdown.subscribe())
        .await;

    Ok(())
}
