//! Startup orchestration for the dev server.
//!
//! # Responsibilities
//! - Bind the listener (the one fatal startup failure)
//! - Build the handler loader from config
//! - Print the banner telling the developer what to run next

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::DevConfig;
use crate::handler::WasmArtifactLoader;
use crate::loader::HandlerLoader;

/// Bind the configured address.
pub async fn bind_listener(config: &DevConfig) -> std::io::Result<TcpListener> {
    TcpListener::bind(config.server.bind_address()).await
}

/// Loader for the configured artifact, backed by the Wasm runtime.
pub fn build_loader(config: &DevConfig) -> Arc<HandlerLoader> {
    Arc::new(
        HandlerLoader::new(&config.artifact.path, Arc::new(WasmArtifactLoader::new()))
            .keep_last_good(config.artifact.keep_last_good),
    )
}

/// Log where the server listens and how to feed it.
pub fn log_banner(config: &DevConfig, addr: SocketAddr) {
    let port = addr.port();
    tracing::info!("🚀 Development server running at http://localhost:{}", port);
    tracing::info!("📁 Watching lambda build at: {}", config.artifact.path);
    tracing::info!("Make sure to run in another terminal: {}", config.artifact.watch_command);
    for route in &config.harness.routes {
        tracing::info!("  http://localhost:{}{}  - {}", port, route.path, route.description);
    }
}
