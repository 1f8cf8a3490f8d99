//! Build execution.
//!
//! # Responsibilities
//! - Run the configured build command once per call
//! - Report how it ended without ever failing the caller
//!
//! # Design Decisions
//! - The command goes through `sh -c`, so it may use pipes and `&&`
//! - Output is inherited; compiler diagnostics appear in the watcher's terminal

use std::future::Future;
use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;

use crate::observability::metrics;

/// How one build ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Success,
    /// Non-zero exit. `None` when the process was killed by a signal.
    Failed(Option<i32>),
    /// The command could not be started at all.
    SpawnError(String),
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BuildOutcome::Success)
    }

    /// Label used for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildOutcome::Success => "success",
            BuildOutcome::Failed(_) => "failed",
            BuildOutcome::SpawnError(_) => "spawn_error",
        }
    }
}

/// Something that can perform a build.
pub trait BuildRunner: Send + Sync + 'static {
    fn run(&self) -> impl Future<Output = BuildOutcome> + Send;
}

/// Runs a shell command line as the build.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    command: String,
}

impl CommandRunner {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl BuildRunner for CommandRunner {
    async fn run(&self) -> BuildOutcome {
        tracing::info!(command = %self.command, "🔨 Building lambda...");
        let start = Instant::now();

        let status = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await;

        let outcome = match status {
            Ok(status) if status.success() => {
                tracing::info!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "✅ Lambda build completed successfully!"
                );
                BuildOutcome::Success
            }
            Ok(status) => {
                tracing::error!(
                    code = ?status.code(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "❌ Lambda build failed with code: {}",
                    status
                        .code()
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "signal".to_string())
                );
                BuildOutcome::Failed(status.code())
            }
            Err(e) => {
                tracing::error!(error = %e, command = %self.command, "❌ Build process error");
                BuildOutcome::SpawnError(e.to_string())
            }
        };

        metrics::record_build(outcome.as_str());
        outcome
    }
}
