//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the dev harness.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration shared by the dev server, the watcher and the test harness.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DevConfig {
    /// Listener configuration (host, port).
    pub server: ServerConfig,

    /// Where the handler artifact lives and how it is reloaded.
    pub artifact: ArtifactConfig,

    /// Static identity reported in every invocation context.
    pub function: FunctionConfig,

    /// External build command and the watch loop driving it.
    pub build: BuildConfig,

    /// Route cases exercised by the test harness.
    pub harness: HarnessConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// TCP port. Overridden by the `PORT` environment variable.
    pub port: u16,

    /// Render handler errors (with trace text) into the 500 page.
    /// Turn off for anything that is not a local development box.
    pub expose_errors: bool,
}

impl ServerConfig {
    /// Socket address string for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3003,
            expose_errors: true,
        }
    }
}

/// Handler artifact configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Path of the compiled handler module, relative to the working directory.
    /// Overridden by the `LAMBDA_ARTIFACT` environment variable.
    pub path: String,

    /// Command shown on the "handler not available" page.
    pub watch_command: String,

    /// Keep serving the previous handler when a reload fails.
    pub keep_last_good: bool,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            path: "target/lambda/wasm32-unknown-unknown/release/handler.wasm".to_string(),
            watch_command: "cargo run --bin lambda-watch".to_string(),
            keep_last_good: false,
        }
    }
}

/// Identity fields of the synthetic invocation context.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FunctionConfig {
    /// Function name (also used for the log group).
    pub name: String,

    /// Reported function version.
    pub version: String,

    /// Region segment of the invoked function ARN.
    pub region: String,

    /// Account segment of the invoked function ARN.
    pub account_id: String,

    /// Reported memory limit in megabytes.
    pub memory_limit_mb: u32,

    /// Value returned by the remaining-time accessor. Not enforced.
    pub remaining_time_ms: u64,
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self {
            name: "dev-server".to_string(),
            version: "$LATEST".to_string(),
            region: "local".to_string(),
            account_id: "123456789012".to_string(),
            memory_limit_mb: 512,
            remaining_time_ms: 30_000,
        }
    }
}

/// Build-watch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Shell command line producing the artifact.
    pub command: String,

    /// Directories watched recursively for source changes.
    pub watch_dirs: Vec<String>,

    /// File extensions (without the dot) that trigger a rebuild.
    pub extensions: Vec<String>,

    /// Quiet period after the last change before a build starts.
    pub debounce_ms: u64,

    /// Run one build immediately when the watcher starts.
    pub build_on_start: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: "cargo build --release --target wasm32-unknown-unknown --target-dir target/lambda"
                .to_string(),
            watch_dirs: vec!["src".to_string()],
            extensions: vec!["rs".to_string(), "toml".to_string()],
            debounce_ms: 1000,
            build_on_start: true,
        }
    }
}

/// A single route exercised by the test harness.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RouteCase {
    /// Request path placed in the literal event.
    pub path: String,

    /// Human-readable description; `--filter` matches against it.
    pub description: String,

    /// Status code the handler is expected to return.
    #[serde(default = "default_expected_status")]
    pub expected_status: u16,
}

impl RouteCase {
    pub fn new(path: &str, description: &str, expected_status: u16) -> Self {
        Self {
            path: path.to_string(),
            description: description.to_string(),
            expected_status,
        }
    }
}

fn default_expected_status() -> u16 {
    200
}

/// Test harness configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub routes: Vec<RouteCase>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            routes: vec![
                RouteCase::new("/", "Home page", 200),
                RouteCase::new("/about", "About page", 200),
                RouteCase::new("/posts", "All posts", 200),
                RouteCase::new("/posts/tag/clojure", "Posts tagged with clojure", 200),
                RouteCase::new("/post/blog-tech-stack", "Tech stack post (should exist)", 200),
                RouteCase::new(
                    "/post/airbnb-mantyharju-instructions",
                    "Mäntyharju instructions (should exist)",
                    200,
                ),
                RouteCase::new("/post/nonexistent-article", "Non-existent post", 200),
                RouteCase::new("/nonexistent", "Non-existent page", 200),
            ],
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub log_level: String,

    /// Human-friendly or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9091".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: DevConfig = toml::from_str(
            r#"
            [server]
            port = 4000

            [[harness.routes]]
            path = "/health"
            description = "Health check"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.server.expose_errors);
        assert_eq!(config.build.debounce_ms, 1000);
        assert_eq!(config.harness.routes, vec![RouteCase::new("/health", "Health check", 200)]);
    }

    #[test]
    fn test_default_route_table() {
        let config = DevConfig::default();
        assert_eq!(config.harness.routes.len(), 8);
        assert!(config.harness.routes.iter().all(|r| r.expected_status == 200));
        assert_eq!(config.server.bind_address(), "0.0.0.0:3003");
    }

    #[test]
    fn test_log_format_parsing() {
        let config: DevConfig = toml::from_str("[observability]\nlog_format = \"json\"\n").unwrap();
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
