//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! lambda-dev.toml (optional)
//!     → loader.rs (parse & deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → DevConfig (validated, immutable)
//!     → shared by the server, the watcher and the harness
//! ```
//!
//! # Design Decisions
//! - Every field has a default; running without a file is the common case
//! - `PORT` and `LAMBDA_ARTIFACT` override the file
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, resolve_config, ConfigError};
pub use schema::{
    ArtifactConfig, BuildConfig, DevConfig, FunctionConfig, HarnessConfig, LogFormat,
    ObservabilityConfig, RouteCase, ServerConfig,
};
