//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (status codes, debounce window, addresses)
//! - Reject settings that would make the watcher or harness a no-op
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DevConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::DevConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &DevConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ValidationError::new("server.host", "must not be empty"));
    }

    if config.artifact.path.trim().is_empty() {
        errors.push(ValidationError::new("artifact.path", "must not be empty"));
    }

    if config.function.name.trim().is_empty() {
        errors.push(ValidationError::new("function.name", "must not be empty"));
    }

    if config.build.command.trim().is_empty() {
        errors.push(ValidationError::new("build.command", "must not be empty"));
    }

    if config.build.watch_dirs.is_empty() {
        errors.push(ValidationError::new("build.watch_dirs", "at least one directory is required"));
    }

    if config.build.extensions.is_empty() {
        errors.push(ValidationError::new("build.extensions", "at least one extension is required"));
    }
    for ext in &config.build.extensions {
        if ext.is_empty() || ext.starts_with('.') {
            errors.push(ValidationError::new(
                "build.extensions",
                format!("'{}' must be a bare extension such as \"rs\"", ext),
            ));
        }
    }

    if config.build.debounce_ms == 0 {
        errors.push(ValidationError::new("build.debounce_ms", "must be greater than zero"));
    }

    for (i, route) in config.harness.routes.iter().enumerate() {
        if !route.path.starts_with('/') {
            errors.push(ValidationError::new(
                format!("harness.routes[{}].path", i),
                format!("'{}' must start with '/'", route.path),
            ));
        }
        if !(100..=999).contains(&route.expected_status) {
            errors.push(ValidationError::new(
                format!("harness.routes[{}].expected_status", i),
                format!("{} is not a valid HTTP status code", route.expected_status),
            ));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
