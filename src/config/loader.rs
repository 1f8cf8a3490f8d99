//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::DevConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "lambda-dev.toml";

/// Environment variable overriding `server.port`.
pub const PORT_ENV: &str = "PORT";

/// Environment variable overriding `artifact.path`.
pub const ARTIFACT_ENV: &str = "LAMBDA_ARTIFACT";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { name: &'static str, value: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { name, value } => {
                write!(f, "Invalid value for {}: '{}'", name, value)
            }
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<DevConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: DevConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Resolve the effective configuration for a binary.
///
/// An explicit path must exist. Without one, `lambda-dev.toml` is used when
/// present and built-in defaults otherwise. Environment overrides apply last.
pub fn resolve_config(explicit: Option<&Path>) -> Result<DevConfig, ConfigError> {
    let config = match explicit {
        Some(path) => load_config(path)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                load_config(default_path)?
            } else {
                DevConfig::default()
            }
        }
    };

    let config = apply_env_overrides(config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply `PORT` and `LAMBDA_ARTIFACT` overrides using the given lookup.
pub fn apply_env_overrides<F>(mut config: DevConfig, lookup: F) -> Result<DevConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    // An exported but empty variable counts as unset.
    if let Some(value) = lookup(PORT_ENV).filter(|v| !v.trim().is_empty()) {
        config.server.port = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Env { name: PORT_ENV, value: value.clone() })?;
    }

    if let Some(value) = lookup(ARTIFACT_ENV) {
        if !value.trim().is_empty() {
            config.artifact.path = value;
        }
    }

    Ok(config)
}
