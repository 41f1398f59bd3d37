//! Configuration loading from disk and environment.

use std::path::Path;
use std::fs;
use crate::config::schema::RuntimeConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `cluster.server`.
pub const ENV_SERVER: &str = "CLUSTER_SERVER";
/// Environment variable overriding `cluster.token`.
pub const ENV_TOKEN: &str = "CLUSTER_TOKEN";
/// Environment variable overriding `cluster.namespace`.
pub const ENV_NAMESPACE: &str = "CLUSTER_NAMESPACE";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
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

/// Load configuration from an optional TOML file, apply process environment
/// overrides, then validate.
///
/// With no path the defaults are used.
pub fn load_config(path: Option<&Path>) -> Result<RuntimeConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Like [`load_config`], reading overrides through `env`.
pub fn load_config_with_env<F>(path: Option<&Path>, env: F) -> Result<RuntimeConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            parse_config(&content)?
        }
        None => RuntimeConfig::default(),
    };

    apply_env_overrides(&mut config, env);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse TOML text without validating it.
pub fn parse_config(content: &str) -> Result<RuntimeConfig, ConfigError> {
    toml::from_str(content).map_err(ConfigError::Parse)
}

fn apply_env_overrides<F>(config: &mut RuntimeConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(server) = env(ENV_SERVER) {
        tracing::debug!(server = %server, "Cluster server overridden from environment");
        config.cluster.server = server;
    }
    if let Some(token) = env(ENV_TOKEN) {
        config.cluster.token = Some(token);
    }
    if let Some(namespace) = env(ENV_NAMESPACE) {
        config.cluster.namespace = namespace;
    }
}
