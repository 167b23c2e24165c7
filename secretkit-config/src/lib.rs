//! Configuration management for secretkit tools

use config::{Config, Environment, Map};
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable prefix, e.g. `SECRETKIT_AWS__REGION`
pub const ENV_PREFIX: &str = "SECRETKIT";

const DEFAULT_JSON_SECRET_FILE: &str = ".secretkit.json";
const DEFAULT_ENV_SCRIPT: &str = ".bashrc_secretkit";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Could not determine home directory")]
    MissingHome,
}

/// AWS session configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AwsConfig {
    pub region: Option<String>,
    pub profile: Option<String>,
}

/// Which remote store the sync target lives in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    #[default]
    Parameter,
    Secret,
}

/// Target of the `sync-secrets` tool
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    pub target: String,
    #[serde(default)]
    pub kind: SyncKind,
    pub kms_key_id: Option<String>,
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SecretkitConfig {
    #[serde(default)]
    pub aws: AwsConfig,
    pub json_secret_file: Option<PathBuf>,
    pub env_script: Option<PathBuf>,
    pub sync: Option<SyncConfig>,
    pub log_level: Option<String>,
}

impl SecretkitConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        Self::build(Environment::with_prefix(ENV_PREFIX))
    }

    /// Load configuration from an explicit variable map instead of the process env
    pub fn from_vars(vars: Map<String, String>) -> Result<Self, ConfigError> {
        Self::build(Environment::with_prefix(ENV_PREFIX).source(Some(vars)))
    }

    fn build(source: Environment) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("log_level", "info")?
            .add_source(source.prefix_separator("_").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Path of the local JSON secret file, defaulting to `~/.secretkit.json`
    pub fn json_secret_file(&self) -> Result<PathBuf, ConfigError> {
        match &self.json_secret_file {
            Some(path) => Ok(path.clone()),
            None => home_file(DEFAULT_JSON_SECRET_FILE),
        }
    }

    /// Path of the shell script holding exported secrets, defaulting to `~/.bashrc_secretkit`
    pub fn env_script(&self) -> Result<PathBuf, ConfigError> {
        match &self.env_script {
            Some(path) => Ok(path.clone()),
            None => home_file(DEFAULT_ENV_SCRIPT),
        }
    }

    /// Get log level, defaulting to "info"
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}

fn home_file(name: &str) -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(name))
        .ok_or(ConfigError::MissingHome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_config_defaults() {
        let config = SecretkitConfig::from_vars(Map::new()).unwrap();
        assert_eq!(config.log_level(), "info");
        assert!(config.aws.region.is_none());
        assert!(config.sync.is_none());
    }

    #[test]
    fn test_config_nested_values() {
        let config = SecretkitConfig::from_vars(vars(&[
            ("SECRETKIT_AWS__REGION", "us-east-1"),
            ("SECRETKIT_AWS__PROFILE", "dev"),
            ("SECRETKIT_LOG_LEVEL", "debug"),
            ("SECRETKIT_JSON_SECRET_FILE", "/tmp/secrets.json"),
            ("SECRETKIT_SYNC__TARGET", "/app/config"),
            ("SECRETKIT_SYNC__KIND", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.aws.region.as_deref(), Some("us-east-1"));
        assert_eq!(config.aws.profile.as_deref(), Some("dev"));
        assert_eq!(config.log_level(), "debug");
        assert_eq!(
            config.json_secret_file().unwrap(),
            PathBuf::from("/tmp/secrets.json")
        );

        let sync = config.sync.unwrap();
        assert_eq!(sync.target, "/app/config");
        assert_eq!(sync.kind, SyncKind::Secret);
        assert!(sync.kms_key_id.is_none());
    }
}
