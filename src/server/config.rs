use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::sync::reconciler::DEFAULT_MAX_CONCURRENT_WRITES;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to load config from environment: {0}")]
    Env(#[source] envy::Error),
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: Option<String>,
    pub jwt_secret: Option<String>,
    pub agent_url: String,
    pub agent_timeout: Duration,
    pub listen_addr: String,
    pub log_dir: String,
    pub max_concurrent_writes: usize,
    pub db_max_connections: u32,
}

/// One configuration layer; later layers override earlier ones field by field.
#[derive(Deserialize, Default, Debug, Clone)]
pub struct PartialServerConfig {
    pub database_url: Option<String>,
    pub jwt_secret: Option<String>,
    pub agent_url: Option<String>,
    pub agent_timeout_secs: Option<u64>,
    pub listen_addr: Option<String>,
    pub log_dir: Option<String>,
    pub sync_max_concurrent_writes: Option<usize>,
    pub db_max_connections: Option<u32>,
}

fn default_agent_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl PartialServerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Environment variables named like the upper-cased fields, e.g. `AGENT_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        envy::from_env::<PartialServerConfig>().map_err(ConfigError::Env)
    }

    /// `other` wins wherever it has a value.
    pub fn overridden_by(self, other: PartialServerConfig) -> Self {
        Self {
            database_url: other.database_url.or(self.database_url),
            jwt_secret: other.jwt_secret.or(self.jwt_secret),
            agent_url: other.agent_url.or(self.agent_url),
            agent_timeout_secs: other.agent_timeout_secs.or(self.agent_timeout_secs),
            listen_addr: other.listen_addr.or(self.listen_addr),
            log_dir: other.log_dir.or(self.log_dir),
            sync_max_concurrent_writes: other.sync_max_concurrent_writes.or(self.sync_max_concurrent_writes),
            db_max_connections: other.db_max_connections.or(self.db_max_connections),
        }
    }
}

impl ServerConfig {
    /// `.env`, then the optional TOML file, then the process environment.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let file_config = match config_path {
            Some(path) => PartialServerConfig::from_file(Path::new(path))?,
            None => PartialServerConfig::default(),
        };
        let env_config = PartialServerConfig::from_env()?;

        Self::from_layers(file_config.overridden_by(env_config))
    }

    pub fn from_layers(merged: PartialServerConfig) -> Result<Self, ConfigError> {
        let max_concurrent_writes = merged
            .sync_max_concurrent_writes
            .unwrap_or(DEFAULT_MAX_CONCURRENT_WRITES);
        if max_concurrent_writes == 0 {
            return Err(ConfigError::Invalid {
                key: "SYNC_MAX_CONCURRENT_WRITES",
                message: "must be at least 1".to_string(),
            });
        }

        Ok(ServerConfig {
            database_url: merged.database_url,
            jwt_secret: merged.jwt_secret,
            agent_url: merged.agent_url.unwrap_or_else(default_agent_url),
            agent_timeout: Duration::from_secs(merged.agent_timeout_secs.unwrap_or(10)),
            listen_addr: merged.listen_addr.unwrap_or_else(default_listen_addr),
            log_dir: merged.log_dir.unwrap_or_else(default_log_dir),
            max_concurrent_writes,
            db_max_connections: merged.db_max_connections.unwrap_or(10),
        })
    }

    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url.as_deref().ok_or(ConfigError::Missing("DATABASE_URL"))
    }

    pub fn require_jwt_secret(&self) -> Result<&str, ConfigError> {
        self.jwt_secret.as_deref().ok_or(ConfigError::Missing("JWT_SECRET"))
    }
}
