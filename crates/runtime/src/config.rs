//! Layered configuration: built-in defaults, then a TOML file, then `CELLFLOW_*` env vars.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use cf_engine::EngineConfig;

pub const DEFAULT_CONFIG_FILE: &str = "cellflow.toml";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value `{value}` for {key}")]
    InvalidEnv { key: String, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: String::from("info"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CellflowConfig {
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

impl CellflowConfig {
    /// Resolves the configuration. An explicit path must exist; the implicit
    /// `cellflow.toml` in the working directory is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let implicit = Path::new(DEFAULT_CONFIG_FILE);
                if implicit.exists() {
                    Self::from_file(implicit)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Applies `CELLFLOW_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("CELLFLOW_IDLE_REVERT_MS") {
            self.engine.idle_revert_ms = parse_env("CELLFLOW_IDLE_REVERT_MS", &value)?;
        }
        if let Some(value) = lookup("CELLFLOW_FLOW_DISPLAY_MS") {
            self.engine.flow_display_ms = parse_env("CELLFLOW_FLOW_DISPLAY_MS", &value)?;
        }
        if let Some(value) = lookup("CELLFLOW_AGING_MARKS_COMPLETED") {
            self.engine.aging_marks_completed = parse_bool("CELLFLOW_AGING_MARKS_COMPLETED", &value)?;
        }
        if let Some(value) = lookup("CELLFLOW_LOG") {
            if !value.trim().is_empty() {
                self.logging.filter = value.trim().to_string();
            }
        }
        Ok(())
    }
}

fn parse_env(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
