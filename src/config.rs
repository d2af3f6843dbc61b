//! Engine Configuration
//!
//! Settings shared by the library and the CLI, loaded from a YAML file.
//!
//! # Config File Resolution
//!
//! 1. `CAFE_CONFIG_FILE_PATH` environment variable
//! 2. `cafe.yaml` in the current working directory
//!
//! # Example
//!
//! ```yaml
//! logging:
//!   level: debug
//!   log_result: true
//! marshalling:
//!   format: json
//!   policy: relaxed
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{CafeError, Result};
use crate::marshalling::{DeserializePolicy, Format};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "CAFE_CONFIG_FILE_PATH";

/// Config file used when the environment variable is not set.
pub const DEFAULT_CONFIG_FILE: &str = "cafe.yaml";

const LOG_LEVELS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];

/// Lazily-resolved path to the config file.
pub static CONFIG_PATH: Lazy<PathBuf> = Lazy::new(|| match std::env::var_os(CONFIG_ENV_VAR) {
    Some(path) => {
        info!("Using config from {}: {}", CONFIG_ENV_VAR, Path::new(&path).display());
        PathBuf::from(path)
    }
    None => PathBuf::from(DEFAULT_CONFIG_FILE),
});

/// Logging settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when `RUST_LOG` is not set
    pub level: String,

    /// Log the input, result and output of every workflow task
    pub log_result: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_result: false,
        }
    }
}

/// Request/response body settings.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(default)]
pub struct MarshallingConfig {
    pub format: Format,
    pub policy: DeserializePolicy,
}

/// Top-level configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct CafeConfig {
    pub logging: LoggingConfig,
    pub marshalling: MarshallingConfig,
}

impl CafeConfig {
    /// Parses and validates a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| CafeError::io(path, e))?;
        debug!("Config content loaded ({} bytes)", content.len());

        let config = Self::from_yaml(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Loads the config file, falling back to defaults when it does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match Self::load(path) {
            Err(CafeError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Loads from [`CONFIG_PATH`], falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::load_or_default(CONFIG_PATH.as_path())
    }

    /// Saves the config as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml).map_err(|e| CafeError::io(path, e))?;
        info!("Config saved to {}", path.display());
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let level = self.logging.level.trim().to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(CafeError::Config(format!(
                "unknown log level '{}' (expected one of {})",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}
