//! Configuration loader

use std::path::Path;

use ttymux_utils::{config_file, Result, TtymuxError};

use super::AppConfig;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from default location
    pub fn load() -> Result<AppConfig> {
        let path = config_file();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            Ok(AppConfig::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<AppConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| TtymuxError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parse configuration from string
    pub fn parse(content: &str, path: &Path) -> Result<AppConfig> {
        toml::from_str(content).map_err(|e| TtymuxError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Validate configuration
    pub fn validate(config: &AppConfig) -> Result<()> {
        if config.tty.cache_capacity == 0 {
            return Err(TtymuxError::config("tty.cache_capacity must be at least 1"));
        }

        if config.tty.max_request_ids == 0 {
            return Err(TtymuxError::config("tty.max_request_ids must be at least 1"));
        }

        if config.viewers.queue_capacity == 0 {
            return Err(TtymuxError::config(
                "viewers.queue_capacity must be at least 1",
            ));
        }

        Ok(())
    }

    /// Load from `path` (or the default location) and validate
    pub fn load_and_validate(path: Option<&Path>) -> Result<AppConfig> {
        let config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::load()?,
        };
        Self::validate(&config)?;
        Ok(config)
    }
}
