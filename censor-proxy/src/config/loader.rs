//! Configuration file loading

use super::schema::Config;
use super::validator::ConfigValidator;
use crate::error::{ProxyError, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate config from a file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ProxyError::ConfigLoad {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::load_from_str(&contents)
    }

    /// Parse and validate config from TOML text
    pub fn load_from_str(contents: &str) -> Result<Config> {
        let config: Config = toml::from_str(contents)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Load config from an explicit path, or fall back to built-in defaults
    pub fn load_or_default(path: Option<PathBuf>) -> Result<Config> {
        match path {
            Some(p) => Self::load_from_file(&p),
            None => {
                tracing::debug!("No config file given, using defaults");
                Ok(Config::default())
            }
        }
    }
}
