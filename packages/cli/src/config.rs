//! CLI configuration file.
//!
//! ```toml
//! [client]
//! endpoint = "staging"
//! request_timeout_secs = 20
//!
//! [tracker]
//! movement_threshold_m = 250.0
//! ```

use std::path::{Path, PathBuf};

use parkendd_client::ClientConfig;
use parkendd_location::TrackerConfig;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub tracker: TrackerConfig,
}

impl AppConfig {
    /// Parses a config document. Missing sections and keys keep their
    /// defaults.
    ///
    /// # Errors
    ///
    /// * If the document is not valid TOML or a value has the wrong type
    pub fn from_toml_str(input: &str) -> Result<Self, AppConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Loads the config at `path`, or the defaults when no path is given.
    ///
    /// # Errors
    ///
    /// * If the file cannot be read
    /// * If the file is not a valid config document
    pub fn load(path: Option<&Path>) -> Result<Self, AppConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let input = std::fs::read_to_string(path).map_err(|source| AppConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded config from {}", path.display());
        Self::from_toml_str(&input)
    }
}
