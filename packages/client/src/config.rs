//! Client configuration.
//!
//! Defaults point at the production API and accept exactly API version
//! `1.0`. A TOML document can override any field:
//!
//! ```toml
//! endpoint = "staging"
//! supported_api_version = "1.0"
//! request_timeout_secs = 20
//! forecast_region = "Dresden"
//! ```

use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// The only metadata `api_version` this client understands.
pub const SUPPORTED_API_VERSION: &str = "1.0";

/// Length of the week forecast window.
pub const FORECAST_WEEK: TimeDelta = TimeDelta::days(7);

/// Length of the day forecast window.
pub const FORECAST_DAY: TimeDelta = TimeDelta::days(1);

const PRODUCTION_URL: &str = "https://api.parkendd.de/";
const STAGING_URL: &str = "https://staging-park-api.higgsboson.tk/";

/// Which deployment of the parking API to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiEndpoint {
    #[default]
    Production,
    Staging,
}

impl ApiEndpoint {
    #[must_use]
    pub const fn base_url(self) -> &'static str {
        match self {
            Self::Production => PRODUCTION_URL,
            Self::Staging => STAGING_URL,
        }
    }
}

/// Settings for [`ParkingClient`](crate::ParkingClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoint: ApiEndpoint,
    /// Overrides the endpoint's base URL (e.g. a self-hosted instance).
    pub base_url: Option<String>,
    pub supported_api_version: String,
    /// Per-request timeout covering connect, send and body read.
    pub request_timeout_secs: u64,
    /// Region path segment used by the forecast endpoint.
    pub forecast_region: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: ApiEndpoint::Production,
            base_url: None,
            supported_api_version: SUPPORTED_API_VERSION.to_string(),
            request_timeout_secs: 30,
            forecast_region: "Dresden".to_string(),
        }
    }
}

/// Errors from loading a [`ClientConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("Invalid client configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ClientConfig {
    /// Parses a configuration from TOML. Missing fields keep their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the document is malformed.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// The same configuration pointed at the staging deployment.
    #[must_use]
    pub fn staging(self) -> Self {
        Self {
            endpoint: ApiEndpoint::Staging,
            ..self
        }
    }

    /// Base URL all request paths are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.endpoint.base_url())
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
