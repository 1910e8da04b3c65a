#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reverse geocoding for the ParkenDD core.
//!
//! Resolves a device coordinate to the name of the locality it lies in,
//! using the Nominatim service defined in `services/nominatim.toml`.
//! Lookups are best-effort: [`ReverseGeocoder::resolve_locality`] logs
//! failures and returns `None` instead of an error.

pub mod nominatim;
pub mod service_registry;

use parkendd_models::Coordinate;
use thiserror::Error;

use crate::service_registry::{GeocodingService, ProviderConfig};

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response or configuration parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,
}

/// Client for reverse locality lookups.
#[derive(Debug, Clone)]
pub struct ReverseGeocoder {
    client: reqwest::Client,
    base_url: reqwest::Url,
    zoom: u8,
}

impl ReverseGeocoder {
    /// Creates a geocoder for the embedded Nominatim definition.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the HTTP client cannot be built or the
    /// configured base URL is invalid.
    pub fn new() -> Result<Self, GeocodeError> {
        Self::from_service(&service_registry::nominatim())
    }

    /// Creates a geocoder for an explicit service definition, e.g. a
    /// self-hosted Nominatim.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the HTTP client cannot be built or the
    /// base URL is invalid.
    pub fn from_service(service: &GeocodingService) -> Result<Self, GeocodeError> {
        let ProviderConfig::Nominatim { zoom, .. } = service.provider;

        let base_url =
            reqwest::Url::parse(service.base_url()).map_err(|e| GeocodeError::Parse {
                message: format!("Invalid base URL for {}: {e}", service.id),
            })?;

        let client = reqwest::Client::builder()
            .user_agent(service.user_agent())
            .timeout(service.timeout())
            .connect_timeout(service.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url,
            zoom,
        })
    }

    /// Looks up the locality containing `coordinate`.
    ///
    /// Makes exactly one request. Returns `None` when the service has no
    /// match or the lookup fails for any reason.
    pub async fn resolve_locality(&self, coordinate: &Coordinate) -> Option<String> {
        log::debug!(
            "Reverse geocoding ({}, {})",
            coordinate.latitude,
            coordinate.longitude
        );
        match nominatim::reverse_locality(&self.client, &self.base_url, self.zoom, coordinate)
            .await
        {
            Ok(locality) => locality,
            Err(e) => {
                log::warn!("Reverse geocoding failed: {e}");
                None
            }
        }
    }
}
