//! Maps raw request outcomes onto [`ClientError`].
//!
//! The same rules apply to every endpoint, in this order:
//!
//! 1. no response → [`ClientError::Request`]
//! 2. HTTP 404 → [`ClientError::NotFound`] (snapshot and forecast only)
//! 3. any other non-200 status → [`ClientError::Server`]
//! 4. body does not parse into the expected shape → [`ClientError::Server`]
//!
//! Endpoint-specific semantic checks (API version, empty forecast) run on
//! the parsed value afterwards.

use parkendd_models::Metadata;
use serde::de::DeserializeOwned;

use crate::transport::{HttpResponse, preview};
use crate::{ClientError, TransportError};

/// Which endpoint a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Endpoint {
    Metadata,
    Snapshot,
    Forecast,
}

impl Endpoint {
    /// The metadata endpoint always exists, so a 404 there is just another
    /// server failure.
    const fn reports_not_found(self) -> bool {
        !matches!(self, Self::Metadata)
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::Snapshot => "snapshot",
            Self::Forecast => "forecast",
        }
    }
}

/// Applies the transport, status and shape rules to one request outcome.
pub(crate) fn classify<T: DeserializeOwned>(
    endpoint: Endpoint,
    url: &str,
    outcome: Result<HttpResponse, TransportError>,
) -> Result<T, ClientError> {
    let response = outcome.map_err(|e| {
        log::warn!("{} request to {url} failed: {e}", endpoint.label());
        ClientError::from(e)
    })?;

    match response.status {
        200 => {}
        404 if endpoint.reports_not_found() => {
            return Err(ClientError::NotFound {
                url: url.to_string(),
            });
        }
        status => {
            log::warn!("{} request to {url} returned HTTP {status}", endpoint.label());
            return Err(ClientError::Server {
                message: format!("HTTP {status} from {url}"),
            });
        }
    }

    serde_json::from_str(&response.body).map_err(|e| {
        log::warn!(
            "{} response from {url} did not parse: {e}\n  body preview: {}",
            endpoint.label(),
            preview(&response.body)
        );
        ClientError::Server {
            message: format!("Unexpected {} response shape: {e}", endpoint.label()),
        }
    })
}

/// Rejects metadata from any API version other than `supported`.
pub(crate) fn check_api_version(metadata: Metadata, supported: &str) -> Result<Metadata, ClientError> {
    if metadata.api_version == supported {
        return Ok(metadata);
    }
    log::error!(
        "Found API version {}. This client only understands {supported}",
        metadata.api_version
    );
    Err(ClientError::IncompatibleApi {
        found: metadata.api_version,
        supported: supported.to_string(),
    })
}
