#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for the ParkenDD client core.
//!
//! Everything the remote parking service returns (city catalog, lot
//! snapshots, occupancy forecasts) is modelled here together with the
//! device-side location types used by the tracker. Wire shapes are
//! expressed with `serde` attributes so the client crate can deserialize
//! responses straight into these types.

pub mod forecast;
pub mod lot;
pub mod metadata;
pub mod selection;
pub mod timestamp;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use forecast::ForecastSeries;
pub use lot::{LotState, ParkingLot, ParkingSnapshot};
pub use metadata::{CityInfo, Metadata};
pub use selection::{KeyValueStore, MemoryStore, Selection};

/// A WGS84 position.
///
/// Serialized as `{"lat": .., "lng": ..}`, which is the shape the parking
/// API uses for both lots and cities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees.
    #[serde(rename = "lat")]
    pub latitude: f64,
    /// Longitude in degrees.
    #[serde(rename = "lng")]
    pub longitude: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A supported city that can be auto-selected from the user's location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    /// Identifier used in request paths (e.g. `"Dresden"`).
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// City center.
    pub coordinate: Coordinate,
}

/// A device position together with the time it was captured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub coordinate: Coordinate,
    pub captured_at: DateTime<Utc>,
}

impl LocationSample {
    /// Creates a sample captured now.
    #[must_use]
    pub fn now(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            captured_at: Utc::now(),
        }
    }
}

/// Location permission state as reported by the platform.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuthorizationState {
    /// The user has not been asked yet.
    Undetermined,
    /// Location services are blocked (e.g. parental controls).
    Restricted,
    /// The user declined access.
    Denied,
    /// Access while the app is in use.
    AuthorizedForeground,
    /// Access at all times.
    AuthorizedBackground,
}

impl AuthorizationState {
    /// Returns `true` for either authorized state.
    #[must_use]
    pub const fn is_authorized(self) -> bool {
        matches!(
            self,
            Self::AuthorizedForeground | Self::AuthorizedBackground
        )
    }
}
