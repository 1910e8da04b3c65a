//! Parking lots and per-city snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::{Coordinate, timestamp};

/// Occupancy state of a lot as reported by the source.
///
/// Unrecognized states from the server map to [`LotState::Unknown`]
/// rather than failing the whole snapshot.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(from = "String", into = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LotState {
    Open,
    Closed,
    /// The source publishes the lot but has no current count.
    NoData,
    #[default]
    Unknown,
}

impl From<String> for LotState {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl From<LotState> for String {
    fn from(value: LotState) -> Self {
        value.as_ref().to_string()
    }
}

/// A single parking lot within a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingLot {
    pub id: String,
    pub name: String,
    /// Total capacity.
    pub total: u32,
    /// Currently free spaces.
    pub free: u32,
    pub state: LotState,
    /// Lot position. Some sources omit coordinates for individual lots.
    #[serde(rename = "coords", default)]
    pub coordinate: Option<Coordinate>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// Source-specific lot type (e.g. `"Parkhaus"`, `"Tiefgarage"`).
    #[serde(default)]
    pub lot_type: Option<String>,
    /// Whether the server offers a forecast for this lot.
    #[serde(default)]
    pub forecast: bool,
}

impl ParkingLot {
    /// Number of occupied spaces. Never underflows when a source reports
    /// more free spaces than capacity.
    #[must_use]
    pub const fn occupied(&self) -> u32 {
        self.total.saturating_sub(self.free)
    }

    /// Fraction of occupied spaces in `0.0..=1.0`, or `None` for lots
    /// without a known capacity.
    #[must_use]
    pub fn occupancy_ratio(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(f64::from(self.occupied()) / f64::from(self.total))
    }
}

/// All lots of one city at one point in time.
///
/// Fields are only reachable through accessors so a snapshot cannot be
/// altered after it has been handed out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingSnapshot {
    #[serde(with = "timestamp::utc")]
    last_updated: DateTime<Utc>,
    #[serde(with = "timestamp::utc")]
    last_downloaded: DateTime<Utc>,
    url: String,
    lots: Vec<ParkingLot>,
}

impl ParkingSnapshot {
    #[must_use]
    pub const fn new(
        last_updated: DateTime<Utc>,
        last_downloaded: DateTime<Utc>,
        url: String,
        lots: Vec<ParkingLot>,
    ) -> Self {
        Self {
            last_updated,
            last_downloaded,
            url,
            lots,
        }
    }

    /// When the upstream source last changed its data.
    #[must_use]
    pub const fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// When the parking service scraped the upstream source.
    #[must_use]
    pub const fn last_downloaded(&self) -> DateTime<Utc> {
        self.last_downloaded
    }

    /// URL of the upstream data source.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Lots in server order.
    #[must_use]
    pub fn lots(&self) -> &[ParkingLot] {
        &self.lots
    }

    /// Sum of free spaces over all open lots.
    #[must_use]
    pub fn total_free(&self) -> u64 {
        self.lots
            .iter()
            .filter(|lot| lot.state == LotState::Open)
            .map(|lot| u64::from(lot.free))
            .sum()
    }
}
