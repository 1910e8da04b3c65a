//! Occupancy forecasts for a single lot.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Predicted occupancy values for one lot over a time range.
///
/// A series handed out by the client always has at least one entry; empty
/// responses are reported as an error instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub lot_id: String,
    /// Wall-clock timestamp -> occupancy count, in chronological order.
    pub data: BTreeMap<NaiveDateTime, u32>,
}

impl ForecastSeries {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// The forecast value at or immediately before `at`.
    #[must_use]
    pub fn value_at(&self, at: NaiveDateTime) -> Option<u32> {
        self.data.range(..=at).next_back().map(|(_, value)| *value)
    }

    /// The entry with the highest predicted occupancy. Earliest wins on ties.
    #[must_use]
    pub fn peak(&self) -> Option<(NaiveDateTime, u32)> {
        self.data
            .iter()
            .fold(None, |best: Option<(NaiveDateTime, u32)>, (at, value)| match best {
                Some((_, best_value)) if best_value >= *value => best,
                _ => Some((*at, *value)),
            })
    }
}
