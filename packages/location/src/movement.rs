//! Movement significance filter.

use serde::{Deserialize, Serialize};

/// Default minimum movement, in meters, before a new sample replaces the
/// held one.
pub const DEFAULT_MOVEMENT_THRESHOLD_M: f64 = 100.0;

/// Tracker settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Samples must be strictly farther than this from the held sample.
    pub movement_threshold_m: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            movement_threshold_m: DEFAULT_MOVEMENT_THRESHOLD_M,
        }
    }
}

/// Outcome of feeding one sample through the filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MovementDecision {
    /// First sample: held as the baseline, subscribers not notified.
    Baseline,
    /// Far enough away: replaced the held sample and notified subscribers.
    Moved { distance_m: f64 },
    /// Too close: dropped without replacing or notifying.
    Discarded { distance_m: f64 },
}

/// Strict comparison: a sample exactly at the threshold is not movement.
#[must_use]
pub fn exceeds_threshold(distance_m: f64, threshold_m: f64) -> bool {
    distance_m > threshold_m
}
