#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geo math for the ParkenDD core.
//!
//! [`distance`] provides the great-circle distance used by both the
//! location tracker's movement filter and [`nearest`], which ranks the
//! supported-city catalog (or the lots of a snapshot) by proximity to the
//! user.

pub mod distance;
pub mod nearest;

pub use distance::distance_meters;
pub use nearest::{SelectError, rank_by_distance, rank_lots, select_nearest};
