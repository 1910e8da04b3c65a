#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Device location tracking for the ParkenDD core.
//!
//! The platform location service is abstracted behind
//! [`LocationProvider`]; its callbacks arrive as [`ProviderEvent`]s. The
//! [`LocationTracker`] reacts to them:
//!
//! - authorization changes go through the pure [`transition`] function;
//!   gaining authorization selects the nearest supported city, persists it
//!   and broadcasts a [`SelectionChanged`];
//! - location updates pass a movement filter before replacing the held
//!   sample and notifying subscribers.

pub mod authorization;
pub mod movement;
pub mod provider;
pub mod tracker;

pub use authorization::{AuthorizationAction, transition};
pub use movement::{MovementDecision, TrackerConfig, exceeds_threshold};
pub use provider::{LocationProvider, ProviderEvent};
pub use tracker::{LocationTracker, SelectionChanged};
