//! The platform location service seam.

use parkendd_models::{AuthorizationState, Coordinate, LocationSample};

/// Minimal capabilities the tracker needs from a platform location service.
///
/// Updates flow the other way as [`ProviderEvent`]s, delivered into
/// [`LocationTracker::run`](crate::LocationTracker::run) through a channel.
pub trait LocationProvider: Send + Sync {
    /// The permission state the platform currently reports.
    fn authorization(&self) -> AuthorizationState;

    /// Asks for permission while the app is in use.
    fn request_when_in_use_authorization(&self);

    /// Asks for permission at all times.
    fn request_always_authorization(&self);

    /// The most recent fix the platform has, if any.
    fn last_known_coordinate(&self) -> Option<Coordinate>;
}

/// A callback from the platform location service.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// The permission state changed.
    AuthorizationChanged(AuthorizationState),
    /// One or more new fixes, oldest first. Only the last one is used.
    LocationsUpdated(Vec<LocationSample>),
}
