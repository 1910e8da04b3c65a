//! Authorization state machine.

use parkendd_models::AuthorizationState;

/// What the tracker does after entering an [`AuthorizationState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationAction {
    /// Restricted or denied: nothing more can be done this session.
    Stop,
    /// Not decided yet: ask for background authorization.
    RequestAlways,
    /// Authorized: pick the nearest supported city once.
    SelectNearestCity,
}

/// Maps a newly entered state to the tracker's reaction.
#[must_use]
pub const fn transition(state: AuthorizationState) -> AuthorizationAction {
    match state {
        AuthorizationState::Restricted | AuthorizationState::Denied => AuthorizationAction::Stop,
        AuthorizationState::Undetermined => AuthorizationAction::RequestAlways,
        AuthorizationState::AuthorizedForeground | AuthorizationState::AuthorizedBackground => {
            AuthorizationAction::SelectNearestCity
        }
    }
}
