//! The location tracker service.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use parkendd_client::MetadataSource;
use parkendd_geo::{distance_meters, select_nearest};
use parkendd_models::{AuthorizationState, City, Coordinate, KeyValueStore, LocationSample, Selection};
use tokio::sync::{broadcast, mpsc};

use crate::movement::exceeds_threshold;
use crate::{
    AuthorizationAction, LocationProvider, MovementDecision, ProviderEvent, TrackerConfig,
    transition,
};

/// Capacity of the selection broadcast channel. Slow receivers lag rather
/// than block the tracker.
const SELECTION_CHANNEL_CAPACITY: usize = 16;

type MovementHandler = Arc<dyn Fn(&LocationSample) + Send + Sync>;

/// Raised after the nearest city has been selected and persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionChanged {
    pub city: City,
    /// The coordinate the selection was based on.
    pub location: Coordinate,
}

#[derive(Debug)]
struct TrackerState {
    authorization: AuthorizationState,
    last_accepted: Option<LocationSample>,
    escalated: bool,
}

/// Tracks the device location and auto-selects the nearest city.
///
/// State is written only from provider events; see [`run`](Self::run).
pub struct LocationTracker {
    provider: Arc<dyn LocationProvider>,
    metadata: Arc<dyn MetadataSource>,
    store: Arc<dyn KeyValueStore>,
    config: TrackerConfig,
    state: Mutex<TrackerState>,
    subscribers: Mutex<Vec<MovementHandler>>,
    selections: broadcast::Sender<SelectionChanged>,
}

impl std::fmt::Debug for LocationTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationTracker")
            .field("config", &self.config)
            .field("state", &*self.state())
            .finish_non_exhaustive()
    }
}

impl LocationTracker {
    /// Creates a tracker. The initial authorization is read from the
    /// provider.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        metadata: Arc<dyn MetadataSource>,
        store: Arc<dyn KeyValueStore>,
        config: TrackerConfig,
    ) -> Self {
        let (selections, _) = broadcast::channel(SELECTION_CHANNEL_CAPACITY);
        let authorization = provider.authorization();
        Self {
            provider,
            metadata,
            store,
            config,
            state: Mutex::new(TrackerState {
                authorization,
                last_accepted: None,
                escalated: false,
            }),
            subscribers: Mutex::new(Vec::new()),
            selections,
        }
    }

    /// Starts the platform permission flow. The result arrives later as a
    /// [`ProviderEvent::AuthorizationChanged`].
    pub fn request_authorization(&self) {
        self.provider.request_when_in_use_authorization();
    }

    #[must_use]
    pub fn current_authorization(&self) -> AuthorizationState {
        self.state().authorization
    }

    #[must_use]
    pub fn last_accepted(&self) -> Option<LocationSample> {
        self.state().last_accepted
    }

    /// Registers a handler called with every sample that passes the
    /// movement filter. Handlers run synchronously in registration order
    /// and stay registered for the tracker's lifetime.
    pub fn on_movement<F>(&self, handler: F)
    where
        F: Fn(&LocationSample) + Send + Sync + 'static,
    {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(handler));
    }

    /// Receiver for [`SelectionChanged`] notifications.
    #[must_use]
    pub fn subscribe_selection(&self) -> broadcast::Receiver<SelectionChanged> {
        self.selections.subscribe()
    }

    /// Consumes provider events until the sender side is dropped.
    ///
    /// Events are applied one at a time in arrival order. The city
    /// selection triggered by an authorization change runs on its own task
    /// so location updates keep flowing while metadata is fetched.
    pub async fn run(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<ProviderEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                ProviderEvent::AuthorizationChanged(state) => {
                    if let Some(coordinate) = self.apply_authorization(state) {
                        let tracker = Arc::clone(&self);
                        tokio::spawn(async move {
                            tracker.select_city(coordinate).await;
                        });
                    }
                }
                ProviderEvent::LocationsUpdated(samples) => {
                    self.handle_locations(&samples);
                }
            }
        }
        log::debug!("Location event stream closed");
    }

    /// Applies an authorization change and, when it grants access, runs
    /// the nearest-city selection to completion.
    ///
    /// Returns the selection if one was made. Failures along the way are
    /// logged and yield `None`.
    pub async fn handle_authorization(&self, state: AuthorizationState) -> Option<SelectionChanged> {
        let coordinate = self.apply_authorization(state)?;
        self.select_city(coordinate).await
    }

    /// Feeds a batch of samples through the movement filter. Only the last
    /// sample of the batch is considered; an empty batch returns `None`.
    pub fn handle_locations(&self, samples: &[LocationSample]) -> Option<MovementDecision> {
        let sample = *samples.last()?;

        let mut state = self.state();
        let Some(held) = state.last_accepted else {
            state.last_accepted = Some(sample);
            log::debug!("Baseline location {:?}", sample.coordinate);
            return Some(MovementDecision::Baseline);
        };

        let distance_m = distance_meters(&held.coordinate, &sample.coordinate);
        if !exceeds_threshold(distance_m, self.config.movement_threshold_m) {
            return Some(MovementDecision::Discarded { distance_m });
        }
        state.last_accepted = Some(sample);
        drop(state);

        log::debug!("Moved {distance_m:.1} m to {:?}", sample.coordinate);
        let handlers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for handler in &handlers {
            handler(&sample);
        }

        Some(MovementDecision::Moved { distance_m })
    }

    /// Records the new state and performs its synchronous reaction.
    /// Returns the coordinate to select a city for, if any.
    fn apply_authorization(&self, new_state: AuthorizationState) -> Option<Coordinate> {
        let mut state = self.state();
        state.authorization = new_state;
        log::info!("Location authorization changed to {new_state}");

        match transition(new_state) {
            AuthorizationAction::Stop => None,
            AuthorizationAction::RequestAlways => {
                if !state.escalated {
                    state.escalated = true;
                    drop(state);
                    self.provider.request_always_authorization();
                }
                None
            }
            AuthorizationAction::SelectNearestCity => {
                let Some(coordinate) = self.provider.last_known_coordinate() else {
                    log::debug!("Authorized but no location fix yet");
                    return None;
                };
                if state.last_accepted.is_none() {
                    state.last_accepted = Some(LocationSample::now(coordinate));
                }
                Some(coordinate)
            }
        }
    }

    async fn select_city(&self, coordinate: Coordinate) -> Option<SelectionChanged> {
        let metadata = match self.metadata.fetch_metadata().await {
            Ok(metadata) => metadata,
            Err(e) => {
                log::warn!("Skipping nearest-city selection, metadata unavailable: {e}");
                return None;
            }
        };

        let catalog = metadata.catalog();
        let city = match select_nearest(&catalog, &coordinate) {
            Ok(city) => city.clone(),
            Err(e) => {
                log::warn!("Skipping nearest-city selection: {e}");
                return None;
            }
        };

        Selection::from(&city).save(self.store.as_ref());
        log::info!("Selected nearest city {} ({})", city.name, city.id);

        let event = SelectionChanged {
            city,
            location: coordinate,
        };
        // No receivers is fine; the selection is already persisted.
        let _ = self.selections.send(event.clone());
        Some(event)
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parkendd_client::ClientError;
    use parkendd_models::{CityInfo, MemoryStore, Metadata, selection};

    use super::*;

    struct FakeProvider {
        authorization: AuthorizationState,
        last_known: Option<Coordinate>,
        when_in_use_requests: AtomicUsize,
        always_requests: AtomicUsize,
    }

    impl FakeProvider {
        fn new(authorization: AuthorizationState, last_known: Option<Coordinate>) -> Arc<Self> {
            Arc::new(Self {
                authorization,
                last_known,
                when_in_use_requests: AtomicUsize::new(0),
                always_requests: AtomicUsize::new(0),
            })
        }
    }

    impl LocationProvider for FakeProvider {
        fn authorization(&self) -> AuthorizationState {
            self.authorization
        }

        fn request_when_in_use_authorization(&self) {
            self.when_in_use_requests.fetch_add(1, Ordering::SeqCst);
        }

        fn request_always_authorization(&self) {
            self.always_requests.fetch_add(1, Ordering::SeqCst);
        }

        fn last_known_coordinate(&self) -> Option<Coordinate> {
            self.last_known
        }
    }

    struct FakeMetadata {
        result: Result<Metadata, ClientError>,
        calls: AtomicUsize,
    }

    impl FakeMetadata {
        fn new(result: Result<Metadata, ClientError>) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl MetadataSource for FakeMetadata {
        async fn fetch_metadata(&self) -> Result<Metadata, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn metadata() -> Metadata {
        let mut cities = BTreeMap::new();
        for (id, name, lat, lng) in [
            ("Dresden", "Dresden", 51.0504, 13.7373),
            ("Ingolstadt", "Ingolstadt", 48.7665, 11.4258),
            ("Zuerich", "Zürich", 47.3769, 8.5417),
        ] {
            cities.insert(
                id.to_string(),
                CityInfo {
                    name: name.to_string(),
                    coordinate: Some(Coordinate::new(lat, lng)),
                    source: None,
                    url: None,
                    active_support: true,
                },
            );
        }
        Metadata {
            api_version: "1.0".to_string(),
            cities,
        }
    }

    const PIRNA: Coordinate = Coordinate::new(50.9629, 13.9400);

    struct Harness {
        tracker: Arc<LocationTracker>,
        provider: Arc<FakeProvider>,
        metadata: Arc<FakeMetadata>,
        store: Arc<MemoryStore>,
    }

    fn harness(
        authorization: AuthorizationState,
        last_known: Option<Coordinate>,
        metadata_result: Result<Metadata, ClientError>,
        config: TrackerConfig,
    ) -> Harness {
        let provider = FakeProvider::new(authorization, last_known);
        let metadata = FakeMetadata::new(metadata_result);
        let store = Arc::new(MemoryStore::new());
        let tracker = Arc::new(LocationTracker::new(
            provider.clone(),
            metadata.clone(),
            store.clone(),
            config,
        ));
        Harness {
            tracker,
            provider,
            metadata,
            store,
        }
    }

    fn default_harness() -> Harness {
        harness(
            AuthorizationState::Undetermined,
            Some(PIRNA),
            Ok(metadata()),
            TrackerConfig::default(),
        )
    }

    /// Meters per degree of latitude along a meridian, measured with the
    /// same distance function the tracker uses.
    fn meters_per_degree() -> f64 {
        distance_meters(&Coordinate::new(0.0, 13.0), &Coordinate::new(1.0, 13.0))
    }

    fn north_of(origin: Coordinate, meters: f64) -> LocationSample {
        LocationSample::now(Coordinate::new(
            origin.latitude + meters / meters_per_degree(),
            origin.longitude,
        ))
    }

    fn record_into(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> impl Fn(&LocationSample) + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |_sample: &LocationSample| log.lock().unwrap().push(tag.to_string())
    }

    #[test]
    fn initial_authorization_comes_from_provider() {
        let h = harness(
            AuthorizationState::Denied,
            None,
            Ok(metadata()),
            TrackerConfig::default(),
        );
        assert_eq!(h.tracker.current_authorization(), AuthorizationState::Denied);
        assert!(h.tracker.last_accepted().is_none());
    }

    #[test]
    fn request_authorization_asks_for_foreground_access() {
        let h = default_harness();
        h.tracker.request_authorization();
        assert_eq!(h.provider.when_in_use_requests.load(Ordering::SeqCst), 1);
        assert_eq!(h.provider.always_requests.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn first_sample_is_baseline_without_notification() {
        let h = default_harness();
        let log = Arc::new(Mutex::new(Vec::new()));
        h.tracker.on_movement(record_into(&log, "a"));

        let first = LocationSample::now(PIRNA);
        assert_eq!(
            h.tracker.handle_locations(&[first]),
            Some(MovementDecision::Baseline)
        );
        assert_eq!(h.tracker.last_accepted(), Some(first));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn small_moves_are_discarded() {
        let h = default_harness();
        let log = Arc::new(Mutex::new(Vec::new()));
        h.tracker.on_movement(record_into(&log, "a"));

        let first = LocationSample::now(PIRNA);
        h.tracker.handle_locations(&[first]);
        let decision = h.tracker.handle_locations(&[north_of(PIRNA, 60.0)]);

        assert!(matches!(decision, Some(MovementDecision::Discarded { .. })));
        assert_eq!(h.tracker.last_accepted(), Some(first));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn significant_move_notifies_every_subscriber_once_in_order() {
        let h = default_harness();
        let log = Arc::new(Mutex::new(Vec::new()));
        h.tracker.on_movement(record_into(&log, "first"));
        h.tracker.on_movement(record_into(&log, "second"));
        h.tracker.on_movement(record_into(&log, "third"));

        h.tracker.handle_locations(&[LocationSample::now(PIRNA)]);
        let moved = north_of(PIRNA, 150.0);
        let decision = h.tracker.handle_locations(&[moved]);

        assert!(matches!(decision, Some(MovementDecision::Moved { .. })));
        assert_eq!(h.tracker.last_accepted(), Some(moved));
        assert_eq!(*log.lock().unwrap(), ["first", "second", "third"]);
    }

    #[test]
    fn distance_is_measured_from_the_held_sample() {
        let h = default_harness();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        h.tracker.on_movement(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        h.tracker.handle_locations(&[LocationSample::now(PIRNA)]);
        // The second step clears the threshold and becomes the new reference.
        h.tracker.handle_locations(&[north_of(PIRNA, 60.0)]);
        h.tracker.handle_locations(&[north_of(PIRNA, 120.0)]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        h.tracker.handle_locations(&[north_of(PIRNA, 180.0)]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sample_exactly_at_threshold_is_rejected() {
        let target = north_of(PIRNA, 100.0);
        let exact = distance_meters(&PIRNA, &target.coordinate);
        let h = harness(
            AuthorizationState::Undetermined,
            None,
            Ok(metadata()),
            TrackerConfig {
                movement_threshold_m: exact,
            },
        );
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        h.tracker.on_movement(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        h.tracker.handle_locations(&[LocationSample::now(PIRNA)]);
        let decision = h.tracker.handle_locations(&[target]);
        assert!(matches!(decision, Some(MovementDecision::Discarded { .. })));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn sample_just_past_threshold_is_accepted() {
        let target = north_of(PIRNA, 100.0001);
        let h = harness(
            AuthorizationState::Undetermined,
            None,
            Ok(metadata()),
            TrackerConfig {
                movement_threshold_m: 100.0,
            },
        );
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        h.tracker.on_movement(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        h.tracker.handle_locations(&[LocationSample::now(PIRNA)]);
        let decision = h.tracker.handle_locations(&[target]);
        assert!(matches!(decision, Some(MovementDecision::Moved { .. })));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn only_last_sample_of_a_batch_counts() {
        let h = default_harness();
        h.tracker.handle_locations(&[LocationSample::now(PIRNA)]);

        let far = north_of(PIRNA, 500.0);
        let near = north_of(PIRNA, 10.0);
        let decision = h.tracker.handle_locations(&[far, near]);
        assert!(matches!(decision, Some(MovementDecision::Discarded { .. })));
        assert_eq!(h.tracker.handle_locations(&[]), None);
    }

    #[tokio::test]
    async fn undetermined_escalates_once() {
        let h = default_harness();
        assert!(h
            .tracker
            .handle_authorization(AuthorizationState::Undetermined)
            .await
            .is_none());
        h.tracker
            .handle_authorization(AuthorizationState::Undetermined)
            .await;

        assert_eq!(h.provider.always_requests.load(Ordering::SeqCst), 1);
        assert_eq!(h.metadata.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            h.tracker.current_authorization(),
            AuthorizationState::Undetermined
        );
    }

    #[tokio::test]
    async fn denied_and_restricted_do_nothing() {
        let h = default_harness();
        for state in [AuthorizationState::Denied, AuthorizationState::Restricted] {
            assert!(h.tracker.handle_authorization(state).await.is_none());
            assert_eq!(h.tracker.current_authorization(), state);
        }
        assert_eq!(h.metadata.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.provider.always_requests.load(Ordering::SeqCst), 0);
        assert!(h.store.get(selection::SELECTED_CITY).is_none());
    }

    #[tokio::test]
    async fn authorization_selects_persists_and_notifies() {
        let h = default_harness();
        let mut selections = h.tracker.subscribe_selection();

        let selected = h
            .tracker
            .handle_authorization(AuthorizationState::AuthorizedForeground)
            .await
            .unwrap();

        assert_eq!(selected.city.id, "Dresden");
        assert_eq!(selected.location, PIRNA);
        assert_eq!(
            h.store.get(selection::SELECTED_CITY).as_deref(),
            Some("Dresden")
        );
        assert_eq!(
            h.store.get(selection::SELECTED_CITY_NAME).as_deref(),
            Some("Dresden")
        );
        assert_eq!(selections.try_recv().unwrap(), selected);
        assert_eq!(
            h.tracker.last_accepted().map(|s| s.coordinate),
            Some(PIRNA)
        );
    }

    #[tokio::test]
    async fn background_authorization_also_selects() {
        let zurich_suburb = Coordinate::new(47.42, 8.55);
        let h = harness(
            AuthorizationState::Undetermined,
            Some(zurich_suburb),
            Ok(metadata()),
            TrackerConfig::default(),
        );
        let selected = h
            .tracker
            .handle_authorization(AuthorizationState::AuthorizedBackground)
            .await
            .unwrap();
        assert_eq!(selected.city.id, "Zuerich");
        assert_eq!(
            h.store.get(selection::SELECTED_CITY_NAME).as_deref(),
            Some("Zürich")
        );
    }

    #[tokio::test]
    async fn no_fix_means_no_fetch() {
        let h = harness(
            AuthorizationState::Undetermined,
            None,
            Ok(metadata()),
            TrackerConfig::default(),
        );
        assert!(h
            .tracker
            .handle_authorization(AuthorizationState::AuthorizedForeground)
            .await
            .is_none());
        assert_eq!(h.metadata.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn metadata_failure_is_absorbed() {
        let h = harness(
            AuthorizationState::Undetermined,
            Some(PIRNA),
            Err(ClientError::Request {
                message: "offline".to_string(),
            }),
            TrackerConfig::default(),
        );
        let mut selections = h.tracker.subscribe_selection();

        assert!(h
            .tracker
            .handle_authorization(AuthorizationState::AuthorizedForeground)
            .await
            .is_none());
        assert_eq!(h.metadata.calls.load(Ordering::SeqCst), 1);
        assert!(h.store.get(selection::SELECTED_CITY).is_none());
        assert!(selections.try_recv().is_err());
        assert_eq!(
            h.tracker.current_authorization(),
            AuthorizationState::AuthorizedForeground
        );
    }

    #[tokio::test]
    async fn empty_catalog_is_absorbed() {
        let empty = Metadata {
            api_version: "1.0".to_string(),
            cities: BTreeMap::new(),
        };
        let h = harness(
            AuthorizationState::Undetermined,
            Some(PIRNA),
            Ok(empty),
            TrackerConfig::default(),
        );
        assert!(h
            .tracker
            .handle_authorization(AuthorizationState::AuthorizedForeground)
            .await
            .is_none());
        assert!(h.store.get(selection::SELECTED_CITY).is_none());
    }

    #[tokio::test]
    async fn authorization_keeps_an_existing_baseline() {
        let h = default_harness();
        let held = north_of(PIRNA, 5_000.0);
        h.tracker.handle_locations(&[held]);

        h.tracker
            .handle_authorization(AuthorizationState::AuthorizedForeground)
            .await;
        assert_eq!(h.tracker.last_accepted(), Some(held));
    }

    #[tokio::test]
    async fn run_processes_events_in_order() {
        let h = default_harness();
        let mut selections = h.tracker.subscribe_selection();
        let moves = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&moves);
        h.tracker.on_movement(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(Arc::clone(&h.tracker).run(rx));

        tx.send(ProviderEvent::AuthorizationChanged(
            AuthorizationState::AuthorizedForeground,
        ))
        .unwrap();
        tx.send(ProviderEvent::LocationsUpdated(vec![north_of(PIRNA, 20.0)]))
            .unwrap();
        tx.send(ProviderEvent::LocationsUpdated(vec![north_of(PIRNA, 400.0)]))
            .unwrap();
        drop(tx);
        task.await.unwrap();

        let selected = tokio::time::timeout(std::time::Duration::from_secs(5), selections.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(selected.city.id, "Dresden");
        assert_eq!(moves.load(Ordering::SeqCst), 1);
        assert_eq!(
            h.tracker.current_authorization(),
            AuthorizationState::AuthorizedForeground
        );
    }
}
