//! `parkendd track`: drives the location tracker from `lat,lng` lines on
//! stdin.
//!
//! The first valid fix stands in for the platform granting foreground
//! authorization, which triggers the nearest-city selection. Every fix is
//! then fed through the movement filter.

use std::sync::{Arc, Mutex, PoisonError};

use parkendd_client::MetadataSource;
use parkendd_location::{
    LocationProvider, LocationTracker, ProviderEvent, SelectionChanged, TrackerConfig,
};
use parkendd_models::{AuthorizationState, Coordinate, KeyValueStore, LocationSample};
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tokio::sync::{broadcast, mpsc};

/// Parses a `lat,lng` pair in decimal degrees.
///
/// # Errors
///
/// * If the input is not two comma separated numbers
/// * If either value is outside the valid WGS84 range
pub fn parse_coordinate(input: &str) -> Result<Coordinate, String> {
    let (lat, lng) = input
        .split_once(',')
        .ok_or_else(|| format!("expected \"lat,lng\", got {input:?}"))?;
    let latitude: f64 = lat
        .trim()
        .parse()
        .map_err(|e| format!("invalid latitude {lat:?}: {e}"))?;
    let longitude: f64 = lng
        .trim()
        .parse()
        .map_err(|e| format!("invalid longitude {lng:?}: {e}"))?;

    if !(-90.0..=90.0).contains(&latitude) {
        return Err(format!("latitude {latitude} out of range"));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(format!("longitude {longitude} out of range"));
    }
    Ok(Coordinate::new(latitude, longitude))
}

/// A [`LocationProvider`] fed from the command line.
#[derive(Debug)]
struct StdinProvider {
    authorization: Mutex<AuthorizationState>,
    last_known: Mutex<Option<Coordinate>>,
}

impl StdinProvider {
    const fn new() -> Self {
        Self {
            authorization: Mutex::new(AuthorizationState::Undetermined),
            last_known: Mutex::new(None),
        }
    }

    fn record(&self, coordinate: Coordinate) {
        *self
            .last_known
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(coordinate);
    }
}

impl LocationProvider for StdinProvider {
    fn authorization(&self) -> AuthorizationState {
        *self
            .authorization
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn request_when_in_use_authorization(&self) {
        *self
            .authorization
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = AuthorizationState::AuthorizedForeground;
    }

    fn request_always_authorization(&self) {
        log::info!("Background location is not available from the command line");
    }

    fn last_known_coordinate(&self) -> Option<Coordinate> {
        *self.last_known.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn print_selections(mut selections: broadcast::Receiver<SelectionChanged>) {
    loop {
        match selections.recv().await {
            Ok(event) => println!(
                "Selected {} ({}) for {:.5},{:.5}",
                event.city.name,
                event.city.id,
                event.location.latitude,
                event.location.longitude
            ),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                log::warn!("Missed {skipped} selection notifications");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Runs the tracker until stdin is exhausted.
///
/// # Errors
///
/// * If reading from stdin fails
pub async fn run(
    metadata: Arc<dyn MetadataSource>,
    store: Arc<dyn KeyValueStore>,
    config: TrackerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let provider = Arc::new(StdinProvider::new());
    let tracker = Arc::new(LocationTracker::new(
        provider.clone(),
        metadata,
        store,
        config,
    ));

    tracker.on_movement(|sample| {
        println!(
            "Moved to {:.5},{:.5}",
            sample.coordinate.latitude, sample.coordinate.longitude
        );
    });
    let printer = tokio::spawn(print_selections(tracker.subscribe_selection()));

    let (events, receiver) = mpsc::unbounded_channel();
    let runner = tokio::spawn(Arc::clone(&tracker).run(receiver));

    let mut authorized = false;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let coordinate = match parse_coordinate(line) {
            Ok(coordinate) => coordinate,
            Err(e) => {
                log::warn!("Skipping line: {e}");
                continue;
            }
        };

        provider.record(coordinate);
        if !authorized {
            authorized = true;
            tracker.request_authorization();
            let _ = events.send(ProviderEvent::AuthorizationChanged(provider.authorization()));
        }
        let _ = events.send(ProviderEvent::LocationsUpdated(vec![LocationSample::now(
            coordinate,
        )]));
    }

    drop(events);
    runner.await?;
    // The printer stops once every tracker handle, including the one held by
    // a still running selection, has been dropped.
    drop(tracker);
    printer.await?;

    Ok(())
}
