//! Nearest-city selection and proximity ranking.
//!
//! Ranking uses a stable sort on great-circle distance, so candidates at
//! exactly the same distance keep their input order. In particular
//! [`select_nearest`] returns the *first* of several equidistant cities.

use parkendd_models::{City, Coordinate, ParkingLot};

use crate::distance_meters;

/// Errors from nearest-city selection.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectError {
    /// No candidate cities were supplied.
    #[error("Cannot select the nearest city from an empty catalog")]
    EmptyCatalog,
}

/// Returns the city closest to `from`.
///
/// Ties resolve to the earliest city in `cities`. Neither the cities nor
/// the coordinate are modified.
///
/// # Errors
///
/// Returns [`SelectError::EmptyCatalog`] if `cities` is empty.
pub fn select_nearest<'a>(cities: &'a [City], from: &Coordinate) -> Result<&'a City, SelectError> {
    rank_by_distance(cities, from)
        .into_iter()
        .next()
        .map(|(city, _)| city)
        .ok_or(SelectError::EmptyCatalog)
}

/// All cities paired with their distance from `from` in meters, nearest
/// first.
#[must_use]
pub fn rank_by_distance<'a>(cities: &'a [City], from: &Coordinate) -> Vec<(&'a City, f64)> {
    let mut ranked: Vec<(&City, f64)> = cities
        .iter()
        .map(|city| (city, distance_meters(from, &city.coordinate)))
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked
}

/// Lots with a known position paired with their distance from `from`,
/// nearest first. Lots without coordinates are left out.
#[must_use]
pub fn rank_lots<'a>(lots: &'a [ParkingLot], from: &Coordinate) -> Vec<(&'a ParkingLot, f64)> {
    let mut ranked: Vec<(&ParkingLot, f64)> = lots
        .iter()
        .filter_map(|lot| {
            lot.coordinate
                .map(|coordinate| (lot, distance_meters(from, &coordinate)))
        })
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked
}
