//! Great-circle distance between two coordinates.

use geo::{Distance, Haversine, Point};
use parkendd_models::Coordinate;

/// Haversine distance between `a` and `b` in meters.
#[must_use]
pub fn distance_meters(a: &Coordinate, b: &Coordinate) -> f64 {
    Haversine.distance(to_point(a), to_point(b))
}

/// `geo` points are `(x, y)`, i.e. longitude first.
fn to_point(coord: &Coordinate) -> Point<f64> {
    Point::new(coord.longitude, coord.latitude)
}
