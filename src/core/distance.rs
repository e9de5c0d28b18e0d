use geo::{HaversineDistance, Point};

use crate::models::Coordinates;

/// Calculate the great-circle distance between two points in kilometers
///
/// # Arguments
/// * `from` - First point in degrees
/// * `to` - Second point in degrees
///
/// # Returns
/// Distance in kilometers
#[inline]
pub fn haversine_distance(from: Coordinates, to: Coordinates) -> f64 {
    let a = Point::new(from.longitude, from.latitude);
    let b = Point::new(to.longitude, to.latitude);

    a.haversine_distance(&b) / 1000.0
}
