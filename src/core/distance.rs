use crate::models::Coordinate;

/// Earth's radius in miles
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Great-circle distance between two coordinates in miles (haversine).
///
/// Inputs are not range-checked. The result is NaN when any component is NaN;
/// callers must treat that as "exclude".
#[inline]
pub fn distance_miles(a: Coordinate, b: Coordinate) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    // Rounding can push `h` a hair outside [0, 1] for antipodal points.
    let h = h.clamp(0.0, 1.0);

    2.0 * h.sqrt().atan2((1.0 - h).sqrt()) * EARTH_RADIUS_MILES
}
