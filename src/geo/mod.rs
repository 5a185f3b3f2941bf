//! Geographic primitives: the European admit region, great-circle distance,
//! and the coordinate→country table shared with the database trigger.

pub mod country;
pub mod geocoder;

pub use country::country_for;
pub use geocoder::{GeocodeError, Geocoder, GeocodedLocation};

/// Authoritative admit region for coordinates, degrees north.
pub const LAT_MIN: f64 = 35.0;
pub const LAT_MAX: f64 = 71.0;
/// Degrees east.
pub const LON_MIN: f64 = -10.0;
pub const LON_MAX: f64 = 31.0;

/// Mean Earth radius in meters, consistent with PostGIS geography distances
/// at the precision the merge radii care about.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Whether a coordinate pair falls inside the European bounding box.
/// Boundary values are included.
pub fn within_european_bounds(lat: f64, lon: f64) -> bool {
    (LAT_MIN..=LAT_MAX).contains(&lat) && (LON_MIN..=LON_MAX).contains(&lon)
}

/// Whether the values are even plausible planet coordinates. Anything
/// failing this is a malformed request, not an out-of-region report.
pub fn plausible_coordinates(lat: f64, lon: f64) -> bool {
    lat.is_finite() && lon.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

/// Great-circle distance between two points in meters (haversine).
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_include_the_boundary() {
        assert!(within_european_bounds(35.0, -10.0));
        assert!(within_european_bounds(71.0, 31.0));
        assert!(within_european_bounds(57.093, 9.849));
        assert!(!within_european_bounds(34.999, 0.0));
        assert!(!within_european_bounds(41.88, -87.63)); // Chicago
    }

    #[test]
    fn implausible_coordinates_are_distinguished_from_foreign_ones() {
        assert!(plausible_coordinates(41.88, -87.63));
        assert!(!plausible_coordinates(f64::NAN, 0.0));
        assert!(!plausible_coordinates(91.0, 0.0));
        assert!(!plausible_coordinates(0.0, 181.0));
    }

    #[test]
    fn haversine_matches_known_distances() {
        // Aalborg Airport to Aalborg harbor front, roughly 5.8 km
        let d = haversine_m(57.093, 9.849, 57.056, 9.922);
        assert!((5_000.0..7_000.0).contains(&d), "got {d}");

        // Same point is zero
        assert_eq!(haversine_m(57.093, 9.849, 57.093, 9.849), 0.0);

        // ~2.9 km north of Aalborg Airport (1 deg lat = ~111.19 km)
        let d = haversine_m(57.093, 9.849, 57.093 + 2.9 / 111.19, 9.849);
        assert!((2_850.0..2_950.0).contains(&d), "got {d}");
    }
}
