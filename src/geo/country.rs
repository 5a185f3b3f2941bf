//! Coordinate→country resolution over documented per-country rectangles.
//!
//! The table is intentionally coarse: it exists so that an incident's
//! `country` column can be derived from coordinates without a reverse
//! geocoding service, and it is mirrored verbatim by `country_for_point()`
//! in `migrations/0002_validation.sql`. The two copies must stay identical:
//! same rectangles, same order, first match wins, `XX` when nothing matches.
//!
//! Rectangles overlap at borders; declaration order resolves the overlap
//! (small/specific countries come before the large neighbors that engulf
//! them). Coastal waters inherit the nearest country's rectangle.

/// `(iso_alpha2, lat_min, lat_max, lon_min, lon_max)`
///
/// Countries with awkward shapes get several boxes (Denmark, Norway) so the
/// first-match rule does not swallow a neighbor's capital.
pub const COUNTRY_BOXES: &[(&str, f64, f64, f64, f64)] = &[
    ("DK", 54.5, 57.8, 8.0, 11.0),  // Jutland, Funen
    ("DK", 54.9, 56.5, 10.9, 12.8), // Zealand
    ("DK", 54.9, 55.4, 14.6, 15.3), // Bornholm
    ("NL", 50.7, 53.6, 3.3, 7.2),
    ("BE", 49.5, 51.5, 2.5, 6.4),
    ("LU", 49.4, 50.2, 5.7, 6.5),
    ("CH", 45.8, 47.8, 5.9, 10.5),
    ("AT", 46.3, 49.0, 9.5, 17.2),
    ("CZ", 48.5, 51.1, 12.0, 18.9),
    ("SK", 47.7, 49.6, 16.8, 22.6),
    ("HU", 45.7, 48.6, 16.1, 22.9),
    ("SI", 45.4, 46.9, 13.3, 16.6),
    ("HR", 42.4, 46.6, 13.5, 19.4),
    ("EE", 57.5, 59.7, 21.7, 28.2),
    ("LV", 55.6, 58.1, 20.9, 28.2),
    ("LT", 53.9, 56.4, 20.9, 26.8),
    ("IE", 51.4, 55.4, -10.5, -5.9),
    ("PT", 36.9, 42.2, -9.5, -6.2),
    ("GB", 49.9, 58.7, -8.2, 1.8),
    ("NO", 57.9, 65.0, 4.6, 12.9),  // southern Norway
    ("SE", 55.3, 69.1, 11.1, 24.2),
    ("FI", 59.8, 70.1, 20.5, 31.6),
    ("NO", 65.0, 71.2, 11.0, 31.1), // northern Norway
    ("PL", 49.0, 54.9, 14.1, 24.2),
    ("DE", 47.3, 55.1, 5.9, 15.0),
    ("FR", 42.3, 51.1, -4.8, 8.2),
    ("ES", 36.0, 43.8, -9.3, 3.3),
    ("IT", 36.6, 47.1, 6.6, 18.5),
    ("GR", 35.0, 41.8, 19.4, 28.2),
    ("RO", 43.6, 48.3, 20.2, 29.7),
    ("BG", 41.2, 44.2, 22.3, 28.6),
    ("RS", 42.2, 46.2, 18.8, 23.0),
];

/// Country code returned when no rectangle matches.
pub const UNKNOWN_COUNTRY: &str = "XX";

/// Resolve a coordinate to an ISO-3166-1 alpha-2 code.
pub fn country_for(lat: f64, lon: f64) -> &'static str {
    for (code, lat_min, lat_max, lon_min, lon_max) in COUNTRY_BOXES {
        if lat >= *lat_min && lat <= *lat_max && lon >= *lon_min && lon <= *lon_max {
            return code;
        }
    }
    UNKNOWN_COUNTRY
}

#[cfg(test)]
mod tests {
    use super::*;

    // These pins double as the agreement fixture for the SQL mirror: the
    // DB-gated suite feeds the same points to country_for_point().
    pub const PINS: &[(f64, f64, &str)] = &[
        (57.093, 9.849, "DK"),   // Aalborg Airport
        (55.68, 12.57, "DK"),    // Copenhagen
        (59.91, 10.75, "NO"),    // Oslo
        (60.39, 5.32, "NO"),     // Bergen
        (59.33, 18.07, "SE"),    // Stockholm
        (57.70, 11.97, "SE"),    // Gothenburg
        (55.60, 13.00, "SE"),    // Malmo
        (60.17, 24.94, "FI"),    // Helsinki
        (52.52, 13.40, "DE"),    // Berlin
        (52.37, 4.90, "NL"),     // Amsterdam
        (50.85, 4.35, "BE"),     // Brussels
        (48.86, 2.35, "FR"),     // Paris
        (51.51, -0.13, "GB"),    // London
        (53.35, -6.26, "IE"),    // Dublin
        (40.42, -3.70, "ES"),    // Madrid
        (38.72, -9.14, "PT"),    // Lisbon
        (41.90, 12.50, "IT"),    // Rome
        (52.23, 21.01, "PL"),    // Warsaw
        (59.44, 24.75, "EE"),    // Tallinn
        (37.98, 23.73, "GR"),    // Athens
        (47.50, 19.04, "HU"),    // Budapest
        (36.14, -5.35, "ES"),    // Gibraltar strait edge
        (70.5, 25.0, "NO"),      // Finnmark
    ];

    #[test]
    fn pinned_points_resolve() {
        for (lat, lon, expected) in PINS {
            assert_eq!(country_for(*lat, *lon), *expected, "({lat}, {lon})");
        }
    }

    #[test]
    fn unmatched_points_fall_back_to_xx() {
        assert_eq!(country_for(41.88, -87.63), UNKNOWN_COUNTRY); // Chicago
        assert_eq!(country_for(64.1, -21.9), UNKNOWN_COUNTRY); // Reykjavik, outside table
        assert_eq!(country_for(36.0, 28.5), UNKNOWN_COUNTRY); // east Mediterranean gap
    }

    #[test]
    fn declaration_order_resolves_border_overlaps() {
        // Flensburg area sits in both the DK and DE rectangles; DK is
        // declared first and wins, which is the documented behavior.
        assert_eq!(country_for(54.8, 9.4), "DK");
    }
}
