//! Content and location fingerprints for incident deduplication.
//!
//! The canonical forms here are mirrored by the database validation trigger
//! (`migrations/0002_validation.sql`); a change on either side must be made
//! on both. Coordinates are rounded to 3 decimal places (~110 m cells), the
//! occurred-at date is the UTC calendar date, and fields are joined with `|`.

use crate::types::AssetType;
use chrono::{DateTime, Utc};

/// Lowercase the title and strip everything but ASCII alphanumerics and
/// spaces, then collapse space runs. Strip means delete: punctuation leaves
/// no gap behind, matching the trigger's `regexp_replace` chain.
pub fn normalize_title(title: &str) -> String {
    let stripped: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 16-hex-char spatial equivalence key over rounded coordinates and asset
/// type. Two reports in the same ~110 m cell at the same asset share a key.
pub fn location_hash(lon: f64, lat: f64, asset_type: AssetType) -> String {
    let digest = md5::compute(format!("{lon:.3}|{lat:.3}|{asset_type}"));
    format!("{digest:x}")[..16].to_string()
}

/// Primary duplicate barrier: 32-hex-char digest over the UTC date of the
/// incident, rounded coordinates, normalized title, and asset type.
pub fn content_hash(
    occurred_at: DateTime<Utc>,
    lon: f64,
    lat: f64,
    normalized_title: &str,
    asset_type: AssetType,
) -> String {
    let date = occurred_at.format("%Y-%m-%d");
    let digest = md5::compute(format!(
        "{date}|{lon:.3}|{lat:.3}|{normalized_title}|{asset_type}"
    ));
    format!("{digest:x}")
}

/// Scraper-cache fingerprint of a processed raw report. Keyed on the source
/// URL plus the raw title so a re-published article with an edited headline
/// is processed again.
pub fn report_fingerprint(source_url: &str, title: &str) -> String {
    let digest = md5::compute(format!("{source_url}|{title}"));
    format!("{digest:x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(
            normalize_title("Droner over Aalborg Lufthavn"),
            "droner over aalborg lufthavn"
        );
        assert_eq!(
            normalize_title("Drone sighting at Kastrup!!"),
            "drone sighting at kastrup"
        );
        assert_eq!(normalize_title("  A  --  B  "), "a b");
    }

    #[test]
    fn normalize_drops_non_ascii_letters() {
        // Danish letters fall outside the a-z0-9 alphabet on both the Rust
        // and the SQL side; they are deleted, not replaced.
        assert_eq!(normalize_title("Dron\u{e9}r p\u{e5} Bornholm"), "dronr p bornholm");
    }

    #[test]
    fn content_hash_is_pinned() {
        let occurred = Utc.with_ymd_and_hms(2025, 9, 24, 2, 30, 0).unwrap();
        let hash = content_hash(
            occurred,
            9.849,
            57.093,
            "droner over aalborg lufthavn",
            AssetType::Airport,
        );
        assert_eq!(hash, "92c529e5ca52754f58f1ccd6d17db466");
    }

    #[test]
    fn content_hash_ignores_time_of_day_within_a_date() {
        let morning = Utc.with_ymd_and_hms(2025, 9, 24, 2, 30, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2025, 9, 24, 22, 5, 0).unwrap();
        let a = content_hash(morning, 9.849, 57.093, "droner", AssetType::Airport);
        let b = content_hash(evening, 9.849, 57.093, "droner", AssetType::Airport);
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_varies_with_rounded_coords() {
        let occurred = Utc.with_ymd_and_hms(2025, 9, 24, 2, 30, 0).unwrap();
        let a = content_hash(occurred, 9.849, 57.093, "droner", AssetType::Airport);
        // 4th decimal only — rounds to the same cell
        let b = content_hash(occurred, 9.8492, 57.0931, "droner", AssetType::Airport);
        // 3rd decimal — different cell
        let c = content_hash(occurred, 9.851, 57.093, "droner", AssetType::Airport);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn content_hash_handles_negative_longitudes() {
        let occurred = Utc.with_ymd_and_hms(2025, 9, 24, 12, 0, 0).unwrap();
        let hash = content_hash(occurred, -9.135, 38.774, "drone incident", AssetType::Airport);
        assert_eq!(hash, "b465515120363304ce1e8a2ba3c03bf5");
    }

    #[test]
    fn location_hash_is_16_hex_chars() {
        let hash = location_hash(9.849, 57.093, AssetType::Airport);
        assert_eq!(hash, "45158b448aed42e8");
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn report_fingerprint_is_stable() {
        let fp = report_fingerprint("https://politi.dk/x", "Droner over Aalborg Lufthavn");
        assert_eq!(fp, "6706818cd85f41a4b782c93af904218f");
        assert_eq!(
            fp,
            report_fingerprint("https://politi.dk/x", "Droner over Aalborg Lufthavn")
        );
    }
}
