//! Core domain types shared across the pipeline, store, and API.
//!
//! String representations follow the wire/database form: lowercase
//! `snake_case` for every enum. `Display` and `FromStr` round-trip through
//! the same strings serde uses, so SQL text columns and JSON payloads agree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of protected infrastructure a drone incident pertains to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Airport,
    Harbor,
    Military,
    Powerplant,
    Bridge,
    Other,
}

impl AssetType {
    /// Merge radius in meters for spatial deduplication.
    ///
    /// Airports and military sites are large perimeters; harbors span
    /// basins; everything else collapses to a tight point match.
    pub fn merge_radius_m(self) -> f64 {
        match self {
            AssetType::Airport | AssetType::Military => 3_000.0,
            AssetType::Harbor => 1_500.0,
            AssetType::Powerplant => 1_000.0,
            AssetType::Bridge | AssetType::Other => 500.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssetType::Airport => "airport",
            AssetType::Harbor => "harbor",
            AssetType::Military => "military",
            AssetType::Powerplant => "powerplant",
            AssetType::Bridge => "bridge",
            AssetType::Other => "other",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "airport" => Ok(AssetType::Airport),
            "harbor" => Ok(AssetType::Harbor),
            "military" => Ok(AssetType::Military),
            "powerplant" => Ok(AssetType::Powerplant),
            "bridge" => Ok(AssetType::Bridge),
            "other" => Ok(AssetType::Other),
            other => Err(format!("unknown asset type: {other}")),
        }
    }
}

/// The kind of publisher behind a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Police,
    Notam,
    Media,
    Social,
    Osint,
    AviationAuthority,
    Other,
}

impl SourceType {
    /// Trust weight used when neither the registry nor the ingest payload
    /// carries an explicit value: 4 official, 2 media, 1 social/unknown.
    pub fn default_trust_weight(self) -> f64 {
        match self {
            SourceType::Police | SourceType::Notam | SourceType::AviationAuthority => 4.0,
            SourceType::Media | SourceType::Osint => 2.0,
            SourceType::Social | SourceType::Other => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Police => "police",
            SourceType::Notam => "notam",
            SourceType::Media => "media",
            SourceType::Social => "social",
            SourceType::Osint => "osint",
            SourceType::AviationAuthority => "aviation_authority",
            SourceType::Other => "other",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "police" => Ok(SourceType::Police),
            "notam" => Ok(SourceType::Notam),
            "media" => Ok(SourceType::Media),
            "social" => Ok(SourceType::Social),
            "osint" => Ok(SourceType::Osint),
            "aviation_authority" => Ok(SourceType::AviationAuthority),
            "other" => Ok(SourceType::Other),
            other => Err(format!("unknown source type: {other}")),
        }
    }
}

/// Lifecycle status of a consolidated incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Active,
    Resolved,
    Unconfirmed,
    FalsePositive,
}

impl IncidentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IncidentStatus::Active => "active",
            IncidentStatus::Resolved => "resolved",
            IncidentStatus::Unconfirmed => "unconfirmed",
            IncidentStatus::FalsePositive => "false_positive",
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(IncidentStatus::Active),
            "resolved" => Ok(IncidentStatus::Resolved),
            "unconfirmed" => Ok(IncidentStatus::Unconfirmed),
            "false_positive" => Ok(IncidentStatus::FalsePositive),
            other => Err(format!("unknown incident status: {other}")),
        }
    }
}

/// A raw report emitted by a collector, before any validation.
///
/// Collectors only fetch and surface-extract; they never decide whether a
/// report describes an actual incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawReport {
    /// Registry key of the originating source
    pub source_key: String,
    /// Canonical URL of the article/post
    pub source_url: String,
    /// Publication timestamp as reported by the feed
    pub published_at: Option<DateTime<Utc>>,
    /// Raw title text
    pub title: String,
    /// Raw body or excerpt text
    pub body: String,
    /// ISO 639-1 language hint from the source descriptor
    pub lang: Option<String>,
    /// Pre-extracted location string, when the feed carries one
    pub location_hint: Option<String>,
}

/// A report that has passed validation and geocoding and is ready for the
/// dedup + store stage.
#[derive(Debug, Clone)]
pub struct IncidentCandidate {
    pub title: String,
    pub narrative: String,
    pub occurred_at: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub asset_type: AssetType,
    pub status: IncidentStatus,
    /// ISO-3166-1 alpha-2; derived from coordinates when absent
    pub country: Option<String>,
    pub sources: Vec<SourceRef>,
}

/// One source attachment carried by an ingest request or pipeline candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub source_url: String,
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_quote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

/// A source attachment row joined onto an incident for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentSourceView {
    pub source_url: String,
    pub source_type: String,
    pub source_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_quote: Option<String>,
    pub trust_weight: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_type_round_trips_through_strings() {
        for at in [
            AssetType::Airport,
            AssetType::Harbor,
            AssetType::Military,
            AssetType::Powerplant,
            AssetType::Bridge,
            AssetType::Other,
        ] {
            assert_eq!(at.as_str().parse::<AssetType>().ok(), Some(at));
        }
    }

    #[test]
    fn source_type_snake_case_wire_form() {
        let json = serde_json::to_string(&SourceType::AviationAuthority).unwrap();
        assert_eq!(json, "\"aviation_authority\"");
        assert_eq!(
            "aviation_authority".parse::<SourceType>().ok(),
            Some(SourceType::AviationAuthority)
        );
    }

    #[test]
    fn merge_radii_are_asset_aware() {
        assert_eq!(AssetType::Airport.merge_radius_m(), 3_000.0);
        assert_eq!(AssetType::Military.merge_radius_m(), 3_000.0);
        assert_eq!(AssetType::Harbor.merge_radius_m(), 1_500.0);
        assert_eq!(AssetType::Powerplant.merge_radius_m(), 1_000.0);
        assert_eq!(AssetType::Other.merge_radius_m(), 500.0);
    }

    #[test]
    fn trust_weight_defaults_follow_tiers() {
        assert_eq!(SourceType::Police.default_trust_weight(), 4.0);
        assert_eq!(SourceType::AviationAuthority.default_trust_weight(), 4.0);
        assert_eq!(SourceType::Media.default_trust_weight(), 2.0);
        assert_eq!(SourceType::Social.default_trust_weight(), 1.0);
    }

    #[test]
    fn status_round_trips() {
        assert_eq!(
            "false_positive".parse::<IncidentStatus>().ok(),
            Some(IncidentStatus::FalsePositive)
        );
        assert_eq!(IncidentStatus::FalsePositive.to_string(), "false_positive");
    }
}
