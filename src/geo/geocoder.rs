//! Gazetteer-based geocoding of report text.
//!
//! Resolution is longest-match first, then specificity (facility > city >
//! region), then the report's source country as a tie-break. A report whose
//! best matches still point at different places is rejected as ambiguous
//! rather than guessed at.

use crate::registry::{GazetteerEntry, SourceRegistry};
use crate::types::AssetType;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeocodeError {
    #[error("no known location in report text")]
    NoMatch,

    #[error("ambiguous location: {candidates:?}")]
    Ambiguous { candidates: Vec<String> },
}

/// A resolved location. `country` comes from the coordinate→country table,
/// not from the gazetteer entry, so the store trigger derives the same code.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedLocation {
    pub lat: f64,
    pub lon: f64,
    pub asset_type: AssetType,
    pub country: String,
    /// The gazetteer anchor that matched, for logging and audit.
    pub anchor: String,
}

pub struct Geocoder {
    registry: Arc<SourceRegistry>,
}

struct Candidate<'a> {
    entry: &'a GazetteerEntry,
    matched: &'a str,
}

/// Lowercase, fold the European diacritics the feeds actually carry to
/// ASCII, and collapse everything else to single spaces. Gazetteer anchors
/// are written in this folded form.
fn fold_text(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        match c {
            'æ' => folded.push_str("ae"),
            'ø' | 'ö' | 'ô' | 'ó' => folded.push('o'),
            'å' | 'ä' | 'à' | 'á' | 'â' => folded.push('a'),
            'é' | 'è' | 'ê' | 'ë' => folded.push('e'),
            'ü' | 'ú' | 'ù' => folded.push('u'),
            'í' | 'î' | 'ï' => folded.push('i'),
            'ß' => folded.push_str("ss"),
            'ç' => folded.push('c'),
            'ñ' => folded.push('n'),
            c if c.is_ascii_alphanumeric() => folded.push(c),
            _ => folded.push(' '),
        }
    }
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl Geocoder {
    pub fn new(registry: Arc<SourceRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve the location of a report from its text hints.
    ///
    /// `texts` are scanned in priority order (explicit location hint first,
    /// then title, then body); all matches across all texts compete on
    /// length and specificity.
    pub fn resolve(
        &self,
        texts: &[&str],
        source_country: Option<&str>,
    ) -> Result<GeocodedLocation, GeocodeError> {
        let normalized: Vec<String> = texts
            .iter()
            .map(|t| format!(" {} ", fold_text(t)))
            .collect();

        let mut candidates: Vec<Candidate<'_>> = Vec::new();
        for entry in self.registry.gazetteer() {
            let matched = std::iter::once(entry.name.as_str())
                .chain(entry.aliases.iter().map(String::as_str))
                .find(|anchor| {
                    let needle = format!(" {anchor} ");
                    normalized.iter().any(|text| text.contains(&needle))
                });
            if let Some(matched) = matched {
                candidates.push(Candidate { entry, matched });
            }
        }

        if candidates.is_empty() {
            return Err(GeocodeError::NoMatch);
        }

        // Longest anchor first, then the most specific entry.
        candidates.sort_by(|a, b| {
            b.matched
                .len()
                .cmp(&a.matched.len())
                .then(b.entry.specificity.cmp(&a.entry.specificity))
        });

        let best_len = candidates[0].matched.len();
        let best_spec = candidates[0].entry.specificity;
        let mut top: Vec<&Candidate<'_>> = candidates
            .iter()
            .take_while(|c| c.matched.len() == best_len && c.entry.specificity == best_spec)
            .collect();

        if top.len() > 1 {
            if let Some(country) = source_country {
                let same_country: Vec<&Candidate<'_>> = top
                    .iter()
                    .copied()
                    .filter(|c| c.entry.country == country)
                    .collect();
                if !same_country.is_empty() {
                    top = same_country;
                }
            }
        }

        // Distinct anchors pointing at the same cell are not ambiguous.
        let (first, rest) = match top.split_first() {
            Some(split) => split,
            None => return Err(GeocodeError::NoMatch),
        };
        let all_same_place = rest.iter().all(|c| {
            (c.entry.lat - first.entry.lat).abs() < 0.001
                && (c.entry.lon - first.entry.lon).abs() < 0.001
        });
        if !all_same_place {
            return Err(GeocodeError::Ambiguous {
                candidates: top.iter().map(|c| c.entry.name.clone()).collect(),
            });
        }

        let entry = first.entry;
        Ok(GeocodedLocation {
            lat: entry.lat,
            lon: entry.lon,
            asset_type: entry.asset_type,
            country: super::country_for(entry.lat, entry.lon).to_string(),
            anchor: first.matched.to_string(),
        })
    }
}
