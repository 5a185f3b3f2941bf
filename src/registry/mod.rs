//! Static source catalog and gazetteer.
//!
//! The registry is parsed once at startup from the embedded TOML document
//! and is read-only afterwards; it is the authoritative table for trust
//! weights used during ingest and evidence scoring. The gazetteer rides in
//! the same file so collectors, geocoder, and store seed from one place.

use crate::types::{AssetType, SourceType};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

const BUILTIN_CATALOG: &str = include_str!("sources.toml");

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("catalog parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("source {key}: invalid homepage url {url}: {reason}")]
    BadHomepage {
        key: String,
        url: String,
        reason: String,
    },

    #[error("duplicate source key {0}")]
    DuplicateKey(String),
}

/// One publisher in the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceDescriptor {
    pub key: String,
    pub name: String,
    pub domain: String,
    pub source_type: SourceType,
    pub trust_weight: f64,
    #[serde(default)]
    pub feed_url: Option<String>,
    pub homepage_url: String,
    pub lang: String,
    pub country: String,
    /// Per-source keyword whitelist; empty means the language defaults apply.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// One geographic anchor: facility, city, or region.
#[derive(Debug, Clone, Deserialize)]
pub struct GazetteerEntry {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub lat: f64,
    pub lon: f64,
    pub asset_type: AssetType,
    pub country: String,
    /// 3 facility, 2 city, 1 region
    pub specificity: u8,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(rename = "source", default)]
    sources: Vec<SourceDescriptor>,
    #[serde(rename = "gazetteer", default)]
    gazetteer: Vec<GazetteerEntry>,
}

/// Process-wide catalog, read-only after init.
#[derive(Debug)]
pub struct SourceRegistry {
    sources: Vec<SourceDescriptor>,
    by_key: HashMap<String, usize>,
    gazetteer: Vec<GazetteerEntry>,
}

impl SourceRegistry {
    /// Parse the embedded catalog. Homepage URLs are validated here so a
    /// bad registry edit fails at startup, not at ingest time.
    pub fn builtin() -> Result<Arc<Self>, RegistryError> {
        Self::from_toml(BUILTIN_CATALOG)
    }

    pub fn from_toml(raw: &str) -> Result<Arc<Self>, RegistryError> {
        let parsed: CatalogFile = toml::from_str(raw)?;

        let mut by_key = HashMap::new();
        for (idx, source) in parsed.sources.iter().enumerate() {
            if by_key.insert(source.key.clone(), idx).is_some() {
                return Err(RegistryError::DuplicateKey(source.key.clone()));
            }
            if let Err(reason) = crate::validate::url::validate_public_url(&source.homepage_url) {
                return Err(RegistryError::BadHomepage {
                    key: source.key.clone(),
                    url: source.homepage_url.clone(),
                    reason: reason.to_string(),
                });
            }
        }

        Ok(Arc::new(Self {
            sources: parsed.sources,
            by_key,
            gazetteer: parsed.gazetteer,
        }))
    }

    pub fn get(&self, key: &str) -> Option<&SourceDescriptor> {
        self.by_key.get(key).map(|idx| &self.sources[*idx])
    }

    /// Look up a source by its registered `(domain, source_type)` identity.
    pub fn by_domain(&self, domain: &str, source_type: SourceType) -> Option<&SourceDescriptor> {
        self.sources
            .iter()
            .find(|s| s.domain == domain && s.source_type == source_type)
    }

    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    pub fn active_sources(&self) -> impl Iterator<Item = &SourceDescriptor> {
        self.sources.iter().filter(|s| s.is_active)
    }

    pub fn gazetteer(&self) -> &[GazetteerEntry] {
        &self.gazetteer
    }

    /// Registry trust weight for a domain, falling back to the source-type
    /// default for publishers we have never cataloged.
    pub fn trust_weight(&self, domain: &str, source_type: SourceType) -> f64 {
        self.by_domain(domain, source_type)
            .map_or_else(|| source_type.default_trust_weight(), |s| s.trust_weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_parses() {
        let registry = SourceRegistry::builtin().unwrap();
        assert!(registry.sources().len() >= 8);
        assert!(registry.gazetteer().len() >= 30);
    }

    #[test]
    fn known_sources_resolve_by_key_and_domain() {
        let registry = SourceRegistry::builtin().unwrap();
        let police = registry.get("dk_police").unwrap();
        assert_eq!(police.source_type, SourceType::Police);
        assert_eq!(police.trust_weight, 4.0);
        assert_eq!(police.country, "DK");

        let by_domain = registry.by_domain("politi.dk", SourceType::Police).unwrap();
        assert_eq!(by_domain.key, "dk_police");
    }

    #[test]
    fn trust_weight_falls_back_to_type_default() {
        let registry = SourceRegistry::builtin().unwrap();
        assert_eq!(registry.trust_weight("politi.dk", SourceType::Police), 4.0);
        assert_eq!(registry.trust_weight("unknown.example-blog.net", SourceType::Social), 1.0);
        assert_eq!(registry.trust_weight("dr.dk", SourceType::Media), 3.0);
    }

    #[test]
    fn gazetteer_carries_asset_types_and_specificity() {
        let registry = SourceRegistry::builtin().unwrap();
        let aalborg = registry
            .gazetteer()
            .iter()
            .find(|e| e.name == "aalborg lufthavn")
            .unwrap();
        assert_eq!(aalborg.asset_type, AssetType::Airport);
        assert_eq!(aalborg.specificity, 3);
        assert_eq!(aalborg.country, "DK");
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let raw = r#"
            [[source]]
            key = "a"
            name = "A"
            domain = "a.example-news.dk"
            source_type = "media"
            trust_weight = 2.0
            homepage_url = "https://a.dk"
            lang = "da"
            country = "DK"

            [[source]]
            key = "a"
            name = "A again"
            domain = "a2.dk"
            source_type = "media"
            trust_weight = 2.0
            homepage_url = "https://a2.dk"
            lang = "da"
            country = "DK"
        "#;
        assert!(matches!(
            SourceRegistry::from_toml(raw).map(|_| ()),
            Err(RegistryError::DuplicateKey(_))
        ));
    }
}
