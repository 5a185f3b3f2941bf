//! Source rows: registry sync, ingest-time resolution, and display-name
//! fallbacks for API responses.

use super::StoreError;
use crate::registry::SourceRegistry;
use crate::types::{SourceRef, SourceType};
use crate::validate::url::domain_of;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

/// Upsert every registry descriptor into the sources table so incident
/// attachments always have a source row to reference. Registry values win
/// on conflict; operator edits to rows the registry does not know about
/// are left alone.
pub async fn sync_registry(pool: &PgPool, registry: &SourceRegistry) -> Result<(), StoreError> {
    for descriptor in registry.sources() {
        sqlx::query(
            r#"INSERT INTO sources (name, domain, source_type, homepage_url, feed_url,
                trust_weight, country, is_active)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               ON CONFLICT (domain, source_type) DO UPDATE SET
                name = EXCLUDED.name,
                homepage_url = EXCLUDED.homepage_url,
                feed_url = EXCLUDED.feed_url,
                trust_weight = EXCLUDED.trust_weight,
                country = EXCLUDED.country,
                is_active = EXCLUDED.is_active,
                updated_at = NOW()"#,
        )
        .bind(&descriptor.name)
        .bind(&descriptor.domain)
        .bind(descriptor.source_type.as_str())
        .bind(&descriptor.homepage_url)
        .bind(&descriptor.feed_url)
        .bind(descriptor.trust_weight)
        .bind(&descriptor.country)
        .bind(descriptor.is_active)
        .execute(pool)
        .await?;
    }

    info!(count = registry.sources().len(), "Registry sources synced");
    Ok(())
}

/// Resolve the source row for an ingest attachment, registering unknown
/// publishers on the fly. The registry trust weight wins for cataloged
/// domains; the payload hint (clamped to [0, 4]) or the source-type
/// default covers the rest.
pub async fn resolve_or_register(
    tx: &mut Transaction<'_, Postgres>,
    source: &SourceRef,
    registry: &SourceRegistry,
) -> Result<Uuid, StoreError> {
    let domain = domain_of(&source.source_url)
        .ok_or_else(|| StoreError::ValidationRejected("source url has no host".to_string()))?;

    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM sources WHERE domain = $1 AND source_type = $2")
            .bind(&domain)
            .bind(source.source_type.as_str())
            .fetch_optional(&mut **tx)
            .await?;

    if let Some((id,)) = existing {
        return Ok(id);
    }

    let trust_weight = effective_trust_weight(source, registry);
    let name = source
        .source_name
        .clone()
        .or_else(|| fallback_name_for_domain(&domain).map(str::to_string))
        .unwrap_or_else(|| domain.clone());
    let homepage = format!("https://{domain}");

    let (id,): (Uuid,) = sqlx::query_as(
        r#"INSERT INTO sources (name, domain, source_type, homepage_url, trust_weight)
           VALUES ($1, $2, $3, $4, $5)
           ON CONFLICT (domain, source_type) DO UPDATE SET updated_at = NOW()
           RETURNING id"#,
    )
    .bind(&name)
    .bind(&domain)
    .bind(source.source_type.as_str())
    .bind(&homepage)
    .bind(trust_weight)
    .fetch_one(&mut **tx)
    .await?;

    Ok(id)
}

/// Static domain → display-name dictionary for publishers that arrive via
/// ingest before anyone catalogs them.
const DOMAIN_NAMES: &[(&str, &str)] = &[
    ("politi.dk", "Dansk Politi"),
    ("politiet.no", "Politiet i Norge"),
    ("polisen.se", "Polisen"),
    ("poliisi.fi", "Poliisi"),
    ("dr.dk", "DR Nyheder"),
    ("nrk.no", "NRK"),
    ("svt.se", "SVT Nyheter"),
    ("yle.fi", "Yle"),
    ("tv2.dk", "TV 2"),
    ("nyheder.tv2.dk", "TV 2 Nyheder"),
    ("tagesschau.de", "Tagesschau"),
    ("spiegel.de", "Der Spiegel"),
    ("nos.nl", "NOS Nieuws"),
    ("bbc.com", "BBC News"),
    ("bbc.co.uk", "BBC News"),
    ("reuters.com", "Reuters"),
    ("afp.com", "AFP"),
    ("lemonde.fr", "Le Monde"),
    ("x.com", "X"),
    ("twitter.com", "X"),
];

pub fn fallback_name_for_domain(domain: &str) -> Option<&'static str> {
    DOMAIN_NAMES
        .iter()
        .find(|(d, _)| *d == domain)
        .map(|(_, name)| *name)
}

/// Display-name fallback chain for API responses:
/// registry/sources-table name → join-row name → domain dictionary →
/// "Unknown Source".
pub fn resolve_display_name(
    table_name: Option<&str>,
    join_row_name: Option<&str>,
    domain: Option<&str>,
) -> String {
    if let Some(name) = table_name.filter(|n| !n.trim().is_empty()) {
        return name.to_string();
    }
    if let Some(name) = join_row_name.filter(|n| !n.trim().is_empty()) {
        return name.to_string();
    }
    if let Some(name) = domain.and_then(fallback_name_for_domain) {
        return name.to_string();
    }
    "Unknown Source".to_string()
}

/// Trust weight for an ingest attachment without touching the database:
/// registry catalog first, then the payload hint, then the type default.
pub fn effective_trust_weight(source: &SourceRef, registry: &SourceRegistry) -> f64 {
    let domain = domain_of(&source.source_url);
    if let Some(domain) = &domain {
        if let Some(descriptor) = registry.by_domain(domain, source.source_type) {
            return descriptor.trust_weight;
        }
    }
    source
        .trust_weight
        .map_or_else(
            || source.source_type.default_trust_weight(),
            |w| w.clamp(0.0, 4.0),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_fallback_chain() {
        assert_eq!(
            resolve_display_name(Some("Dansk Politi"), None, Some("politi.dk")),
            "Dansk Politi"
        );
        assert_eq!(
            resolve_display_name(Some("  "), Some("Local Desk"), None),
            "Local Desk"
        );
        assert_eq!(
            resolve_display_name(None, None, Some("reuters.com")),
            "Reuters"
        );
        assert_eq!(
            resolve_display_name(None, None, Some("obscure-blog.dk")),
            "Unknown Source"
        );
    }

    #[test]
    fn effective_trust_prefers_registry_over_hint() {
        let registry = SourceRegistry::builtin().unwrap();
        let source = SourceRef {
            source_url: "https://politi.dk/nyhed/1".to_string(),
            source_type: SourceType::Police,
            source_name: None,
            source_title: None,
            source_quote: None,
            trust_weight: Some(1.0), // hint tries to downgrade the police
            published_at: None,
            lang: None,
        };
        assert_eq!(effective_trust_weight(&source, &registry), 4.0);
    }

    #[test]
    fn effective_trust_clamps_hints_for_unknown_domains() {
        let registry = SourceRegistry::builtin().unwrap();
        let source = SourceRef {
            source_url: "https://some-blog.net/post".to_string(),
            source_type: SourceType::Social,
            source_name: None,
            source_title: None,
            source_quote: None,
            trust_weight: Some(9.5),
            published_at: None,
            lang: None,
        };
        assert_eq!(effective_trust_weight(&source, &registry), 4.0);

        let unhinted = SourceRef {
            trust_weight: None,
            ..source
        };
        assert_eq!(effective_trust_weight(&unhinted, &registry), 1.0);
    }
}
