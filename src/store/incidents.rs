//! Incident rows: transactional insert/merge plus the read queries behind
//! the query API.

use super::{map_db_error, StoreError};
use crate::store::sources::resolve_display_name;
use crate::types::{AssetType, IncidentCandidate, IncidentSourceView, IncidentStatus, SourceRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

/// Fingerprints computed for a candidate before it reaches the store. The
/// validation trigger would derive the same values; computing them here
/// keeps the content-hash lookup and the insert consistent.
#[derive(Debug, Clone)]
pub struct Fingerprints {
    pub normalized_title: String,
    pub location_hash: String,
    pub content_hash: String,
}

/// Insert a new incident row. The validation trigger fires inside this
/// statement; unique-violation and trigger-rejection errors come back as
/// their distinct [`StoreError`] variants for the caller to route.
pub async fn insert_incident(
    tx: &mut Transaction<'_, Postgres>,
    candidate: &IncidentCandidate,
    fingerprints: &Fingerprints,
) -> Result<Uuid, StoreError> {
    let row: Result<(Uuid,), sqlx::Error> = sqlx::query_as(
        r#"INSERT INTO incidents
               (title, narrative, occurred_at, location, asset_type, status,
                country, normalized_title, location_hash, content_hash)
           VALUES
               ($1, $2, $3, ST_SetSRID(ST_MakePoint($4, $5), 4326)::geography,
                $6, $7, $8, $9, $10, $11)
           RETURNING id"#,
    )
    .bind(&candidate.title)
    .bind(&candidate.narrative)
    .bind(candidate.occurred_at)
    .bind(candidate.lon)
    .bind(candidate.lat)
    .bind(candidate.asset_type.as_str())
    .bind(candidate.status.as_str())
    .bind(&candidate.country)
    .bind(&fingerprints.normalized_title)
    .bind(&fingerprints.location_hash)
    .bind(&fingerprints.content_hash)
    .fetch_one(&mut **tx)
    .await;

    match row {
        Ok((id,)) => Ok(id),
        Err(e) => Err(map_db_error(e)),
    }
}

/// Find the incident owning a content hash, locking the row for the
/// duration of the transaction so concurrent merges serialize.
pub async fn find_by_content_hash(
    tx: &mut Transaction<'_, Postgres>,
    content_hash: &str,
) -> Result<Option<Uuid>, StoreError> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM incidents WHERE content_hash = $1 FOR UPDATE")
            .bind(content_hash)
            .fetch_optional(&mut **tx)
            .await?;
    Ok(row.map(|(id,)| id))
}

/// Spatial-temporal nearest match via the `find_nearby_incident` SQL
/// function: same asset type, asset-aware radius, within seven days.
pub async fn find_nearby(
    tx: &mut Transaction<'_, Postgres>,
    lat: f64,
    lon: f64,
    asset_type: AssetType,
    occurred_at: DateTime<Utc>,
) -> Result<Option<Uuid>, StoreError> {
    let (id,): (Option<Uuid>,) =
        sqlx::query_as("SELECT find_nearby_incident($1, $2, $3, $4)")
            .bind(lat)
            .bind(lon)
            .bind(asset_type.as_str())
            .bind(occurred_at)
            .fetch_one(&mut **tx)
            .await?;
    Ok(id)
}

/// Lock an incident row for merge. Returns NotFound if it vanished between
/// lookup and lock (cascade delete in a concurrent transaction).
pub async fn lock_incident(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<(), StoreError> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM incidents WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    row.map(|_| ()).ok_or(StoreError::NotFound(id))
}

/// Fold a new report into an existing incident: timestamps extend outward,
/// occurred_at moves to the earliest report, and the longest narrative
/// wins. The evidence trigger fires when the caller attaches the source.
pub async fn merge_incident(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    candidate: &IncidentCandidate,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"UPDATE incidents
              SET occurred_at = LEAST(occurred_at, $2),
                  first_seen_at = LEAST(first_seen_at, NOW()),
                  last_seen_at = GREATEST(last_seen_at, NOW()),
                  narrative = CASE
                      WHEN char_length($3) > char_length(narrative) THEN $3
                      ELSE narrative
                  END
            WHERE id = $1"#,
    )
    .bind(id)
    .bind(candidate.occurred_at)
    .bind(&candidate.narrative)
    .execute(&mut **tx)
    .await
    .map_err(map_db_error)?;
    Ok(())
}

/// Attach a source URL to an incident. Returns false when the URL is
/// already attached anywhere (global uniqueness makes this a no-op).
pub async fn attach_source(
    tx: &mut Transaction<'_, Postgres>,
    incident_id: Uuid,
    source_id: Uuid,
    source: &SourceRef,
) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"INSERT INTO incident_sources
               (incident_id, source_id, source_url, source_name, source_quote,
                source_title, published_at, lang)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
           ON CONFLICT (source_url) DO NOTHING"#,
    )
    .bind(incident_id)
    .bind(source_id)
    .bind(&source.source_url)
    .bind(&source.source_name)
    .bind(&source.source_quote)
    .bind(&source.source_title)
    .bind(source.published_at)
    .bind(&source.lang)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Current evidence score, read back after the trigger ran.
pub async fn evidence_score(pool: &PgPool, id: Uuid) -> Result<i16, StoreError> {
    let row: Option<(i16,)> = sqlx::query_as("SELECT evidence_score FROM incidents WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(|(score,)| score).ok_or(StoreError::NotFound(id))
}

// ── Read side ──────────────────────────────────────────────────────────────

/// Inclusive bounding box filter, `minLon,minLat,maxLon,maxLat`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

/// Filters for the list endpoint. Limits are already clamped by the API
/// layer when this reaches the store.
#[derive(Debug, Clone)]
pub struct IncidentFilter {
    pub min_evidence: i16,
    pub country: Option<String>,
    pub status: Option<IncidentStatus>,
    pub bbox: Option<BoundingBox>,
    pub asset_type: Option<AssetType>,
    pub occurred_after: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for IncidentFilter {
    fn default() -> Self {
        Self {
            min_evidence: 1,
            country: None,
            status: None,
            bbox: None,
            asset_type: None,
            occurred_after: None,
            search: None,
            limit: 500,
            offset: 0,
        }
    }
}

/// One incident with its aggregated sources, as served by the query API.
#[derive(Debug, Clone, Serialize)]
pub struct IncidentView {
    pub id: Uuid,
    pub title: String,
    pub narrative: String,
    pub occurred_at: DateTime<Utc>,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub asset_type: String,
    pub status: String,
    pub evidence_score: i16,
    pub country: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub sources: Vec<IncidentSourceView>,
}

#[derive(Debug, Deserialize)]
struct RawSourceJson {
    source_url: String,
    source_type: String,
    name: Option<String>,
    source_name: Option<String>,
    domain: Option<String>,
    source_title: Option<String>,
    source_quote: Option<String>,
    trust_weight: f64,
}

#[derive(sqlx::FromRow)]
struct IncidentRow {
    id: Uuid,
    title: String,
    narrative: String,
    occurred_at: DateTime<Utc>,
    first_seen_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
    lat: f64,
    lon: f64,
    asset_type: String,
    status: String,
    evidence_score: i16,
    country: Option<String>,
    sources: sqlx::types::Json<Vec<RawSourceJson>>,
}

impl From<IncidentRow> for IncidentView {
    fn from(row: IncidentRow) -> Self {
        let sources = row
            .sources
            .0
            .into_iter()
            .map(|raw| IncidentSourceView {
                source_name: resolve_display_name(
                    raw.name.as_deref(),
                    raw.source_name.as_deref(),
                    raw.domain.as_deref(),
                ),
                source_url: raw.source_url,
                source_type: raw.source_type,
                source_title: raw.source_title,
                source_quote: raw.source_quote,
                trust_weight: raw.trust_weight,
            })
            .collect();

        Self {
            id: row.id,
            title: row.title,
            narrative: row.narrative,
            occurred_at: row.occurred_at,
            first_seen_at: row.first_seen_at,
            last_seen_at: row.last_seen_at,
            asset_type: row.asset_type,
            status: row.status,
            evidence_score: row.evidence_score,
            country: row.country.map(|c| c.trim().to_string()),
            lat: row.lat,
            lon: row.lon,
            sources,
        }
    }
}

const SELECT_WITH_SOURCES: &str = r#"SELECT i.id, i.title, i.narrative,
       i.occurred_at, i.first_seen_at, i.last_seen_at,
       ST_Y(i.location::geometry) AS lat, ST_X(i.location::geometry) AS lon,
       i.asset_type, i.status, i.evidence_score, i.country,
       COALESCE(jsonb_agg(jsonb_build_object(
           'source_url', isrc.source_url,
           'source_type', s.source_type,
           'name', s.name,
           'source_name', isrc.source_name,
           'domain', s.domain,
           'source_title', isrc.source_title,
           'source_quote', isrc.source_quote,
           'trust_weight', s.trust_weight
       ) ORDER BY s.trust_weight DESC, isrc.fetched_at)
           FILTER (WHERE isrc.id IS NOT NULL), '[]'::jsonb) AS sources
  FROM incidents i
  LEFT JOIN incident_sources isrc ON isrc.incident_id = i.id
  LEFT JOIN sources s ON s.id = isrc.source_id
"#;

/// List incidents matching the filter, newest first, each with its
/// aggregated sources from a single LEFT JOIN.
pub async fn list_incidents(
    pool: &PgPool,
    filter: &IncidentFilter,
) -> Result<Vec<IncidentView>, StoreError> {
    let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(SELECT_WITH_SOURCES);
    qb.push(" WHERE i.evidence_score >= ");
    qb.push_bind(filter.min_evidence);

    if let Some(country) = &filter.country {
        qb.push(" AND i.country = ");
        qb.push_bind(country.clone());
    }
    if let Some(status) = filter.status {
        qb.push(" AND i.status = ");
        qb.push_bind(status.as_str());
    }
    if let Some(asset_type) = filter.asset_type {
        qb.push(" AND i.asset_type = ");
        qb.push_bind(asset_type.as_str());
    }
    if let Some(after) = filter.occurred_after {
        qb.push(" AND i.occurred_at >= ");
        qb.push_bind(after);
    }
    if let Some(bbox) = filter.bbox {
        qb.push(" AND ST_Intersects(i.location, ST_MakeEnvelope(");
        qb.push_bind(bbox.min_lon);
        qb.push(", ");
        qb.push_bind(bbox.min_lat);
        qb.push(", ");
        qb.push_bind(bbox.max_lon);
        qb.push(", ");
        qb.push_bind(bbox.max_lat);
        qb.push(", 4326)::geography)");
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search.trim());
        qb.push(" AND (i.title ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR i.narrative ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }

    qb.push(" GROUP BY i.id ORDER BY i.occurred_at DESC LIMIT ");
    qb.push_bind(filter.limit);
    qb.push(" OFFSET ");
    qb.push_bind(filter.offset);

    let rows: Vec<IncidentRow> = qb.build_query_as().fetch_all(pool).await?;
    Ok(rows.into_iter().map(IncidentView::from).collect())
}

/// Single incident by id, same shape as the list elements.
pub async fn get_incident(pool: &PgPool, id: Uuid) -> Result<Option<IncidentView>, StoreError> {
    let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(SELECT_WITH_SOURCES);
    qb.push(" WHERE i.id = ");
    qb.push_bind(id);
    qb.push(" GROUP BY i.id");

    let row: Option<IncidentRow> = qb.build_query_as().fetch_optional(pool).await?;
    Ok(row.map(IncidentView::from))
}

/// Source count for one incident; used by the idempotence tests.
pub async fn source_count(pool: &PgPool, id: Uuid) -> Result<i64, StoreError> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM incident_sources WHERE incident_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}
