//! In-process mirror of the evidence-score trigger.
//!
//! The trigger in `migrations/0003_evidence.sql` is the only writer of
//! `incidents.evidence_score`; this mirror exists so tests can assert the
//! tier rules without a database. The two must implement the same table.

/// Evidence contributed by one attached source.
#[derive(Debug, Clone, Copy)]
pub struct SourceEvidence {
    pub trust_weight: f64,
    /// Non-empty `source_quote` on the join row.
    pub has_quote: bool,
}

/// Score tiers: 4 OFFICIAL, 3 VERIFIED, 2 REPORTED, 1 UNCONFIRMED.
/// Evaluated top-down over the current source set.
pub fn compute_evidence_score(sources: &[SourceEvidence]) -> i16 {
    let count = sources.len();
    let max_trust = sources.iter().map(|s| s.trust_weight).fold(0.0, f64::max);
    let has_quote = sources.iter().any(|s| s.has_quote);

    if max_trust >= 4.0 {
        4
    } else if (count >= 2 && max_trust >= 3.0) || (max_trust >= 3.0 && has_quote) {
        3
    } else if max_trust >= 2.0 {
        2
    } else {
        1
    }
}
