//! Reconcile a freshly harvested paper with its persisted snapshot.
//!
//! Pure function over two values; file handling lives in [`crate::snapshot`].

use crate::dates::parse_date;
use crate::paper::{Metrics, Paper, Provenance, collapse_versions, unique_non_empty};

/// Merge `incoming` into `existing`, returning a new record.
///
/// - Descriptive fields (title, abstract, authors, `updated_at`) come from
///   `incoming` only when its `updated_at` is strictly later. Equal dates keep
///   `existing`. An unparseable existing date always yields to `incoming`.
/// - Categories and provenance queries are unioned.
/// - Versions are unioned by label (later date wins), sorted by label.
/// - `submitted_at` sticks to the first recorded non-empty value.
/// - Links, URLs, primary category and provenance metadata follow `incoming`.
/// - Counts are recomputed from the merged lists.
pub fn merge(existing: Option<&Paper>, incoming: &Paper) -> Paper {
    let Some(existing) = existing else {
        let mut paper = incoming.clone();
        paper.recompute_counts();
        return paper;
    };

    let incoming_is_newer = match (
        parse_date(&existing.updated_at),
        parse_date(&incoming.updated_at),
    ) {
        (None, _) => true,
        (Some(old), Some(new)) => new > old,
        (Some(_), None) => false,
    };
    let descriptive = if incoming_is_newer { incoming } else { existing };

    let categories = unique_non_empty(existing.categories.iter().chain(&incoming.categories));
    let versions = collapse_versions(
        existing
            .versions
            .iter()
            .chain(&incoming.versions)
            .cloned(),
    );
    let submitted_at = if existing.submitted_at.is_empty() {
        incoming.submitted_at.clone()
    } else {
        existing.submitted_at.clone()
    };
    let topic_tags = if incoming.topic_tags.is_empty() {
        existing.topic_tags.clone()
    } else {
        incoming.topic_tags.clone()
    };
    let queries = unique_non_empty(
        existing
            .provenance
            .queries
            .iter()
            .chain(&incoming.provenance.queries),
    );

    let mut merged = Paper {
        id: incoming.id.clone(),
        canonical_url: pick(&incoming.canonical_url, &existing.canonical_url),
        pdf_url: pick(&incoming.pdf_url, &existing.pdf_url),
        title: descriptive.title.clone(),
        abstract_text: descriptive.abstract_text.clone(),
        authors: descriptive.authors.clone(),
        submitted_at,
        updated_at: descriptive.updated_at.clone(),
        primary_category: pick(&incoming.primary_category, &existing.primary_category),
        categories,
        metrics: Metrics {
            trending_score: incoming.metrics.trending_score,
            ..Metrics::default()
        },
        topic_tags,
        versions,
        links: if incoming.links.arxiv_abs.is_empty() {
            existing.links.clone()
        } else {
            incoming.links.clone()
        },
        provenance: Provenance {
            queries,
            ..incoming.provenance.clone()
        },
    };
    merged.recompute_counts();
    merged
}

/// Prefer the incoming value unless it is empty.
fn pick(incoming: &str, existing: &str) -> String {
    if incoming.is_empty() {
        existing.to_string()
    } else {
        incoming.to_string()
    }
}
