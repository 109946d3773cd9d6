//! RawEntry → Paper

use papertrend_store::dates::to_date_string;
use papertrend_store::paper::{
    Author, Links, Metrics, Paper, Provenance, SOURCE_ARXIV_API, Version, abs_url,
    collapse_versions, pdf_url, unique_non_empty,
};

use crate::parser::RawEntry;

/// Run metadata stamped into every normalized paper.
#[derive(Debug, Clone)]
pub struct HarvestContext {
    /// Query that produced the entry; empty for none
    pub query: String,
    /// RFC 3339 harvest time
    pub harvested_at: String,
    pub harvest_run_id: String,
}

impl HarvestContext {
    pub fn new(query: &str, harvested_at: &str, harvest_run_id: &str) -> Self {
        Self {
            query: query.to_string(),
            harvested_at: harvested_at.to_string(),
            harvest_run_id: harvest_run_id.to_string(),
        }
    }

    pub fn with_query(&self, query: &str) -> Self {
        Self {
            query: query.to_string(),
            ..self.clone()
        }
    }
}

/// Convert a feed entry into a Paper that satisfies all record invariants.
pub fn normalize(entry: &RawEntry, ctx: &HarvestContext) -> Paper {
    let submitted_at = to_date_string(&entry.published);
    let updated_source = if entry.updated.is_empty() {
        &entry.published
    } else {
        &entry.updated
    };
    let updated_at = match to_date_string(updated_source) {
        d if d.is_empty() => submitted_at.clone(),
        d => d,
    };

    let categories = if entry.categories.is_empty() {
        unique_non_empty([&entry.primary_category])
    } else {
        unique_non_empty(&entry.categories)
    };
    let primary_category = if entry.primary_category.is_empty() {
        categories.first().cloned().unwrap_or_default()
    } else {
        entry.primary_category.clone()
    };

    let mut versions: Vec<Version> = entry
        .versions
        .iter()
        .filter(|v| !v.version.is_empty())
        .map(|v| Version {
            version: v.version.clone(),
            updated_at: to_date_string(&v.created),
        })
        .collect();
    if versions.is_empty() {
        versions.push(Version {
            version: "v1".to_string(),
            updated_at: updated_at.clone(),
        });
    }
    let versions = collapse_versions(versions);

    let canonical_url = non_empty_or(&entry.abs_link, || abs_url(&entry.id));
    let pdf = non_empty_or(&entry.pdf_link, || pdf_url(&entry.id));

    let mut paper = Paper {
        id: entry.id.clone(),
        canonical_url: canonical_url.clone(),
        pdf_url: pdf.clone(),
        title: entry.title.split_whitespace().collect::<Vec<_>>().join(" "),
        abstract_text: entry.summary.split_whitespace().collect::<Vec<_>>().join(" "),
        authors: entry
            .authors
            .iter()
            .map(|name| Author { name: name.clone() })
            .collect(),
        submitted_at,
        updated_at,
        primary_category,
        categories,
        metrics: Metrics::default(),
        topic_tags: Vec::new(),
        versions,
        links: Links {
            arxiv_abs: canonical_url,
            arxiv_pdf: pdf,
        },
        provenance: Provenance {
            source: SOURCE_ARXIV_API.to_string(),
            harvested_at: ctx.harvested_at.clone(),
            harvest_run_id: if ctx.harvest_run_id.is_empty() {
                "manual".to_string()
            } else {
                ctx.harvest_run_id.clone()
            },
            queries: unique_non_empty([&ctx.query]),
        },
    };
    paper.recompute_counts();
    paper
}

fn non_empty_or(value: &str, fallback: impl FnOnce() -> String) -> String {
    if value.is_empty() {
        fallback()
    } else {
        value.to_string()
    }
}
