//! Paper record: the persisted, merged representation of one arXiv paper

use std::cmp::Ordering;
use std::collections::HashMap;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::dates::parse_date;

/// Source tag written into provenance for API harvests.
pub const SOURCE_ARXIV_API: &str = "arxiv_api";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
}

/// One revision of a paper (`v1`, `v2`, ...) and the date it appeared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub version: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default)]
    pub cross_list_count: usize,
    #[serde(default = "one")]
    pub version_count: usize,
    #[serde(default)]
    pub trending_score: f64,
}

fn one() -> usize {
    1
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            cross_list_count: 0,
            version_count: 1,
            trending_score: 0.0,
        }
    }
}

/// Why a topic was assigned: the keywords that fired and the rule set used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rationale {
    #[serde(default)]
    pub matched_keywords: Vec<String>,
    #[serde(default)]
    pub rules_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicTag {
    pub topic_id: String,
    pub confidence: f64,
    #[serde(default)]
    pub rationale: Rationale,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Links {
    pub arxiv_abs: String,
    pub arxiv_pdf: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub source: String,
    pub harvested_at: String,
    pub harvest_run_id: String,
    #[serde(default)]
    pub queries: Vec<String>,
}

/// A paper snapshot, stored as `papers/<id>.json`.
///
/// Invariants (restored by [`Paper::recompute_counts`]):
/// - `metrics.version_count == max(1, versions.len())`
/// - `metrics.cross_list_count == max(0, categories.len() - 1)`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    #[serde(rename = "arxiv_id")]
    pub id: String,
    #[serde(default)]
    pub canonical_url: String,
    #[serde(default)]
    pub pdf_url: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub submitted_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub primary_category: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default)]
    pub topic_tags: Vec<TopicTag>,
    #[serde(default)]
    pub versions: Vec<Version>,
    #[serde(default)]
    pub links: Links,
    #[serde(default)]
    pub provenance: Provenance,
}

impl Paper {
    /// Recompute the derived counts from `categories` and `versions`.
    pub fn recompute_counts(&mut self) {
        self.metrics.cross_list_count = self.categories.len().saturating_sub(1);
        self.metrics.version_count = self.versions.len().max(1);
    }

    /// Whether the derived counts agree with the underlying lists.
    pub fn counts_consistent(&self) -> bool {
        self.metrics.cross_list_count == self.categories.len().saturating_sub(1)
            && self.metrics.version_count == self.versions.len().max(1)
    }

    pub fn has_topic(&self, topic_id: &str) -> bool {
        self.topic_tags.iter().any(|t| t.topic_id == topic_id)
    }
}

/// `https://arxiv.org/abs/<id>`
pub fn abs_url(id: &str) -> String {
    format!("https://arxiv.org/abs/{id}")
}

/// `https://arxiv.org/pdf/<id>.pdf`
pub fn pdf_url(id: &str) -> String {
    format!("https://arxiv.org/pdf/{id}.pdf")
}

/// Deduplicate, keeping first occurrence order and dropping empty strings.
pub fn unique_non_empty<'a>(values: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| !v.is_empty() && seen.insert(v.as_str()))
        .cloned()
        .collect()
}

/// Order version labels naturally: `v2` before `v10`; non-numeric labels last.
pub fn compare_version_labels(a: &str, b: &str) -> Ordering {
    fn number(label: &str) -> Option<u64> {
        label
            .strip_prefix(['v', 'V'])
            .and_then(|digits| digits.parse().ok())
    }
    match (number(a), number(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Collapse versions to one entry per label, sorted by label.
///
/// For a repeated label the later `updated_at` wins; on equal or unparseable
/// dates the earlier occurrence is kept.
pub fn collapse_versions(versions: impl IntoIterator<Item = Version>) -> Vec<Version> {
    let mut by_label: HashMap<String, Version> = HashMap::new();
    for version in versions {
        if version.version.is_empty() {
            continue;
        }
        match by_label.get(&version.version) {
            None => {
                by_label.insert(version.version.clone(), version);
            }
            Some(current) => {
                let later = match (parse_date(&current.updated_at), parse_date(&version.updated_at)) {
                    (_, None) => false,
                    (None, Some(_)) => true,
                    (Some(old), Some(new)) => new > old,
                };
                if later {
                    by_label.insert(version.version.clone(), version);
                }
            }
        }
    }
    let mut collapsed: Vec<Version> = by_label.into_values().collect();
    collapsed.sort_by(|a, b| compare_version_labels(&a.version, &b.version));
    collapsed
}
