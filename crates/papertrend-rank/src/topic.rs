//! Topic taxonomy (`taxonomy/topics.json`)

use std::path::{Path, PathBuf};

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use papertrend_store::json::read_json;

/// A curated research topic: harvest query plus tagging rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// arXiv `search_query` used to harvest this topic; empty skips harvesting
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub keywords_any: Vec<String>,
    #[serde(default)]
    pub keywords_all: Vec<String>,
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
    #[serde(default)]
    pub category_whitelist: Vec<String>,
    /// Identifiers that must always be present in the corpus
    #[serde(default)]
    pub anchors: Vec<String>,
}

pub fn topics_path(data_dir: &Path) -> PathBuf {
    data_dir.join("taxonomy").join("topics.json")
}

/// Load and validate the taxonomy. Missing or invalid files are errors.
pub fn load_topics(path: &Path) -> Result<Vec<Topic>> {
    let topics: Vec<Topic> = read_json(path)?;
    for (i, topic) in topics.iter().enumerate() {
        ensure!(
            !topic.id.is_empty(),
            "{}: topic #{i} has an empty id",
            path.display()
        );
        ensure!(
            topics[..i].iter().all(|t| t.id != topic.id),
            "{}: duplicate topic id {:?}",
            path.display(),
            topic.id
        );
    }
    log::debug!("loaded {} topics from {}", topics.len(), path.display());
    Ok(topics)
}

/// Anchor identifiers across all topics, first occurrence order.
pub fn anchor_ids(topics: &[Topic]) -> Vec<String> {
    papertrend_store::paper::unique_non_empty(topics.iter().flat_map(|t| t.anchors.iter()))
}
