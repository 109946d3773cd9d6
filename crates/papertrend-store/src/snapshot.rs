//! On-disk paper corpus
//!
//! Directory layout:
//! ```text
//! {data_dir}/
//! ├── papers/
//! │   └── {id}.json        # one merged Paper per identifier
//! └── papers.index.json    # denormalized index, rewritten wholesale
//! ```
//!
//! Identifiers containing `/` (old-style `hep-th/9901001`) are stored with
//! the slash replaced by `_`.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::dates::parse_date;
use crate::json::{read_json, write_json, write_json_atomic};
use crate::merge::merge;
use crate::paper::{Links, Metrics, Paper, Provenance, TopicTag};

pub const PAPERS_DIR: &str = "papers";
pub const INDEX_FILE: &str = "papers.index.json";

/// One row of `papers.index.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperIndexEntry {
    pub arxiv_id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub submitted_at: String,
    pub updated_at: String,
    pub primary_category: String,
    pub categories: Vec<String>,
    pub topic_tags: Vec<TopicTag>,
    pub metrics: Metrics,
    pub links: Links,
    pub provenance: Provenance,
}

impl From<&Paper> for PaperIndexEntry {
    fn from(paper: &Paper) -> Self {
        Self {
            arxiv_id: paper.id.clone(),
            title: paper.title.clone(),
            abstract_text: paper.abstract_text.clone(),
            authors: paper.authors.iter().map(|a| a.name.clone()).collect(),
            submitted_at: paper.submitted_at.clone(),
            updated_at: paper.updated_at.clone(),
            primary_category: paper.primary_category.clone(),
            categories: paper.categories.clone(),
            topic_tags: paper.topic_tags.clone(),
            metrics: paper.metrics.clone(),
            links: paper.links.clone(),
            provenance: paper.provenance.clone(),
        }
    }
}

/// Result of a write: the full sorted corpus and its index projection.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub papers: Vec<Paper>,
    pub index: Vec<PaperIndexEntry>,
}

/// In-memory corpus keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    papers: BTreeMap<String, Paper>,
}

impl Corpus {
    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.papers.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Paper> {
        self.papers.get(id)
    }

    /// Merge one incoming record into the corpus.
    pub fn merge_in(&mut self, incoming: &Paper) {
        let merged = merge(self.papers.get(&incoming.id), incoming);
        self.papers.insert(merged.id.clone(), merged);
    }

    /// Merge records in order; later duplicates merge over earlier ones.
    pub fn merge_all<'a>(&mut self, incoming: impl IntoIterator<Item = &'a Paper>) {
        for paper in incoming {
            self.merge_in(paper);
        }
    }

    /// Replace a record wholesale (derived fields overwrite, no merge).
    pub fn replace(&mut self, paper: Paper) {
        self.papers.insert(paper.id.clone(), paper);
    }

    /// Papers in index order.
    pub fn into_sorted(self) -> Vec<Paper> {
        let mut papers: Vec<Paper> = self.papers.into_values().collect();
        sort_for_index(&mut papers);
        papers
    }
}

impl FromIterator<Paper> for Corpus {
    fn from_iter<I: IntoIterator<Item = Paper>>(iter: I) -> Self {
        let mut corpus = Corpus::default();
        for paper in iter {
            corpus.replace(paper);
        }
        corpus
    }
}

/// Sort by `updated_at` descending; unparseable dates last; ties by id ascending.
pub fn sort_for_index(papers: &mut [Paper]) {
    papers.sort_by(|a, b| {
        let order = match (parse_date(&a.updated_at), parse_date(&b.updated_at)) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        order.then_with(|| a.id.cmp(&b.id))
    });
}

/// File name for a paper identifier.
pub fn paper_file_name(id: &str) -> String {
    format!("{}.json", id.replace('/', "_"))
}

/// Persistent corpus under a data directory.
pub struct SnapshotStore {
    data_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn papers_dir(&self) -> PathBuf {
        self.data_dir.join(PAPERS_DIR)
    }

    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join(INDEX_FILE)
    }

    /// Load every persisted paper. A missing papers directory is an empty corpus.
    pub fn load_corpus(&self) -> Result<Corpus> {
        let dir = self.papers_dir();
        if !dir.exists() {
            log::debug!("no corpus at {}, starting empty", dir.display());
            return Ok(Corpus::default());
        }

        let pattern = dir.join("*.json");
        let pattern_str = pattern.to_string_lossy();
        let mut entries: Vec<PathBuf> = glob::glob(&pattern_str)
            .context("invalid glob pattern")?
            .filter_map(|e| e.ok())
            .filter(|p| p.is_file())
            .collect();
        entries.sort();

        let mut corpus = Corpus::default();
        for path in &entries {
            let paper: Paper = read_json(path)?;
            if paper.id.is_empty() {
                log::warn!("skipping {}: missing arxiv_id", path.display());
                continue;
            }
            corpus.replace(paper);
        }
        log::debug!("loaded {} papers from {}", corpus.len(), dir.display());
        Ok(corpus)
    }

    /// The whole corpus in index order.
    pub fn load_papers(&self) -> Result<Vec<Paper>> {
        Ok(self.load_corpus()?.into_sorted())
    }

    /// Merge incoming papers into the persisted corpus and rewrite it.
    pub fn write_snapshots(&self, incoming: &[Paper]) -> Result<Snapshot> {
        let mut corpus = self.load_corpus()?;
        corpus.merge_all(incoming);
        self.write_corpus(corpus.into_sorted())
    }

    /// Persist an already-reconciled corpus as-is.
    pub fn persist(&self, papers: Vec<Paper>) -> Result<Snapshot> {
        let corpus: Corpus = papers.into_iter().collect();
        self.write_corpus(corpus.into_sorted())
    }

    /// Read the current index; missing index is empty.
    #[cfg(test)]
    fn read_index(&self) -> Result<Vec<PaperIndexEntry>> {
        Ok(crate::json::read_json_opt(&self.index_path())?.unwrap_or_default())
    }

    fn write_corpus(&self, papers: Vec<Paper>) -> Result<Snapshot> {
        let dir = self.papers_dir();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        for paper in &papers {
            write_json(&dir.join(paper_file_name(&paper.id)), paper)?;
        }

        let index: Vec<PaperIndexEntry> = papers.iter().map(PaperIndexEntry::from).collect();
        write_json_atomic(&self.index_path(), &index)?;
        log::info!(
            "wrote {} papers and {}",
            papers.len(),
            self.index_path().display()
        );
        Ok(Snapshot { papers, index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paper::{Author, Version};

    fn paper(id: &str, updated: &str) -> Paper {
        let mut p = Paper {
            id: id.into(),
            title: format!("Paper {id}"),
            authors: vec![Author { name: "Emmy Noether".into() }],
            submitted_at: "2026-01-01".into(),
            updated_at: updated.into(),
            primary_category: "cs.LG".into(),
            categories: vec!["cs.LG".into()],
            versions: vec![Version {
                version: "v1".into(),
                updated_at: "2026-01-01".into(),
            }],
            ..Default::default()
        };
        p.recompute_counts();
        p
    }

    #[test]
    fn first_run_on_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(store.load_corpus().unwrap().is_empty());
        assert!(store.read_index().unwrap().is_empty());

        let snap = store
            .write_snapshots(&[paper("2601.00002", "2026-01-02"), paper("2601.00001", "2026-01-05")])
            .unwrap();
        assert_eq!(snap.papers.len(), 2);
        assert!(store.papers_dir().join("2601.00001.json").exists());
        assert!(store.index_path().exists());
        assert!(!dir.path().join("papers.index.json.tmp").exists());
    }

    #[test]
    fn index_sorted_by_updated_desc_then_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let snap = store
            .write_snapshots(&[
                paper("b", "2026-01-03"),
                paper("c", ""),
                paper("a", "2026-01-03"),
                paper("d", "2026-01-09"),
            ])
            .unwrap();
        let ids: Vec<&str> = snap.index.iter().map(|e| e.arxiv_id.as_str()).collect();
        assert_eq!(ids, vec!["d", "a", "b", "c"]);
        assert_eq!(store.read_index().unwrap(), snap.index);
    }

    #[test]
    fn second_write_merges_with_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store.write_snapshots(&[paper("2601.00001", "2026-01-02")]).unwrap();

        let mut update = paper("2601.00001", "2026-01-06");
        update.title = "Revised".into();
        update.categories.push("stat.ML".into());
        update.versions.push(Version {
            version: "v2".into(),
            updated_at: "2026-01-06".into(),
        });
        update.recompute_counts();
        let snap = store.write_snapshots(&[update, paper("2601.00009", "2026-01-01")]).unwrap();

        assert_eq!(snap.papers.len(), 2);
        let merged = &snap.papers[0];
        assert_eq!(merged.title, "Revised");
        assert_eq!(merged.metrics.version_count, 2);
        assert_eq!(merged.metrics.cross_list_count, 1);

        let reloaded = store.load_papers().unwrap();
        assert_eq!(reloaded, snap.papers);
    }

    #[test]
    fn duplicate_ids_in_one_batch_are_merged() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let mut a = paper("2601.00001", "2026-01-02");
        a.provenance.queries = vec!["cat:cs.LG".into()];
        let mut b = paper("2601.00001", "2026-01-02");
        b.provenance.queries = vec!["cat:stat.ML".into()];
        let snap = store.write_snapshots(&[a, b]).unwrap();
        assert_eq!(snap.papers.len(), 1);
        assert_eq!(snap.papers[0].provenance.queries, vec!["cat:cs.LG", "cat:stat.ML"]);
    }

    #[test]
    fn persist_overwrites_derived_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let mut p = paper("2601.00001", "2026-01-02");
        p.topic_tags.push(TopicTag {
            topic_id: "old".into(),
            confidence: 0.58,
            ..Default::default()
        });
        store.write_snapshots(&[p.clone()]).unwrap();

        p.topic_tags.clear();
        p.metrics.trending_score = 0.25;
        store.persist(vec![p]).unwrap();

        let reloaded = store.load_papers().unwrap();
        assert!(reloaded[0].topic_tags.is_empty());
        assert_eq!(reloaded[0].metrics.trending_score, 0.25);
    }

    #[test]
    fn old_style_ids_use_safe_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store.write_snapshots(&[paper("hep-th/9901001", "1999-01-05")]).unwrap();
        assert!(store.papers_dir().join("hep-th_9901001.json").exists());
        assert_eq!(store.load_papers().unwrap()[0].id, "hep-th/9901001");
    }

    #[test]
    fn corrupt_paper_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        fs::create_dir_all(store.papers_dir()).unwrap();
        fs::write(store.papers_dir().join("broken.json"), "{").unwrap();
        let err = store.load_corpus().unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"));
    }

    #[test]
    fn index_entry_flattens_authors() {
        let entry = PaperIndexEntry::from(&paper("2601.00001", "2026-01-02"));
        assert_eq!(entry.authors, vec!["Emmy Noether"]);
        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("abstract").is_some());
    }
}
