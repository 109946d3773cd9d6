//! Build provenance and editorial ledger
//!
//! ```text
//! {data_dir}/
//! ├── provenance/
//! │   ├── build.json          # latest build, overwritten
//! │   └── update-log.ndjson   # one line per run, append-only
//! └── editorial/
//!     └── ledger.ndjson       # ranking-config version changes
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::dates::format_date;
use crate::hash::file_fingerprint;
use crate::json::{append_ndjson, write_json};
use crate::snapshot::INDEX_FILE;

pub const LEDGER_KIND_RANKING: &str = "ranking-config";

/// What a pipeline run reports about itself.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub harvest_window: String,
    pub source: String,
    /// `prod` or `offline`.
    pub dataset: String,
    pub records: usize,
    pub status: String,
    pub commit: String,
    pub ranking_config_version: Option<String>,
    pub query_pack_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildProvenance {
    pub snapshot: String,
    pub harvest_window: String,
    pub source: String,
    pub updated_at: String,
    pub dataset: String,
    pub commit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking_config_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_pack_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateLogEntry {
    pub snapshot: String,
    pub harvest_window: String,
    pub records: usize,
    pub status: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking_config_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_pack_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub ranking_config: String,
    pub note: String,
}

pub fn build_path(data_dir: &Path) -> PathBuf {
    data_dir.join("provenance").join("build.json")
}

pub fn update_log_path(data_dir: &Path) -> PathBuf {
    data_dir.join("provenance").join("update-log.ndjson")
}

pub fn ledger_path(data_dir: &Path) -> PathBuf {
    data_dir.join("editorial").join("ledger.ndjson")
}

fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.is_empty())
}

/// Overwrite `build.json` and append to `update-log.ndjson`.
///
/// `index_hash` fingerprints the current `papers.index.json`, if any.
pub fn write_provenance(
    data_dir: &Path,
    run: &RunRecord,
    now: DateTime<Utc>,
) -> Result<(BuildProvenance, UpdateLogEntry)> {
    let snapshot = format_date(now.date_naive());
    let updated_at = timestamp(now);
    let index_path = data_dir.join(INDEX_FILE);
    let index_hash = file_fingerprint(&index_path)
        .with_context(|| format!("failed to hash {}", index_path.display()))?;

    let build = BuildProvenance {
        snapshot: snapshot.clone(),
        harvest_window: run.harvest_window.clone(),
        source: run.source.clone(),
        updated_at: updated_at.clone(),
        dataset: run.dataset.clone(),
        commit: run.commit.clone(),
        ranking_config_version: non_empty(&run.ranking_config_version),
        query_pack_version: non_empty(&run.query_pack_version),
        index_hash,
    };
    write_json(&build_path(data_dir), &build)?;

    let entry = UpdateLogEntry {
        snapshot,
        harvest_window: run.harvest_window.clone(),
        records: run.records,
        status: run.status.clone(),
        updated_at,
        ranking_config_version: build.ranking_config_version.clone(),
        query_pack_version: build.query_pack_version.clone(),
    };
    append_ndjson(&update_log_path(data_dir), &entry)?;

    log::debug!("provenance written to {}", build_path(data_dir).display());
    Ok((build, entry))
}

/// Record a ranking-config version in the editorial ledger.
///
/// Returns `false` when the version is empty or already recorded.
pub fn append_ledger_entry(data_dir: &Path, version: &str, now: DateTime<Utc>) -> Result<bool> {
    if version.is_empty() {
        return Ok(false);
    }
    let path = ledger_path(data_dir);
    let existing = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
    };
    let recorded = existing
        .lines()
        .filter_map(|line| serde_json::from_str::<LedgerEntry>(line).ok())
        .any(|e| e.kind == LEDGER_KIND_RANKING && e.ranking_config == version);
    if recorded {
        return Ok(false);
    }

    let entry = LedgerEntry {
        timestamp: timestamp(now),
        kind: LEDGER_KIND_RANKING.to_string(),
        ranking_config: version.to_string(),
        note: "Ranking config version updated".to_string(),
    };
    append_ndjson(&path, &entry)?;
    log::info!("ledger: ranking config {version}");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 22, 6, 30, 0).unwrap()
    }

    fn run() -> RunRecord {
        RunRecord {
            harvest_window: "2025-12-23 to 2026-01-22".into(),
            source: "arxiv_api".into(),
            dataset: "prod".into(),
            records: 42,
            status: "ok".into(),
            commit: "local".into(),
            ranking_config_version: Some("rank-v2".into()),
            query_pack_version: Some(String::new()),
        }
    }

    #[test]
    fn writes_build_and_appends_log() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(INDEX_FILE), "[]").unwrap();

        let (build, entry) = write_provenance(dir.path(), &run(), now()).unwrap();
        assert_eq!(build.snapshot, "2026-01-22");
        assert_eq!(build.updated_at, "2026-01-22T06:30:00.000Z");
        assert_eq!(build.ranking_config_version.as_deref(), Some("rank-v2"));
        assert_eq!(build.query_pack_version, None);
        assert_eq!(build.index_hash.as_ref().map(String::len), Some(8));
        assert_eq!(entry.records, 42);

        write_provenance(dir.path(), &run(), now()).unwrap();
        let log = fs::read_to_string(update_log_path(dir.path())).unwrap();
        assert_eq!(log.lines().count(), 2);

        let json = fs::read_to_string(build_path(dir.path())).unwrap();
        assert!(!json.contains("query_pack_version"));
    }

    #[test]
    fn no_index_means_no_hash() {
        let dir = tempfile::tempdir().unwrap();
        let (build, _) = write_provenance(dir.path(), &run(), now()).unwrap();
        assert_eq!(build.index_hash, None);
    }

    #[test]
    fn ledger_records_each_version_once() {
        let dir = tempfile::tempdir().unwrap();
        assert!(append_ledger_entry(dir.path(), "rank-v2", now()).unwrap());
        assert!(!append_ledger_entry(dir.path(), "rank-v2", now()).unwrap());
        assert!(append_ledger_entry(dir.path(), "rank-v3", now()).unwrap());
        assert!(!append_ledger_entry(dir.path(), "", now()).unwrap());

        let text = fs::read_to_string(ledger_path(dir.path())).unwrap();
        let entries: Vec<LedgerEntry> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, "ranking-config");
        assert!(text.contains("\"type\":\"ranking-config\""));
    }
}
