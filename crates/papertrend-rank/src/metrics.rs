//! Corpus-level metrics written under `metrics/`

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use papertrend_store::dates::{format_date, parse_date};
use papertrend_store::json::write_json;
use papertrend_store::{Links, Paper};

use crate::topic::Topic;
use crate::trending::recency;

pub const METRICS_WINDOW_DAYS: u32 = 30;
pub const VERSION_CHURN_LIMIT: usize = 50;
/// ISO weeks covered by the topic time series.
pub const TIMESERIES_WEEKS: u32 = 52;

pub const TOPIC_MOMENTUM_FILE: &str = "topic_momentum.json";
pub const VERSION_CHURN_FILE: &str = "version_churn.json";
pub const CROSSLIST_HEATMAP_FILE: &str = "crosslist_heatmap.json";
pub const TOPIC_TIMESERIES_FILE: &str = "topic_timeseries.json";
pub const TREND_RADAR_FILE: &str = "trend_radar.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnEntry {
    pub arxiv_id: String,
    pub title: String,
    pub updated_at: String,
    pub version_count: usize,
    pub primary_category: String,
    pub links: Links,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionChurn {
    pub generated_at: String,
    pub window: String,
    pub papers: Vec<ChurnEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrosslistHeatmap {
    pub generated_at: String,
    pub window: String,
    pub categories: Vec<String>,
    /// primary category → cross-listed category → papers
    pub matrix: BTreeMap<String, BTreeMap<String, usize>>,
}

/// Weekly tagged-paper counts per topic, oldest week first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicTimeseries {
    pub generated_at: String,
    /// `YYYY-Www` ISO week labels
    pub weeks: Vec<String>,
    pub topics: BTreeMap<String, Vec<usize>>,
}

/// Radar axes for one topic, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadarAxes {
    pub momentum: f64,
    pub recency_share: f64,
    pub cross_list_breadth: f64,
    pub revision_churn: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendRadar {
    pub generated_at: String,
    pub topics: BTreeMap<String, RadarAxes>,
}

pub fn metrics_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("metrics")
}

/// Write `value` to `metrics/<file_name>`.
pub fn write_metric<T: Serialize>(data_dir: &Path, file_name: &str, value: &T) -> Result<PathBuf> {
    let path = metrics_dir(data_dir).join(file_name);
    write_json(&path, value)?;
    log::debug!("wrote {}", path.display());
    Ok(path)
}

fn window_start(reference: NaiveDate, window_days: u32) -> NaiveDate {
    reference
        .checked_sub_days(Days::new(u64::from(window_days)))
        .unwrap_or(NaiveDate::MIN)
}

/// Recently revised papers, most churned first.
///
/// Candidates have at least two versions and an `updated_at` inside the
/// window; score is `0.7 * version_count + 0.3 * decay(age(updated_at), 30)`.
pub fn compute_version_churn(
    papers: &[Paper],
    reference: NaiveDate,
    window_days: u32,
    limit: usize,
) -> VersionChurn {
    let start = window_start(reference, window_days);

    let mut scored: Vec<(f64, &Paper)> = papers
        .iter()
        .filter(|p| p.metrics.version_count >= 2)
        .filter(|p| parse_date(&p.updated_at).is_some_and(|d| d >= start))
        .map(|p| {
            let score = 0.7 * p.metrics.version_count as f64
                + 0.3 * recency(&p.updated_at, reference, f64::from(METRICS_WINDOW_DAYS));
            (score, p)
        })
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    VersionChurn {
        generated_at: format_date(reference),
        window: format!("{window_days}d"),
        papers: scored
            .into_iter()
            .take(limit)
            .map(|(_, p)| ChurnEntry {
                arxiv_id: p.id.clone(),
                title: p.title.clone(),
                updated_at: p.updated_at.clone(),
                version_count: p.metrics.version_count,
                primary_category: p.primary_category.clone(),
                links: p.links.clone(),
            })
            .collect(),
    }
}

/// Primary → secondary category co-occurrence for cross-listed papers.
///
/// Only papers whose `submitted_at` parses to a date before the window are
/// excluded; undated papers count.
pub fn compute_crosslist_heatmap(
    papers: &[Paper],
    reference: NaiveDate,
    window_days: u32,
) -> CrosslistHeatmap {
    let start = window_start(reference, window_days);
    let mut categories = BTreeSet::new();
    let mut matrix: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();

    for paper in papers {
        if parse_date(&paper.submitted_at).is_some_and(|d| d < start) {
            continue;
        }
        let primary = &paper.primary_category;
        if primary.is_empty() || paper.categories.len() <= 1 {
            continue;
        }
        categories.insert(primary.clone());
        categories.extend(paper.categories.iter().cloned());

        let row = matrix.entry(primary.clone()).or_default();
        for category in paper.categories.iter().filter(|c| *c != primary) {
            *row.entry(category.clone()).or_default() += 1;
        }
    }

    CrosslistHeatmap {
        generated_at: format_date(reference),
        window: format!("{window_days}d"),
        categories: categories.into_iter().collect(),
        matrix,
    }
}

fn week_label(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

/// Count tagged papers per topic per ISO week of `submitted_at`.
///
/// Weeks are those containing `reference - 7*i` days for `i` in
/// `weeks_back-1..=0`. Undated papers, papers outside those weeks and tags
/// for unknown topics are ignored.
pub fn compute_topic_timeseries(
    papers: &[Paper],
    topics: &[Topic],
    reference: NaiveDate,
    weeks_back: u32,
) -> TopicTimeseries {
    let mut weeks: Vec<String> = Vec::new();
    for i in (0..weeks_back).rev() {
        let Some(date) = reference.checked_sub_days(Days::new(u64::from(i) * 7)) else {
            continue;
        };
        let label = week_label(date);
        if !weeks.contains(&label) {
            weeks.push(label);
        }
    }
    let slot: BTreeMap<&str, usize> = weeks
        .iter()
        .enumerate()
        .map(|(i, w)| (w.as_str(), i))
        .collect();

    let mut series: BTreeMap<String, Vec<usize>> = topics
        .iter()
        .map(|t| (t.id.clone(), vec![0; weeks.len()]))
        .collect();

    for paper in papers {
        let Some(submitted) = parse_date(&paper.submitted_at) else {
            continue;
        };
        let Some(&index) = slot.get(week_label(submitted).as_str()) else {
            continue;
        };
        for tag in &paper.topic_tags {
            if let Some(counts) = series.get_mut(&tag.topic_id) {
                counts[index] += 1;
            }
        }
    }

    TopicTimeseries {
        generated_at: format_date(reference),
        weeks,
        topics: series,
    }
}

#[derive(Default)]
struct RadarStats {
    recent: usize,
    cross_list_sum: f64,
    churn_sum: f64,
    total: usize,
}

impl RadarStats {
    fn mean(&self, sum: f64) -> f64 {
        if self.total == 0 { 0.0 } else { sum / self.total as f64 }
    }
}

/// Four normalized axes per topic for the trend radar.
///
/// - `momentum`: `(m + 1) / 2` clamped to `[0, 1]`
/// - `recency_share`: tagged papers submitted in the window, over the busiest topic
/// - `cross_list_breadth`: mean `cross_list_count`, over the widest topic
/// - `revision_churn`: mean of `min(1, (versions-1)/3) * decay(age(updated_at), 30)`
///
/// Divisors never drop below 1.
pub fn compute_trend_radar(
    papers: &[Paper],
    topics: &[Topic],
    momentum: &BTreeMap<String, f64>,
    reference: NaiveDate,
    window_days: u32,
) -> TrendRadar {
    let start = window_start(reference, window_days);
    let mut stats: BTreeMap<&str, RadarStats> = topics
        .iter()
        .map(|t| (t.id.as_str(), RadarStats::default()))
        .collect();

    for paper in papers {
        let is_recent = parse_date(&paper.submitted_at).is_some_and(|d| d >= start);
        let revisions = paper.metrics.version_count.saturating_sub(1) as f64;
        let churn = (revisions / 3.0).min(1.0)
            * recency(&paper.updated_at, reference, f64::from(METRICS_WINDOW_DAYS));
        for tag in &paper.topic_tags {
            let Some(entry) = stats.get_mut(tag.topic_id.as_str()) else {
                continue;
            };
            if is_recent {
                entry.recent += 1;
            }
            entry.cross_list_sum += paper.metrics.cross_list_count as f64;
            entry.churn_sum += churn;
            entry.total += 1;
        }
    }

    let max_recent = stats.values().map(|s| s.recent).max().unwrap_or(0).max(1) as f64;
    let max_cross = stats
        .values()
        .map(|s| s.mean(s.cross_list_sum))
        .fold(1.0, f64::max);
    let max_churn = stats
        .values()
        .map(|s| s.mean(s.churn_sum))
        .fold(1.0, f64::max);

    let unit = |v: f64| v.clamp(0.0, 1.0);
    let radar = stats
        .iter()
        .map(|(id, s)| {
            let m = momentum.get(*id).copied().unwrap_or(0.0);
            let axes = RadarAxes {
                momentum: unit((m + 1.0) / 2.0),
                recency_share: unit(s.recent as f64 / max_recent),
                cross_list_breadth: unit(s.mean(s.cross_list_sum) / max_cross),
                revision_churn: unit(s.mean(s.churn_sum) / max_churn),
            };
            (id.to_string(), axes)
        })
        .collect();

    TrendRadar {
        generated_at: format_date(reference),
        topics: radar,
    }
}
