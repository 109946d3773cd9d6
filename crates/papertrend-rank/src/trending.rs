//! Per-paper trending score
//!
//! ```text
//! score = w.recency    * decay(age(submitted_at), half_life)
//!       + w.momentum   * clamp(mean tag momentum, 0, 1)
//!       + w.cross_list * min(1, cross_list_count / 3)
//!       + w.churn      * min(1, (version_count - 1) / 3) * decay(age(updated_at), 30)
//! ```
//! `decay(age, h) = exp(-ln2 * age / h)`; ages are whole days, never negative.
//! Unparseable dates contribute 0.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Result, ensure};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use papertrend_store::Paper;
use papertrend_store::dates::{days_between, parse_date};
use papertrend_store::json::read_json;

/// Half-life for the update-recency term of churn.
const CHURN_HALF_LIFE_DAYS: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub recency: f64,
    pub momentum: f64,
    pub cross_list: f64,
    pub churn: f64,
}

/// `ranking/config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub weights: Weights,
    #[serde(default = "default_half_life")]
    pub recency_half_life_days: f64,
    #[serde(default = "default_momentum_window")]
    pub momentum_window_days: u32,
    #[serde(default = "default_baseline_window")]
    pub baseline_window_days: u32,
}

fn default_half_life() -> f64 {
    14.0
}

fn default_momentum_window() -> u32 {
    7
}

fn default_baseline_window() -> u32 {
    14
}

impl RankingConfig {
    pub fn with_weights(weights: Weights) -> Self {
        Self {
            version: None,
            weights,
            recency_half_life_days: default_half_life(),
            momentum_window_days: default_momentum_window(),
            baseline_window_days: default_baseline_window(),
        }
    }

    /// Version string, empty when unset.
    pub fn version_label(&self) -> &str {
        self.version.as_deref().unwrap_or("")
    }
}

pub fn ranking_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("ranking").join("config.json")
}

/// Load the ranking config. Missing or invalid files are errors.
pub fn load_ranking_config(path: &Path) -> Result<RankingConfig> {
    let config: RankingConfig = read_json(path)?;
    ensure!(
        config.recency_half_life_days > 0.0,
        "{}: recency_half_life_days must be positive",
        path.display()
    );
    Ok(config)
}

/// Exponential decay by whole-day age; 0 for unparseable dates.
pub fn recency(date: &str, reference: NaiveDate, half_life_days: f64) -> f64 {
    let Some(date) = parse_date(date) else {
        return 0.0;
    };
    let age = days_between(date, reference).max(0) as f64;
    let decay = (-std::f64::consts::LN_2 * age / half_life_days).exp();
    if decay.is_finite() { decay } else { 0.0 }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Score one paper against topic momentum.
pub fn trending_score(
    paper: &Paper,
    momentum: &BTreeMap<String, f64>,
    config: &RankingConfig,
    reference: NaiveDate,
) -> f64 {
    let w = &config.weights;
    let recency_term = recency(&paper.submitted_at, reference, config.recency_half_life_days);

    let momentum_term = if paper.topic_tags.is_empty() {
        0.0
    } else {
        let sum: f64 = paper
            .topic_tags
            .iter()
            .map(|t| momentum.get(&t.topic_id).copied().unwrap_or(0.0))
            .sum();
        (sum / paper.topic_tags.len() as f64).clamp(0.0, 1.0)
    };

    let cross_list = (paper.metrics.cross_list_count as f64 / 3.0).min(1.0);
    let churn = ((paper.metrics.version_count as f64 - 1.0) / 3.0).clamp(0.0, 1.0)
        * recency(&paper.updated_at, reference, CHURN_HALF_LIFE_DAYS);

    round4(
        w.recency * recency_term
            + w.momentum * momentum_term
            + w.cross_list * cross_list
            + w.churn * churn,
    )
}

/// Overwrite `metrics.trending_score` on every paper.
pub fn compute_trending(
    papers: Vec<Paper>,
    momentum: &BTreeMap<String, f64>,
    config: &RankingConfig,
    reference: NaiveDate,
) -> Vec<Paper> {
    papers
        .into_iter()
        .map(|mut paper| {
            paper.metrics.trending_score = trending_score(&paper, momentum, config, reference);
            paper
        })
        .collect()
}
