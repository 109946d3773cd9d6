//! Per-topic feeds (`topic_feeds/<topic>.json`)

use std::cmp::Reverse;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use papertrend_store::Paper;
use papertrend_store::dates::{format_date, parse_date};
use papertrend_store::json::{read_json_opt, write_json};

use crate::topic::Topic;

pub const DEFAULT_FEED_LIMIT: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicFeed {
    pub topic: String,
    pub generated_at: String,
    pub latest: Vec<String>,
    pub trending: Vec<String>,
}

pub fn feeds_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("topic_feeds")
}

/// `<topic>.json`, with anything outside `[A-Za-z0-9_-]` mapped to `_`
/// so a taxonomy id cannot leave the feeds directory.
pub fn feed_file_name(topic_id: &str) -> String {
    let stem: String = topic_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{stem}.json")
}

/// Feed for one topic. Ties keep corpus order; undated papers sort last in `latest`.
pub fn build_topic_feed(
    papers: &[Paper],
    topic: &Topic,
    limit: usize,
    reference: NaiveDate,
) -> TopicFeed {
    let tagged: Vec<&Paper> = papers.iter().filter(|p| p.has_topic(&topic.id)).collect();

    let mut by_date = tagged.clone();
    by_date.sort_by_key(|p| Reverse(parse_date(&p.submitted_at)));

    let mut by_score = tagged;
    by_score.sort_by(|a, b| {
        b.metrics
            .trending_score
            .total_cmp(&a.metrics.trending_score)
    });

    let ids = |list: Vec<&Paper>| -> Vec<String> {
        list.into_iter().take(limit).map(|p| p.id.clone()).collect()
    };

    TopicFeed {
        topic: topic.id.clone(),
        generated_at: format_date(reference),
        latest: ids(by_date),
        trending: ids(by_score),
    }
}

/// Write one feed file per topic; returns how many were written.
pub fn write_topic_feeds(
    data_dir: &Path,
    papers: &[Paper],
    topics: &[Topic],
    limit: usize,
    reference: NaiveDate,
) -> Result<usize> {
    let dir = feeds_dir(data_dir);
    for topic in topics {
        let feed = build_topic_feed(papers, topic, limit, reference);
        write_json(&dir.join(feed_file_name(&topic.id)), &feed)?;
    }
    log::debug!("wrote {} topic feeds to {}", topics.len(), dir.display());
    Ok(topics.len())
}

/// One row of `applications/registry.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub slug: String,
    #[serde(default)]
    pub query: String,
}

/// `applications/<slug>.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationFeed {
    pub latest: Vec<String>,
    pub trending: Vec<String>,
    pub query: String,
    pub window: String,
}

pub fn applications_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("applications")
}

/// Corpus-wide latest and trending lists, shared by every application.
///
/// `latest` orders by `updated_at`, falling back to `submitted_at`.
pub fn build_application_feed(
    papers: &[Paper],
    app: &Application,
    limit: usize,
    window: &str,
) -> ApplicationFeed {
    let mut by_update: Vec<&Paper> = papers.iter().collect();
    by_update.sort_by_key(|p| {
        Reverse(parse_date(&p.updated_at).or_else(|| parse_date(&p.submitted_at)))
    });

    let mut by_score: Vec<&Paper> = papers.iter().collect();
    by_score.sort_by(|a, b| {
        b.metrics
            .trending_score
            .total_cmp(&a.metrics.trending_score)
    });

    let ids = |list: Vec<&Paper>| -> Vec<String> {
        list.into_iter().take(limit).map(|p| p.id.clone()).collect()
    };

    ApplicationFeed {
        latest: ids(by_update),
        trending: ids(by_score),
        query: app.query.clone(),
        window: window.to_string(),
    }
}

/// Write a feed per registered application. A missing registry means none.
pub fn write_application_feeds(
    data_dir: &Path,
    papers: &[Paper],
    limit: usize,
    window: &str,
) -> Result<usize> {
    let dir = applications_dir(data_dir);
    let Some(registry) = read_json_opt::<Vec<Application>>(&dir.join("registry.json"))? else {
        log::debug!("no application registry, skipping application feeds");
        return Ok(0);
    };
    for app in &registry {
        let feed = build_application_feed(papers, app, limit, window);
        write_json(&dir.join(feed_file_name(&app.slug)), &feed)?;
    }
    log::debug!("wrote {} application feeds", registry.len());
    Ok(registry.len())
}
