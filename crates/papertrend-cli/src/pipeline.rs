//! End-to-end pipeline: harvest → merge → tag → score → derived artifacts
//!
//! ```text
//! topics.json + ranking/config.json
//!        │
//!        ▼
//!   [OAI archive] → anchor backfill → topic harvest      (skipped offline)
//!        │
//!        ▼
//!   write_snapshots (merge) → tag → momentum → trending → persist
//!        │
//!        ▼
//!   topic/application feeds, metrics, ledger, provenance  (skipped in dry run)
//! ```
//!
//! Dry runs compute everything in memory and write nothing.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Days, SecondsFormat, Utc};
use serde::Deserialize;

use papertrend_arxiv::{ArxivConfig, FeedSource, HarvestContext, Harvester};
use papertrend_core::ProgressContext;
use papertrend_rank::metrics::{
    CROSSLIST_HEATMAP_FILE, METRICS_WINDOW_DAYS, TIMESERIES_WEEKS, TOPIC_MOMENTUM_FILE,
    TOPIC_TIMESERIES_FILE, TREND_RADAR_FILE, VERSION_CHURN_FILE, VERSION_CHURN_LIMIT,
};
use papertrend_rank::{
    RULES_VERSION, Topic, anchor_ids, compute_crosslist_heatmap, compute_topic_momentum,
    compute_topic_timeseries, compute_trend_radar, compute_trending, compute_version_churn,
    load_ranking_config, load_topics, ranking_config_path, tag_papers, topics_path,
    write_application_feeds, write_metric, write_topic_feeds,
};
use papertrend_store::dates::format_date;
use papertrend_store::json::read_json_opt;
use papertrend_store::paper::SOURCE_ARXIV_API;
use papertrend_store::{Paper, RunRecord, SnapshotStore, append_ledger_entry, write_provenance};

/// Everything one run needs besides the network source.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub data_dir: PathBuf,
    /// Days covered by the recorded harvest window
    pub window_days: u32,
    pub max_per_topic: usize,
    pub feed_limit: usize,
    pub dry_run: bool,
    /// Skip every network request
    pub offline: bool,
    /// Archive one OAI-PMH `ListRecords` page before the API harvest
    pub use_oai: bool,
    pub arxiv: ArxivConfig,
    /// Recorded in provenance
    pub commit: String,
}

/// What a run did, for the summary table.
#[derive(Debug, Default)]
pub struct PipelineSummary {
    pub topics: usize,
    pub anchors_fetched: usize,
    pub harvested: usize,
    pub interrupted: bool,
    pub papers: usize,
    pub tagged: usize,
    pub feeds: usize,
    pub application_feeds: usize,
    pub oai_archive: Option<PathBuf>,
    pub ledger_updated: bool,
    pub harvest_window: String,
    pub elapsed: Duration,
}

/// `editorial/query-pack-version.json`
#[derive(Debug, Default, Deserialize)]
struct QueryPack {
    #[serde(default)]
    version: String,
}

fn query_pack_path(data_dir: &Path) -> PathBuf {
    data_dir.join("editorial").join("query-pack-version.json")
}

/// `"<now - window_days> to <now>"`
pub fn harvest_window(now: DateTime<Utc>, window_days: u32) -> String {
    let end = now.date_naive();
    let start = end
        .checked_sub_days(Days::new(u64::from(window_days)))
        .unwrap_or(end);
    format!("{} to {}", format_date(start), format_date(end))
}

/// Run the whole pipeline once.
///
/// `source` is required unless `opts.offline`. `now` fixes the reference
/// date for scoring and every timestamp written.
pub fn run_pipeline(
    opts: &RunOptions,
    source: Option<&dyn FeedSource>,
    progress: &ProgressContext,
    now: DateTime<Utc>,
) -> Result<PipelineSummary> {
    let started = Instant::now();
    let data_dir = opts.data_dir.as_path();
    let reference = now.date_naive();
    let mut summary = PipelineSummary {
        harvest_window: harvest_window(now, opts.window_days),
        ..Default::default()
    };

    let topics = load_topics(&topics_path(data_dir))?;
    let ranking = load_ranking_config(&ranking_config_path(data_dir))?;
    let query_pack: QueryPack = read_json_opt(&query_pack_path(data_dir))?.unwrap_or_default();
    summary.topics = topics.len();
    log::info!(
        "{} topics, ranking config {:?}",
        topics.len(),
        ranking.version_label()
    );

    let store = SnapshotStore::new(data_dir);
    let mut corpus = store.load_corpus()?;

    let mut harvested = Vec::new();
    if opts.offline {
        log::info!("offline: skipping harvest");
    } else {
        let Some(source) = source else {
            bail!("a feed source is required unless running offline");
        };
        if opts.use_oai {
            if opts.dry_run {
                log::info!("dry run: skipping OAI harvest");
            } else {
                let oai = papertrend_arxiv::oai::harvest_oai(
                    source,
                    &opts.arxiv.oai_url,
                    data_dir,
                    now,
                )?;
                summary.oai_archive = Some(oai.raw_path);
            }
        }
        let outcome = harvest(opts, source, &topics, &corpus, progress, now)?;
        summary.anchors_fetched = outcome.anchors;
        summary.interrupted = outcome.interrupted;
        harvested = outcome.papers;
    }
    summary.harvested = harvested.len();

    let papers = if harvested.is_empty() {
        corpus.into_sorted()
    } else if opts.dry_run {
        corpus.merge_all(&harvested);
        corpus.into_sorted()
    } else {
        store.write_snapshots(&harvested)?.papers
    };
    summary.papers = papers.len();

    let tagged = tag_papers(papers, &topics, RULES_VERSION);
    summary.tagged = tagged.iter().filter(|p| !p.topic_tags.is_empty()).count();
    log::info!("tagged {} of {} papers", summary.tagged, tagged.len());

    let momentum = compute_topic_momentum(
        &tagged,
        &topics,
        reference,
        ranking.momentum_window_days,
        ranking.baseline_window_days,
    );
    let trended = compute_trending(tagged, &momentum.topics, &ranking, reference);

    if opts.dry_run {
        log::info!("dry run: nothing persisted");
        summary.elapsed = started.elapsed();
        return Ok(summary);
    }

    write_metric(data_dir, TOPIC_MOMENTUM_FILE, &momentum)?;
    let papers = store.persist(trended)?.papers;

    summary.feeds = write_topic_feeds(data_dir, &papers, &topics, opts.feed_limit, reference)?;
    write_metric(
        data_dir,
        VERSION_CHURN_FILE,
        &compute_version_churn(&papers, reference, METRICS_WINDOW_DAYS, VERSION_CHURN_LIMIT),
    )?;
    write_metric(
        data_dir,
        CROSSLIST_HEATMAP_FILE,
        &compute_crosslist_heatmap(&papers, reference, METRICS_WINDOW_DAYS),
    )?;
    write_metric(
        data_dir,
        TOPIC_TIMESERIES_FILE,
        &compute_topic_timeseries(&papers, &topics, reference, TIMESERIES_WEEKS),
    )?;
    write_metric(
        data_dir,
        TREND_RADAR_FILE,
        &compute_trend_radar(
            &papers,
            &topics,
            &momentum.topics,
            reference,
            METRICS_WINDOW_DAYS,
        ),
    )?;
    summary.application_feeds =
        write_application_feeds(data_dir, &papers, opts.feed_limit, &summary.harvest_window)?;

    summary.ledger_updated = append_ledger_entry(data_dir, ranking.version_label(), now)?;

    let run = RunRecord {
        harvest_window: summary.harvest_window.clone(),
        source: SOURCE_ARXIV_API.to_string(),
        dataset: if opts.offline { "offline" } else { "prod" }.to_string(),
        records: papers.len(),
        status: if summary.interrupted { "interrupted" } else { "ok" }.to_string(),
        commit: opts.commit.clone(),
        ranking_config_version: ranking.version.clone(),
        query_pack_version: Some(query_pack.version),
    };
    write_provenance(data_dir, &run, now)?;

    summary.elapsed = started.elapsed();
    Ok(summary)
}

struct Harvest {
    papers: Vec<Paper>,
    anchors: usize,
    interrupted: bool,
}

/// Anchor backfill, then each topic's query in taxonomy order.
fn harvest(
    opts: &RunOptions,
    source: &dyn FeedSource,
    topics: &[Topic],
    corpus: &papertrend_store::Corpus,
    progress: &ProgressContext,
    now: DateTime<Utc>,
) -> Result<Harvest> {
    let harvester = Harvester::new(source, &opts.arxiv.api_url);
    let harvested_at = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let day = format_date(now.date_naive());
    let mut papers = Vec::new();

    let missing: Vec<String> = anchor_ids(topics)
        .into_iter()
        .filter(|id| !corpus.contains(id))
        .collect();
    let mut anchors = 0;
    if !missing.is_empty() {
        log::info!("backfilling {} anchor paper(s)", missing.len());
        let ctx = HarvestContext::new("", &harvested_at, &format!("evidence-{day}"));
        let fetched = harvester
            .fetch_by_ids(&missing, &ctx)
            .context("anchor backfill failed")?;
        anchors = fetched.len();
        papers.extend(fetched);
    }

    let ctx = HarvestContext::new("", &harvested_at, &format!("snapshot-{day}"));
    let mut interrupted = false;
    for topic in topics {
        if topic.query.is_empty() {
            log::debug!("{}: no query, not harvested", topic.id);
            continue;
        }
        let pb = progress.stage_line(&topic.id);
        let outcome = harvester
            .harvest_query(&topic.query, opts.max_per_topic, &ctx, &pb)
            .with_context(|| format!("harvest failed for topic {}", topic.id))?;
        pb.finish_and_clear();
        log::info!(
            "{}: {} papers in {} page(s)",
            topic.id,
            outcome.papers.len(),
            outcome.pages
        );
        papers.extend(outcome.papers);
        if outcome.interrupted {
            interrupted = true;
            break;
        }
    }

    Ok(Harvest {
        papers,
        anchors,
        interrupted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_spans_days_back() {
        let now = Utc.with_ymd_and_hms(2026, 1, 22, 6, 0, 0).unwrap();
        assert_eq!(harvest_window(now, 30), "2025-12-23 to 2026-01-22");
        assert_eq!(harvest_window(now, 0), "2026-01-22 to 2026-01-22");
    }
}
