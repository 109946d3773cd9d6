//! `papertrend run` - harvest, merge, tag and rank in one pass

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{ArgAction, Args};

use papertrend_arxiv::FeedSource;
use papertrend_cli::config::Config;
use papertrend_cli::pipeline::{RunOptions, run_pipeline};
use papertrend_core::{RateLimitedClient, SharedProgress, fmt_num};

use crate::cmd::print_table;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Harvest window recorded in provenance, in days
    #[arg(long = "windowDays")]
    pub window_days: Option<u32>,

    /// Maximum papers harvested per topic query
    #[arg(long = "maxPerTopic")]
    pub max_per_topic: Option<usize>,

    /// Compute everything but write nothing
    #[arg(long = "dryRun")]
    pub dry_run: bool,

    /// Skip all network requests; rescore the stored corpus
    #[arg(long)]
    pub offline: bool,

    /// Archive one OAI-PMH ListRecords page before harvesting
    #[arg(
        long = "useOai",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true"
    )]
    pub use_oai: bool,

    /// Data directory (default from config)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

pub fn run(args: RunArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let opts = RunOptions {
        data_dir: args
            .data_dir
            .unwrap_or_else(|| config.output.data_dir.clone()),
        window_days: args.window_days.unwrap_or(config.pipeline.window_days),
        max_per_topic: args.max_per_topic.unwrap_or(config.pipeline.max_per_topic),
        feed_limit: config.pipeline.feed_limit,
        dry_run: args.dry_run,
        offline: args.offline,
        use_oai: args.use_oai,
        arxiv: config.arxiv.endpoints(),
        commit: std::env::var("GITHUB_SHA").unwrap_or_else(|_| "local".to_string()),
    };

    // One client for the whole process: every request shares its rate limit
    let client = if opts.offline {
        None
    } else {
        Some(
            RateLimitedClient::new(config.http.fetch_config())
                .context("failed to build HTTP client")?,
        )
    };
    let source = client.as_ref().map(|c| c as &dyn FeedSource);

    log::info!(
        "papertrend run: data dir {}, {}",
        opts.data_dir.display(),
        match (opts.offline, opts.dry_run) {
            (true, true) => "offline dry run",
            (true, false) => "offline",
            (false, true) => "dry run",
            (false, false) => "online",
        }
    );

    let summary = run_pipeline(&opts, source, progress, Utc::now())?;

    let mut rows = vec![
        ("Data directory", opts.data_dir.display().to_string()),
        ("Harvest window", summary.harvest_window.clone()),
        ("Topics", summary.topics.to_string()),
        ("Anchors fetched", fmt_num(summary.anchors_fetched)),
        ("Harvested", fmt_num(summary.harvested)),
        ("Papers", fmt_num(summary.papers)),
        ("Tagged", fmt_num(summary.tagged)),
        ("Topic feeds", summary.feeds.to_string()),
    ];
    if summary.application_feeds > 0 {
        rows.push(("Application feeds", summary.application_feeds.to_string()));
    }
    if let Some(path) = &summary.oai_archive {
        rows.push(("OAI archive", path.display().to_string()));
    }
    if summary.ledger_updated {
        rows.push(("Ledger", "ranking config recorded".to_string()));
    }
    rows.push(("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())));
    print_table(if opts.dry_run { "Dry run" } else { "Pipeline" }, &rows);

    if summary.interrupted {
        log::warn!("harvest was interrupted; already-fetched papers were merged");
    }
    Ok(())
}
