//! `papertrend config` - show the effective configuration

use anyhow::Result;

use crate::cmd::print_table;
use papertrend_cli::config::Config;

pub fn run(config: &Config) -> Result<()> {
    let http = &config.http;
    let pipeline = &config.pipeline;
    print_table(
        "Setting",
        &[
            ("Data directory", config.output.data_dir.display().to_string()),
            ("arXiv API", config.arxiv.api_url.clone()),
            ("OAI-PMH", config.arxiv.oai_url.clone()),
            ("Request interval", format!("{}ms", http.min_interval_ms)),
            ("Timeout", format!("{}s", http.timeout_secs)),
            (
                "Retries",
                format!("{} (base delay {}ms)", http.max_retries, http.retry_delay_ms),
            ),
            ("Max per topic", pipeline.max_per_topic.to_string()),
            ("Window", format!("{} days", pipeline.window_days)),
            ("Feed limit", pipeline.feed_limit.to_string()),
        ],
    );
    Ok(())
}
