//! papertrend - arXiv harvest and trend ranking
//!
//! Harvests topic queries from the arXiv export API, merges them into a
//! JSON paper corpus, tags papers against a topic taxonomy and ranks them.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod cmd;

use papertrend_cli::config::Config;

#[derive(Parser)]
#[command(name = "papertrend")]
#[command(about = "Harvest, tag and rank arXiv papers into JSON snapshots")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./papertrend.toml or ~/.config/papertrend/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Minimum milliseconds between request starts
    #[arg(long, global = true)]
    min_interval_ms: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Maximum retry attempts for transient failures
    #[arg(long, global = true)]
    max_retries: Option<u32>,
}

impl Cli {
    /// Flags win over the `[http]` table.
    fn apply_http_overrides(&self, config: &mut Config) {
        let http = &mut config.http;
        http.min_interval_ms = self.min_interval_ms.unwrap_or(http.min_interval_ms);
        http.timeout_secs = self.timeout.unwrap_or(http.timeout_secs);
        http.max_retries = self.max_retries.unwrap_or(http.max_retries);
    }
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline against the data directory
    Run(cmd::run::RunArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let progress = Arc::new(papertrend_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug; spinners show activity
    //   non-TTY: info unless --debug; logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    papertrend_core::init_logging(quiet, cli.debug, multi);

    papertrend_core::install_signal_handlers().context("failed to install signal handlers")?;

    let mut config = if let Some(path) = &cli.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    cli.apply_http_overrides(&mut config);

    match cli.command {
        Command::Run(args) => cmd::run::run(args, &config, &progress),
        Command::Config => cmd::config::run(&config),
    }
}
