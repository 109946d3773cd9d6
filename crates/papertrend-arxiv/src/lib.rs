//! Papertrend arXiv - harvesting from the arXiv export API
//!
//! Builds query URLs, parses Atom feeds with quick-xml, normalizes entries
//! into [`papertrend_store::Paper`] records and pages through results via
//! the shared rate-limited client. Also archives OAI-PMH `ListRecords`
//! responses for bulk harvests.
//!
//! # Example
//!
//! ```ignore
//! use papertrend_arxiv::{ArxivConfig, HarvestContext, Harvester};
//!
//! let client = papertrend_core::RateLimitedClient::new(Default::default())?;
//! let config = ArxivConfig::default();
//! let harvester = Harvester::new(&client, &config.api_url);
//! let ctx = HarvestContext::new("", "2026-01-22T00:00:00Z", "manual");
//! let outcome = harvester.harvest_query("cat:cs.LG", 200, &ctx, &indicatif::ProgressBar::hidden())?;
//! println!("harvested {} papers", outcome.papers.len());
//! ```

pub mod config;
pub mod harvest;
pub mod normalize;
pub mod oai;
pub mod parser;
pub mod query;

// Re-exports
pub use config::ArxivConfig;
pub use harvest::{FeedSource, HarvestOutcome, Harvester};
pub use normalize::{HarvestContext, normalize};
pub use parser::{ParsedFeed, RawEntry, parse_feed};
pub use query::FeedQuery;
