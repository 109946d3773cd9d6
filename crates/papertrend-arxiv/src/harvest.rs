//! Paged harvesting against the arXiv export API
//!
//! All requests go through a [`FeedSource`], normally the shared
//! [`RateLimitedClient`], so every page and retry respects one rate limit.

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use papertrend_core::{FetchError, RateLimitedClient, fmt_num, is_shutdown_requested};
use papertrend_store::Paper;

use crate::normalize::{HarvestContext, normalize};
use crate::parser::{ParsedFeed, parse_feed};
use crate::query::{FeedQuery, MAX_PAGE_SIZE};

/// Identifiers per `id_list` request during anchor backfill.
pub const ID_CHUNK_SIZE: usize = 25;

/// Something that can GET a URL and return the body.
pub trait FeedSource {
    fn get(&self, url: &str) -> Result<String, FetchError>;
}

impl FeedSource for RateLimitedClient {
    fn get(&self, url: &str) -> Result<String, FetchError> {
        self.fetch_blocking(url)
    }
}

/// Papers collected for one query.
#[derive(Debug, Default)]
pub struct HarvestOutcome {
    pub papers: Vec<Paper>,
    pub pages: usize,
    /// Stopped early because shutdown was requested
    pub interrupted: bool,
}

pub struct Harvester<'a, S: FeedSource + ?Sized> {
    source: &'a S,
    api_url: String,
    stop_requested: fn() -> bool,
}

impl<'a, S: FeedSource + ?Sized> Harvester<'a, S> {
    pub fn new(source: &'a S, api_url: &str) -> Self {
        Self {
            source,
            api_url: api_url.to_string(),
            stop_requested: is_shutdown_requested,
        }
    }

    /// Override the between-pages stop check.
    pub fn with_stop_check(mut self, stop_requested: fn() -> bool) -> Self {
        self.stop_requested = stop_requested;
        self
    }

    /// Fetch and parse a single page.
    pub fn fetch_page(&self, query: &FeedQuery) -> Result<ParsedFeed> {
        let url = query.to_url(&self.api_url)?;
        log::debug!("GET {url}");
        let body = self
            .source
            .get(&url)
            .with_context(|| format!("failed to fetch {url}"))?;
        Ok(parse_feed(&body))
    }

    /// Page through `query` until `max_results` papers, a short page, or shutdown.
    pub fn harvest_query(
        &self,
        query: &str,
        max_results: usize,
        ctx: &HarvestContext,
        pb: &ProgressBar,
    ) -> Result<HarvestOutcome> {
        let mut outcome = HarvestOutcome::default();
        let page_size = MAX_PAGE_SIZE.min(max_results);
        let ctx = ctx.with_query(query);
        let mut start = 0;

        while outcome.papers.len() < max_results {
            if (self.stop_requested)() {
                log::warn!("shutdown requested, stopping harvest of {query:?}");
                outcome.interrupted = true;
                break;
            }
            let want = page_size.min(max_results - outcome.papers.len());
            let page = self.fetch_page(&FeedQuery::search(query).page(start, want))?;
            outcome.pages += 1;
            let received = page.entries.len();
            // Entries without an id still count toward the page window
            let kept = page.entries.iter().take(want).filter(|e| !e.id.is_empty());
            let before = outcome.papers.len();
            outcome.papers.extend(kept.map(|e| normalize(e, &ctx)));
            let skipped = received.min(want) - (outcome.papers.len() - before);
            if skipped > 0 {
                log::warn!("{query:?}: skipped {skipped} entries without an id");
            }
            pb.set_message(format!(
                "{} papers ({} reported)",
                fmt_num(outcome.papers.len()),
                fmt_num(page.total_results)
            ));
            if received < want {
                break;
            }
            start += want;
        }

        log::debug!(
            "{query:?}: {} papers in {} page(s)",
            outcome.papers.len(),
            outcome.pages
        );
        Ok(outcome)
    }

    /// Fetch specific identifiers in `id_list` chunks.
    pub fn fetch_by_ids(&self, ids: &[String], ctx: &HarvestContext) -> Result<Vec<Paper>> {
        let mut papers = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(ID_CHUNK_SIZE) {
            if (self.stop_requested)() {
                log::warn!("shutdown requested, skipping remaining id batches");
                break;
            }
            let ctx = ctx.with_query(&format!("id_list:{}", chunk.join(",")));
            let page = self.fetch_page(&FeedQuery::ids(chunk))?;
            papers.extend(
                page.entries
                    .iter()
                    .filter(|e| !e.id.is_empty())
                    .map(|e| normalize(e, &ctx)),
            );
        }
        Ok(papers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays canned bodies in order and records requested URLs.
    struct Canned {
        bodies: RefCell<VecDeque<Result<String, FetchError>>>,
        urls: RefCell<Vec<String>>,
    }

    impl Canned {
        fn new(bodies: Vec<Result<String, FetchError>>) -> Self {
            Self {
                bodies: RefCell::new(bodies.into()),
                urls: RefCell::new(Vec::new()),
            }
        }
    }

    impl FeedSource for Canned {
        fn get(&self, url: &str) -> Result<String, FetchError> {
            self.urls.borrow_mut().push(url.to_string());
            self.bodies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok("<feed/>".to_string()))
        }
    }

    fn feed(ids: std::ops::Range<usize>, total: usize) -> Result<String, FetchError> {
        let entries: String = ids
            .map(|i| {
                format!(
                    "<entry><id>http://arxiv.org/abs/2601.{i:05}v1</id>\
                     <published>2026-01-10T00:00:00Z</published>\
                     <title>Paper {i}</title><category term=\"cs.LG\"/></entry>"
                )
            })
            .collect();
        Ok(format!(
            "<feed><opensearch:totalResults>{total}</opensearch:totalResults>{entries}</feed>"
        ))
    }

    fn ctx() -> HarvestContext {
        HarvestContext::new("", "2026-01-22T00:00:00Z", "snapshot-2026-01-22")
    }

    const API: &str = "http://export.arxiv.org/api/query";

    #[test]
    fn pages_until_short_page() {
        let source = Canned::new(vec![feed(0..100, 150), feed(100..150, 150)]);
        let harvester = Harvester::new(&source, API).with_stop_check(|| false);
        let outcome = harvester
            .harvest_query("cat:cs.LG", 200, &ctx(), &ProgressBar::hidden())
            .unwrap();

        assert_eq!(outcome.papers.len(), 150);
        assert_eq!(outcome.pages, 2);
        assert!(!outcome.interrupted);
        let urls = source.urls.borrow();
        assert!(urls[0].contains("start=0&max_results=100"));
        assert!(urls[1].contains("start=100&max_results=100"));
        assert_eq!(outcome.papers[0].provenance.queries, vec!["cat:cs.LG"]);
    }

    #[test]
    fn stops_at_max_results() {
        let source = Canned::new(vec![feed(0..30, 500), feed(30..50, 500)]);
        let harvester = Harvester::new(&source, API).with_stop_check(|| false);
        let outcome = harvester
            .harvest_query("cat:cs.LG", 50, &ctx(), &ProgressBar::hidden())
            .unwrap();
        assert_eq!(outcome.papers.len(), 30);
        assert_eq!(source.urls.borrow().len(), 1);
        assert!(source.urls.borrow()[0].contains("max_results=50"));
    }

    #[test]
    fn empty_page_ends_harvest() {
        let source = Canned::new(vec![feed(0..0, 0)]);
        let harvester = Harvester::new(&source, API).with_stop_check(|| false);
        let outcome = harvester
            .harvest_query("cat:cs.XX", 200, &ctx(), &ProgressBar::hidden())
            .unwrap();
        assert!(outcome.papers.is_empty());
        assert_eq!(outcome.pages, 1);
    }

    #[test]
    fn shutdown_stops_before_next_page() {
        let source = Canned::new(vec![feed(0..100, 1000)]);
        let harvester = Harvester::new(&source, API).with_stop_check(|| true);
        let outcome = harvester
            .harvest_query("cat:cs.LG", 200, &ctx(), &ProgressBar::hidden())
            .unwrap();
        assert!(outcome.interrupted);
        assert!(source.urls.borrow().is_empty());
    }

    #[test]
    fn fetch_error_propagates() {
        let source = Canned::new(vec![Err(FetchError::Http {
            status: Some(503),
            message: "Service Unavailable".into(),
        })]);
        let harvester = Harvester::new(&source, API).with_stop_check(|| false);
        let err = harvester
            .harvest_query("cat:cs.LG", 10, &ctx(), &ProgressBar::hidden())
            .unwrap_err();
        assert!(format!("{err:#}").contains("HTTP 503"));
    }

    #[test]
    fn entries_without_id_are_dropped() {
        let body = "<feed><opensearch:totalResults>3</opensearch:totalResults>\
                    <entry><title>No id</title></entry>\
                    <entry><id>http://arxiv.org/abs/2601.00007v2</id>\
                    <published>2026-01-10T00:00:00Z</published><title>Kept</title></entry>\
                    <entry><title>Also none</title></entry></feed>";
        let source = Canned::new(vec![Ok(body.to_string())]);
        let harvester = Harvester::new(&source, API).with_stop_check(|| false);
        let outcome = harvester
            .harvest_query("cat:cs.LG", 10, &ctx(), &ProgressBar::hidden())
            .unwrap();

        assert_eq!(outcome.papers.len(), 1);
        assert_eq!(outcome.papers[0].id, "2601.00007");
        // Three entries on a page of ten is still a short page
        assert_eq!(outcome.pages, 1);
        assert_eq!(source.urls.borrow().len(), 1);
    }

    #[test]
    fn ids_fetched_in_chunks() {
        let ids: Vec<String> = (0..30).map(|i| format!("2601.{i:05}")).collect();
        let source = Canned::new(vec![feed(0..25, 25), feed(25..30, 5)]);
        let harvester = Harvester::new(&source, API).with_stop_check(|| false);
        let papers = harvester.fetch_by_ids(&ids, &ctx()).unwrap();

        assert_eq!(papers.len(), 30);
        let urls = source.urls.borrow();
        assert_eq!(urls.len(), 2);
        assert!(urls[0].contains("max_results=25"));
        assert!(urls[1].contains("max_results=5"));
        assert!(papers[0].provenance.queries[0].starts_with("id_list:2601.00000,2601.00001"));
    }
}
