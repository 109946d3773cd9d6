//! arXiv API query URLs

use anyhow::{Context, Result};
use reqwest::Url;

/// Hard page-size ceiling of the export API.
pub const MAX_PAGE_SIZE: usize = 100;

/// One page request against `/api/query`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedQuery {
    pub search_query: Option<String>,
    /// Comma-separated identifiers
    pub id_list: Option<String>,
    pub start: usize,
    pub max_results: usize,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self {
            search_query: None,
            id_list: None,
            start: 0,
            max_results: MAX_PAGE_SIZE,
            sort_by: Some("submittedDate".to_string()),
            sort_order: Some("descending".to_string()),
        }
    }
}

impl FeedQuery {
    pub fn search(query: &str) -> Self {
        Self {
            search_query: Some(query.to_string()),
            ..Default::default()
        }
    }

    pub fn ids(ids: &[String]) -> Self {
        Self {
            id_list: Some(ids.join(",")),
            max_results: ids.len().max(1),
            ..Default::default()
        }
    }

    pub fn page(mut self, start: usize, max_results: usize) -> Self {
        self.start = start;
        self.max_results = max_results;
        self
    }

    /// Full request URL with percent-encoded parameters.
    pub fn to_url(&self, api_url: &str) -> Result<String> {
        let mut params: Vec<(&str, String)> = Vec::with_capacity(6);
        if let Some(q) = self.search_query.as_deref().filter(|q| !q.is_empty()) {
            params.push(("search_query", q.to_string()));
        }
        if let Some(ids) = self.id_list.as_deref().filter(|ids| !ids.is_empty()) {
            params.push(("id_list", ids.to_string()));
        }
        params.push(("start", self.start.to_string()));
        params.push(("max_results", self.max_results.to_string()));
        if let Some(sort_by) = self.sort_by.as_deref().filter(|s| !s.is_empty()) {
            params.push(("sortBy", sort_by.to_string()));
        }
        if let Some(order) = self.sort_order.as_deref().filter(|s| !s.is_empty()) {
            params.push(("sortOrder", order.to_string()));
        }
        let url = Url::parse_with_params(api_url, &params)
            .with_context(|| format!("invalid API url: {api_url}"))?;
        Ok(url.into())
    }
}
