//! arXiv endpoint configuration

pub const DEFAULT_API_URL: &str = "http://export.arxiv.org/api/query";
pub const DEFAULT_OAI_URL: &str = "https://export.arxiv.org/oai2";

/// Endpoints for the export API and the OAI-PMH interface
#[derive(Debug, Clone, PartialEq)]
pub struct ArxivConfig {
    pub api_url: String,
    pub oai_url: String,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            oai_url: DEFAULT_OAI_URL.to_string(),
        }
    }
}
