//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use papertrend_arxiv::ArxivConfig;
use papertrend_arxiv::config::{DEFAULT_API_URL, DEFAULT_OAI_URL};
use papertrend_core::FetchConfig;

/// Global configuration for papertrend
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub arxiv: ArxivSection,
    pub http: HttpConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub data_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArxivSection {
    pub api_url: String,
    pub oai_url: String,
}

impl Default for ArxivSection {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            oai_url: DEFAULT_OAI_URL.to_string(),
        }
    }
}

impl ArxivSection {
    pub fn endpoints(&self) -> ArxivConfig {
        ArxivConfig {
            api_url: self.api_url.clone(),
            oai_url: self.oai_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Minimum spacing between request starts
    pub min_interval_ms: u64,
    /// Per-attempt timeout
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Base delay for exponential backoff
    pub retry_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 3200,
            timeout_secs: 15,
            max_retries: 2,
            retry_delay_ms: 1200,
        }
    }
}

impl HttpConfig {
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            min_interval: Duration::from_millis(self.min_interval_ms),
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            ..FetchConfig::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub max_per_topic: usize,
    pub window_days: u32,
    pub feed_limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_per_topic: 200,
            window_days: 30,
            feed_limit: papertrend_rank::DEFAULT_FEED_LIMIT,
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./papertrend.toml (current directory)
    /// 2. ~/.config/papertrend/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("papertrend.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "papertrend") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.output.data_dir, PathBuf::from("./data"));
        assert_eq!(config.arxiv.api_url, DEFAULT_API_URL);
        assert_eq!(config.http.min_interval_ms, 3200);
        assert_eq!(config.pipeline.max_per_topic, 200);
        assert_eq!(config.pipeline.window_days, 30);
        assert_eq!(config.pipeline.feed_limit, 12);
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[output]
data_dir = "/tmp/data"

[http]
min_interval_ms = 500
max_retries = 5

[pipeline]
max_per_topic = 50
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.output.data_dir, PathBuf::from("/tmp/data"));
        assert_eq!(config.http.min_interval_ms, 500);
        assert_eq!(config.http.max_retries, 5);
        // Unset keys keep their defaults
        assert_eq!(config.http.timeout_secs, 15);
        assert_eq!(config.pipeline.max_per_topic, 50);
        assert_eq!(config.pipeline.window_days, 30);
        assert_eq!(config.arxiv.oai_url, DEFAULT_OAI_URL);
    }

    #[test]
    fn http_section_to_fetch_config() {
        let http = HttpConfig {
            min_interval_ms: 100,
            timeout_secs: 3,
            max_retries: 1,
            retry_delay_ms: 50,
        };
        let fetch = http.fetch_config();
        assert_eq!(fetch.min_interval, Duration::from_millis(100));
        assert_eq!(fetch.timeout, Duration::from_secs(3));
        assert_eq!(fetch.max_retries, 1);
        assert_eq!(fetch.retry_delay, Duration::from_millis(50));
        assert!(fetch.user_agent.starts_with("papertrend/"));
    }

    #[test]
    fn invalid_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("papertrend.toml");
        std::fs::write(&path, "[http]\nmax_retries = \"many\"\n").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(format!("{err}").contains("papertrend.toml"));
    }
}
