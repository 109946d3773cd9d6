//! Rate-limited HTTP fetching.
//!
//! Every request goes through one [`Throttle`]: a FIFO-fair async mutex that
//! remembers when the previous request started. Holding the lock is queue
//! admission, so concurrent callers share a single rate limit and at most one
//! request (together with its retries) is in flight.
//!
//! The client is async internally but offers [`RateLimitedClient::fetch_blocking`]
//! for the sync pipeline code, bridged through [`SHARED_RUNTIME`].

use std::sync::LazyLock;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

use crate::error::FetchError;
use crate::retry::backoff_delay;

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Fetch tuning: spacing, timeout and retry policy.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Minimum time between the starts of two consecutive requests
    pub min_interval: Duration,
    /// Per-attempt timeout; the attempt is cancelled when exceeded
    pub timeout: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Base delay for exponential backoff
    pub retry_delay: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(3200),
            timeout: Duration::from_secs(15),
            max_retries: 2,
            retry_delay: Duration::from_millis(1200),
            user_agent: concat!("papertrend/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Serialization point enforcing the minimum inter-request interval.
pub struct Throttle {
    min_interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

/// Exclusive right to dispatch; the next caller is admitted once this drops.
pub struct ThrottlePermit<'a> {
    _slot: MutexGuard<'a, Option<Instant>>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_start: Mutex::new(None),
        }
    }

    /// Wait for queue admission, then until `min_interval` has passed since
    /// the previous request started. Records the new start time.
    pub async fn admit(&self) -> ThrottlePermit<'_> {
        let mut slot = self.last_start.lock().await;
        if let Some(prev) = *slot {
            tokio::time::sleep_until(prev + self.min_interval).await;
        }
        *slot = Some(Instant::now());
        ThrottlePermit { _slot: slot }
    }
}

/// HTTP client for one external endpoint with rate limiting, timeout and retry.
///
/// Build once per process and pass by reference to every caller.
pub struct RateLimitedClient {
    http: reqwest::Client,
    throttle: Throttle,
    config: FetchConfig,
}

impl RateLimitedClient {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::from_reqwest(&e))?;
        Ok(Self::with_http(config, http))
    }

    /// Use a pre-built reqwest client (custom proxy/TLS settings).
    pub fn with_http(config: FetchConfig, http: reqwest::Client) -> Self {
        Self {
            throttle: Throttle::new(config.min_interval),
            http,
            config,
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// GET `url` and return the response body.
    ///
    /// Waits for queue admission and the rate limit first. Transient
    /// failures are retried with exponential backoff while the queue is held;
    /// the last error is returned once retries are exhausted.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let _permit = self.throttle.admit().await;
        let max_retries = self.config.max_retries;
        let mut attempt = 0u32;
        loop {
            match self.attempt(url).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < max_retries && e.is_retryable() => {
                    let delay = backoff_delay(self.config.retry_delay, attempt);
                    attempt += 1;
                    log::warn!("fetch failed ({e}), retry {attempt}/{max_retries} in {delay:?}");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    log::debug!("fetch failed permanently after {} attempt(s): {e}", attempt + 1);
                    return Err(e);
                }
            }
        }
    }

    /// Sync wrapper around [`fetch`](Self::fetch). Must not be called from
    /// inside an async context.
    pub fn fetch_blocking(&self, url: &str) -> Result<String, FetchError> {
        SHARED_RUNTIME.handle().block_on(self.fetch(url))
    }

    async fn attempt(&self, url: &str) -> Result<String, FetchError> {
        let request = async {
            let response = self
                .http
                .get(url)
                .send()
                .await
                .map_err(|e| FetchError::from_reqwest(&e))?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::from_status(status));
            }
            response
                .text()
                .await
                .map_err(|e| FetchError::from_reqwest(&e))
        };

        match tokio::time::timeout(self.config.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.config.timeout)),
        }
    }
}
