//! Papertrend Core - shared infrastructure for the harvest pipeline
//!
//! Rate-limited HTTP fetching, retry policy, logging, progress display
//! and shutdown handling used by the harvest and orchestration crates.

pub mod error;
pub mod fetch;
pub mod logging;
pub mod progress;
pub mod retry;
pub mod shutdown;

// Re-exports for convenience
pub use error::FetchError;
pub use fetch::{FetchConfig, RateLimitedClient, SHARED_RUNTIME, Throttle};
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use shutdown::{install_signal_handlers, is_shutdown_requested, request_shutdown};
