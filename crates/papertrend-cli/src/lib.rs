//! papertrend-cli: configuration and the pipeline behind `papertrend run`

pub mod config;
pub mod pipeline;
