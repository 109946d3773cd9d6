//! papertrend-rank: topic tagging and scoring
//!
//! Everything here is a pure function of the corpus plus a reference date,
//! except the small `write_*` helpers that persist derived artifacts.

pub mod feeds;
pub mod metrics;
pub mod momentum;
pub mod tagger;
pub mod topic;
pub mod trending;

pub use feeds::{
    Application, ApplicationFeed, DEFAULT_FEED_LIMIT, TopicFeed, build_application_feed,
    build_topic_feed, write_application_feeds, write_topic_feeds,
};
pub use metrics::{
    CrosslistHeatmap, TopicTimeseries, TrendRadar, VersionChurn, compute_crosslist_heatmap,
    compute_topic_timeseries, compute_trend_radar, compute_version_churn, write_metric,
};
pub use momentum::{TopicMomentum, compute_topic_momentum};
pub use tagger::{RULES_VERSION, tag_papers};
pub use topic::{Topic, anchor_ids, load_topics, topics_path};
pub use trending::{RankingConfig, Weights, compute_trending, load_ranking_config, ranking_config_path};
