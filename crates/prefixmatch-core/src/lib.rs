//! Prefixmatch Core Engine
//!
//! Thread-safe matcher snapshots and multi-threaded batch classification.

mod classify;
mod shared;
mod stats;

pub use classify::{
    classify, Classification, Classifier, ClassifyConfig, ClassifyError, ClassifyReport,
};
pub use shared::{SharedMatcher, Snapshot};
pub use stats::ThroughputStats;

// Re-exports for convenience
pub use prefixmatch_pattern::{
    format_count, format_duration, format_rate, Matcher, MatcherError, MatcherSlot, MatcherStats,
    PatternStats,
};
