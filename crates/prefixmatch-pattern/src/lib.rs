//! Prefixmatch Pattern Engine
//!
//! First-match-wins prefix lookup over a `|`-separated pattern list, with
//! per-pattern hit and global miss counters.

mod format;
mod matcher;
mod parse;
mod slot;
mod stats;

pub use format::{format_count, format_duration, format_rate};
pub use matcher::{copy_pattern, Entry, Matcher, MatcherError};
pub use parse::{join_patterns, segments, DELIMITER};
pub use slot::MatcherSlot;
pub use stats::{MatcherStats, PatternStats};
