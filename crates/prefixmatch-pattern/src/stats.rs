//! Counter snapshots

use serde::{Deserialize, Serialize};

use crate::format::format_count;

/// Hits recorded against one pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternStats {
    pub pattern: String,
    pub hits: u64,
}

/// Point-in-time copy of a matcher's counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherStats {
    /// Matcher version the counters belong to
    pub version: u64,
    /// Per-pattern hits in match-priority order
    pub patterns: Vec<PatternStats>,
    /// Checks that matched nothing
    pub misses: u64,
}

impl MatcherStats {
    pub fn total_hits(&self) -> u64 {
        self.patterns.iter().map(|p| p.hits).sum()
    }

    /// Every check lands in exactly one counter
    pub fn total_checks(&self) -> u64 {
        self.total_hits() + self.misses
    }

    /// Fraction of checks that matched, 0.0 when nothing was checked
    pub fn hit_ratio(&self) -> f64 {
        let total = self.total_checks();
        if total > 0 {
            self.total_hits() as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Get formatted stats string
    pub fn summary(&self) -> String {
        format!(
            "[Patterns {}][Checks {}][Hits {} ({:.1}%)][Misses {}][Version {}]",
            self.patterns.len(),
            format_count(self.total_checks()),
            format_count(self.total_hits()),
            self.hit_ratio() * 100.0,
            format_count(self.misses),
            self.version
        )
    }
}
