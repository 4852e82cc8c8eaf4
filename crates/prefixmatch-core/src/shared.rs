//! Matcher variant for concurrent readers
//!
//! Counters are atomic so any number of threads can check against a
//! [`Snapshot`] at once. Adding a pattern never touches a published snapshot:
//! [`SharedMatcher::add`] builds a new one and swaps it in, and readers
//! compare versions to notice they are holding an old one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use prefixmatch_pattern::{copy_pattern, Matcher, MatcherError, MatcherStats, PatternStats};

#[derive(Debug)]
struct SharedEntry {
    pattern: String,
    hits: AtomicU64,
}

impl SharedEntry {
    fn matches(&self, input: &[u8]) -> bool {
        input.starts_with(self.pattern.as_bytes())
    }
}

/// Immutable pattern list with thread-safe counters
#[derive(Debug)]
pub struct Snapshot {
    version: u64,
    entries: Vec<SharedEntry>,
    misses: AtomicU64,
}

impl Snapshot {
    /// Index of the first pattern that prefixes `input`, counting the result
    pub fn find(&self, input: &[u8]) -> Option<usize> {
        match self.entries.iter().position(|e| e.matches(input)) {
            Some(index) => {
                self.entries[index].hits.fetch_add(1, Ordering::Relaxed);
                Some(index)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn check(&self, input: &[u8]) -> bool {
        self.find(input).is_some()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pattern(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|e| e.pattern.as_str())
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|e| e.pattern.as_str())
    }

    pub fn hits(&self, index: usize) -> Option<u64> {
        self.entries
            .get(index)
            .map(|e| e.hits.load(Ordering::Relaxed))
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> MatcherStats {
        MatcherStats {
            version: self.version,
            patterns: self
                .entries
                .iter()
                .map(|e| PatternStats {
                    pattern: e.pattern.clone(),
                    hits: e.hits.load(Ordering::Relaxed),
                })
                .collect(),
            misses: self.misses(),
        }
    }
}

/// Copy-on-write owner of the current [`Snapshot`]
#[derive(Debug)]
pub struct SharedMatcher {
    current: Arc<Snapshot>,
}

impl SharedMatcher {
    /// Create from an optional `|`-separated pattern list
    pub fn new(list: Option<&str>) -> Self {
        Self::from_matcher(&Matcher::new(list))
    }

    /// Take over the patterns and version of `matcher`, with zero counters
    pub fn from_matcher(matcher: &Matcher) -> Self {
        let entries = matcher
            .patterns()
            .map(|pattern| SharedEntry {
                pattern: pattern.to_owned(),
                hits: AtomicU64::new(0),
            })
            .collect();

        Self {
            current: Arc::new(Snapshot {
                version: matcher.version(),
                entries,
                misses: AtomicU64::new(0),
            }),
        }
    }

    /// Publish a new snapshot with `pattern` appended.
    ///
    /// Counter values are carried over from the current snapshot. Hits
    /// recorded later on an old snapshot stay with that snapshot. On
    /// allocation failure the current snapshot stays published.
    pub fn add(&mut self, pattern: &str) -> Result<bool, MatcherError> {
        if pattern.is_empty() {
            return Ok(false);
        }

        let old = &self.current;
        let requested = old.entries.len() + 1;
        let mut entries = Vec::new();
        entries
            .try_reserve_exact(requested)
            .map_err(|_| MatcherError::OutOfMemory { requested })?;

        for entry in &old.entries {
            entries.push(SharedEntry {
                pattern: copy_pattern(&entry.pattern)?,
                hits: AtomicU64::new(entry.hits.load(Ordering::Relaxed)),
            });
        }
        entries.push(SharedEntry {
            pattern: copy_pattern(pattern)?,
            hits: AtomicU64::new(0),
        });

        let version = old.version + 1;
        self.current = Arc::new(Snapshot {
            version,
            entries,
            misses: AtomicU64::new(old.misses()),
        });

        debug!(pattern, version, "Published snapshot");
        Ok(true)
    }

    /// Handle to the current snapshot for a reader
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current)
    }

    /// Whether `snapshot` predates the current pattern list
    pub fn is_stale(&self, snapshot: &Snapshot) -> bool {
        snapshot.version != self.current.version
    }

    pub fn check(&self, input: &[u8]) -> bool {
        self.current.check(input)
    }

    pub fn find(&self, input: &[u8]) -> Option<usize> {
        self.current.find(input)
    }

    pub fn version(&self) -> u64 {
        self.current.version
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn stats(&self) -> MatcherStats {
        self.current.stats()
    }
}

impl Default for SharedMatcher {
    fn default() -> Self {
        Self::new(None)
    }
}
