//! Prefix matcher implementation

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, warn};

use crate::parse::{join_patterns, segments};
use crate::stats::{MatcherStats, PatternStats};

/// Extra slots added on every growth (also the first reservation)
const GROWTH_SLOP: usize = 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatcherError {
    #[error("Matcher is already initialized")]
    AlreadyInitialized,
    #[error("Matcher is not initialized")]
    NotInitialized,
    #[error("Out of memory (requested {requested} slots)")]
    OutOfMemory { requested: usize },
}

/// A stored prefix with its cached length and hit counter
#[derive(Debug)]
pub struct Entry {
    pattern: String,
    length: usize,
    hits: u64,
}

impl Entry {
    /// The prefix itself
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Byte length of the prefix
    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of checks attributed to this prefix
    pub fn hits(&self) -> u64 {
        self.hits
    }

    fn matches(&self, input: &[u8]) -> bool {
        self.length <= input.len() && &input[..self.length] == self.pattern.as_bytes()
    }
}

/// First-match-wins prefix matcher.
///
/// Patterns are scanned in insertion order; the first one that is a prefix of
/// the input gets the hit. Counters are updated on every check, so checking
/// needs `&mut self`.
#[derive(Debug)]
pub struct Matcher {
    version: u64,
    entries: Vec<Entry>,
    misses: u64,
}

impl Matcher {
    /// Create a matcher from an optional `|`-separated pattern list.
    ///
    /// Empty segments are skipped. A segment that cannot be stored is
    /// dropped and the matcher keeps whatever it had before.
    pub fn new(list: Option<&str>) -> Self {
        let mut matcher = Self {
            version: now_millis(),
            entries: Vec::new(),
            misses: 0,
        };

        if let Some(list) = list.filter(|s| !s.is_empty()) {
            for segment in segments(list) {
                if let Err(e) = matcher.add(segment) {
                    warn!(pattern = segment, "Discarding pattern: {}", e);
                }
            }
        }

        matcher
    }

    /// Append a pattern.
    ///
    /// Returns `Ok(false)` for an empty pattern (nothing is stored). On
    /// allocation failure the matcher is left untouched.
    pub fn add(&mut self, pattern: &str) -> Result<bool, MatcherError> {
        if pattern.is_empty() {
            return Ok(false);
        }

        self.reserve_one()?;
        let owned = copy_pattern(pattern)?;

        self.entries.push(Entry {
            length: owned.len(),
            pattern: owned,
            hits: 0,
        });
        self.version += 1;

        debug!(pattern, version = self.version, "Added pattern");
        Ok(true)
    }

    /// Grow by `capacity * 2 + 4` when full.
    fn reserve_one(&mut self) -> Result<(), MatcherError> {
        let len = self.entries.len();
        let capacity = self.entries.capacity();
        if len < capacity {
            return Ok(());
        }

        let target = capacity
            .checked_mul(2)
            .and_then(|c| c.checked_add(GROWTH_SLOP))
            .ok_or(MatcherError::OutOfMemory { requested: usize::MAX })?;

        self.entries
            .try_reserve_exact(target - len)
            .map_err(|_| MatcherError::OutOfMemory { requested: target })
    }

    /// Check whether any pattern is a prefix of `input`
    pub fn check(&mut self, input: &[u8]) -> bool {
        self.find(input).is_some()
    }

    /// Check against the first `len` bytes of `input` only
    pub fn check_len(&mut self, input: &[u8], len: usize) -> bool {
        let end = len.min(input.len());
        self.check(&input[..end])
    }

    /// Like [`check`](Self::check), but returns the index of the winning pattern
    pub fn find(&mut self, input: &[u8]) -> Option<usize> {
        match self.entries.iter_mut().enumerate().find(|(_, e)| e.matches(input)) {
            Some((index, entry)) => {
                entry.hits += 1;
                Some(index)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Deep copy with the same version and patterns but fresh counters.
    ///
    /// The copy's storage is sized exactly to its pattern count.
    pub fn try_clone(&self) -> Result<Self, MatcherError> {
        let mut entries = Vec::new();
        entries
            .try_reserve_exact(self.entries.len())
            .map_err(|_| MatcherError::OutOfMemory {
                requested: self.entries.len(),
            })?;

        for entry in &self.entries {
            entries.push(Entry {
                pattern: copy_pattern(&entry.pattern)?,
                length: entry.length,
                hits: 0,
            });
        }

        debug!(patterns = entries.len(), version = self.version, "Cloned matcher");
        Ok(Self {
            version: self.version,
            entries,
            misses: 0,
        })
    }

    /// Zero every hit counter and the miss counter
    pub fn reset_stats(&mut self) {
        for entry in &mut self.entries {
            entry.hits = 0;
        }
        self.misses = 0;
    }

    /// Changes whenever a pattern is added
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Hit counter of the pattern at `index`
    pub fn hits(&self, index: usize) -> Option<u64> {
        self.entries.get(index).map(Entry::hits)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reserved slots in the backing storage
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    /// Patterns in match-priority order
    pub fn patterns(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(Entry::pattern)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> MatcherStats {
        MatcherStats {
            version: self.version,
            patterns: self
                .entries
                .iter()
                .map(|e| PatternStats {
                    pattern: e.pattern.clone(),
                    hits: e.hits,
                })
                .collect(),
            misses: self.misses,
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(None)
    }
}

impl FromStr for Matcher {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(Some(s)))
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_patterns(self.patterns()))
    }
}

/// Owned copy of `pattern`, reporting allocation failure instead of aborting
pub fn copy_pattern(pattern: &str) -> Result<String, MatcherError> {
    let mut owned = String::new();
    owned
        .try_reserve_exact(pattern.len())
        .map_err(|_| MatcherError::OutOfMemory {
            requested: pattern.len(),
        })?;
    owned.push_str(pattern);
    Ok(owned)
}

/// Milliseconds since the Unix epoch (0 if the clock is before it)
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
