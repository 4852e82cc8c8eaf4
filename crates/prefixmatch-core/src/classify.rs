//! Batch classification of inputs against a shared matcher

use rayon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::info;

use prefixmatch_pattern::MatcherStats;

use crate::shared::SharedMatcher;
use crate::stats::ThroughputStats;

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("Failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Classification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyConfig {
    /// Number of threads (0 = auto)
    pub threads: usize,
    /// Smallest batch worth spreading over the pool
    pub parallel_threshold: usize,
}

impl ClassifyConfig {
    /// Resolved thread count
    pub fn num_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            threads: 0, // Auto-detect
            parallel_threshold: 1024,
        }
    }
}

/// Outcome for one input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Raw input bytes, rendered lossily as text in JSON
    #[serde(serialize_with = "bytes_as_text", deserialize_with = "text_as_bytes")]
    pub input: Vec<u8>,
    /// Winning prefix, `None` on a miss
    pub pattern: Option<String>,
}

impl Classification {
    /// Input for display, invalid UTF-8 replaced
    pub fn input_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.input)
    }
}

fn bytes_as_text<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(bytes))
}

fn text_as_bytes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    String::deserialize(deserializer).map(String::into_bytes)
}

/// Results in input order plus the counters they produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyReport {
    pub results: Vec<Classification>,
    /// Counters of the snapshot used, including earlier checks against it
    pub stats: MatcherStats,
    pub time_secs: f64,
    pub checks_per_second: f64,
}

/// Reusable classifier; the thread pool is built once and shared by every batch
#[derive(Debug)]
pub struct Classifier {
    config: ClassifyConfig,
    pool: Option<rayon::ThreadPool>,
}

impl Classifier {
    /// Build the pool up front when more than one thread is configured
    pub fn new(config: ClassifyConfig) -> Result<Self, ClassifyError> {
        let num_threads = config.num_threads();
        let pool = if num_threads > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build()?;
            info!(threads = num_threads, "Thread pool ready");
            Some(pool)
        } else {
            None
        };

        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &ClassifyConfig {
        &self.config
    }

    /// Threads available to a parallel batch
    pub fn num_threads(&self) -> usize {
        self.pool
            .as_ref()
            .map_or(1, rayon::ThreadPool::current_num_threads)
    }

    /// Classify every input against the matcher's current snapshot.
    ///
    /// Batches of at least `parallel_threshold` inputs run on the pool; order
    /// is preserved either way.
    pub fn classify<S>(&self, matcher: &SharedMatcher, inputs: &[S]) -> ClassifyReport
    where
        S: AsRef<[u8]> + Sync,
    {
        let snapshot = matcher.snapshot();
        let throughput = ThroughputStats::new();

        let classify_one = |input: &S| {
            let input = input.as_ref();
            let pattern = snapshot
                .find(input)
                .and_then(|index| snapshot.pattern(index))
                .map(str::to_owned);
            throughput.add_checks(1);
            Classification {
                input: input.to_vec(),
                pattern,
            }
        };

        let results: Vec<Classification> = match &self.pool {
            Some(pool) if inputs.len() >= self.config.parallel_threshold => {
                pool.install(|| inputs.par_iter().map(&classify_one).collect())
            }
            _ => inputs.iter().map(&classify_one).collect(),
        };

        throughput.stop();
        ClassifyReport {
            results,
            stats: snapshot.stats(),
            time_secs: throughput.elapsed().as_secs_f64(),
            checks_per_second: throughput.checks_per_second(),
        }
    }
}

/// One-off classification; builds a [`Classifier`] for a single batch
pub fn classify<S>(
    matcher: &SharedMatcher,
    inputs: &[S],
    config: &ClassifyConfig,
) -> Result<ClassifyReport, ClassifyError>
where
    S: AsRef<[u8]> + Sync,
{
    Ok(Classifier::new(config.clone())?.classify(matcher, inputs))
}
