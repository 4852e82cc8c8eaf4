//! Prefixmatch CLI
//!
//! Classify keys or commands by the first matching prefix.

use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use prefixmatch_core::{
    format_count, format_rate, Classification, Classifier, ClassifyConfig, SharedMatcher,
    ThroughputStats,
};
use serde::Serialize;
use tracing::{info, warn};

/// Inputs per classify call while benchmarking
const BENCH_BATCH: usize = 10_000;

#[derive(Parser)]
#[command(name = "prefixmatch")]
#[command(author = "Prefixmatch Team")]
#[command(version = "0.1.0")]
#[command(about = "First-match-wins prefix classifier", long_about = None)]
struct Cli {
    /// Prefixes separated by '|'
    #[arg(short, long, global = true, env = "PREFIXMATCH_PATTERNS", default_value = "")]
    patterns: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify inputs (arguments, or stdin lines when none are given)
    Check {
        /// Inputs to classify
        inputs: Vec<String>,

        /// Output the full report as JSON
        #[arg(long)]
        json: bool,

        /// Print hit/miss summary to stderr
        #[arg(long)]
        stats: bool,

        /// Number of threads (0 = auto)
        #[arg(long, default_value = "0")]
        threads: usize,

        /// Smallest batch classified in parallel
        #[arg(long, default_value = "1024")]
        parallel_threshold: usize,
    },

    /// List parsed patterns in match order
    Patterns,

    /// Measure check throughput
    Bench {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,

        /// Number of threads (0 = auto)
        #[arg(long, default_value = "0")]
        threads: usize,

        /// Input to check (repeatable; defaults to every pattern plus a miss)
        #[arg(long = "input")]
        inputs: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Serialize)]
struct BenchResult {
    patterns: usize,
    checks: u64,
    time_secs: f64,
    checks_per_second: f64,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let matcher = SharedMatcher::new(Some(&cli.patterns));
    if matcher.is_empty() {
        warn!("No patterns configured, every input will miss");
    }

    match cli.command {
        Commands::Check {
            inputs,
            json,
            stats,
            threads,
            parallel_threshold,
        } => {
            let config = ClassifyConfig {
                threads,
                parallel_threshold,
            };
            cmd_check(&matcher, inputs, config, json, stats)?;
        }
        Commands::Patterns => {
            cmd_patterns(&matcher);
        }
        Commands::Bench {
            duration,
            threads,
            inputs,
            json,
        } => {
            cmd_bench(&matcher, duration, threads, inputs, json)?;
        }
    }

    Ok(())
}

fn cmd_check(
    matcher: &SharedMatcher,
    inputs: Vec<String>,
    config: ClassifyConfig,
    json_output: bool,
    print_stats: bool,
) -> Result<()> {
    let inputs: Vec<Vec<u8>> = if inputs.is_empty() {
        read_lines(io::stdin().lock()).context("Failed to read inputs from stdin")?
    } else {
        inputs.into_iter().map(String::into_bytes).collect()
    };

    let classifier = Classifier::new(config)?;
    let report = classifier.classify(matcher, &inputs);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        for result in &report.results {
            write_classification(&mut out, result)?;
        }
        out.flush()?;
    }

    if print_stats {
        eprintln!("{}", report.stats.summary());
    }

    Ok(())
}

fn cmd_patterns(matcher: &SharedMatcher) {
    let snapshot = matcher.snapshot();

    println!("Patterns (version {}):", snapshot.version());
    println!("{:-<40}", "");
    println!("{:<6} {:<8} {}", "Index", "Length", "Prefix");
    println!("{:-<40}", "");

    for (index, pattern) in snapshot.patterns().enumerate() {
        println!("{:<6} {:<8} {}", index, pattern.len(), pattern);
    }
}

fn cmd_bench(
    matcher: &SharedMatcher,
    duration_secs: u64,
    threads: usize,
    inputs: Vec<String>,
    json_output: bool,
) -> Result<()> {
    let inputs: Vec<Vec<u8>> = if inputs.is_empty() {
        default_bench_inputs(matcher)
    } else {
        inputs.into_iter().map(String::into_bytes).collect()
    };
    let batch = bench_batch(&inputs, BENCH_BATCH);

    // Pool is built once and reused by every batch
    let classifier = Classifier::new(ClassifyConfig {
        threads,
        parallel_threshold: 0,
    })?;
    info!(
        patterns = matcher.len(),
        threads = classifier.num_threads(),
        cpus = num_cpus::get(),
        "Benchmarking for {}s",
        duration_secs
    );

    let stats = ThroughputStats::new();

    // Spawn stats printer thread
    let printer_handle = if json_output {
        None
    } else {
        let stats_for_printer = stats.clone();
        Some(thread::spawn(move || {
            while stats_for_printer.is_running() {
                eprint!("\r{}", stats_for_printer.format());
                thread::sleep(Duration::from_millis(250));
            }
            eprintln!(); // New line after stats
        }))
    };

    run_bench(
        matcher,
        &classifier,
        &batch,
        Duration::from_secs(duration_secs),
        &stats,
    );

    stats.stop();
    if let Some(handle) = printer_handle {
        let _ = handle.join();
    }

    let result = BenchResult {
        patterns: matcher.len(),
        checks: stats.total_checks(),
        time_secs: stats.elapsed().as_secs_f64(),
        checks_per_second: stats.checks_per_second(),
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Checks:  {}", format_count(result.checks));
        println!("Time:    {:.2}s", result.time_secs);
        println!("Speed:   {}", format_rate(result.checks_per_second));
    }

    Ok(())
}

/// Classify `batch` repeatedly until `limit` has passed or `stats` is stopped
fn run_bench(
    matcher: &SharedMatcher,
    classifier: &Classifier,
    batch: &[&[u8]],
    limit: Duration,
    stats: &ThroughputStats,
) {
    if batch.is_empty() {
        return;
    }
    while stats.is_running() && stats.elapsed() < limit {
        let report = classifier.classify(matcher, batch);
        stats.add_checks(report.results.len() as u64);
    }
}

/// Repeat `inputs` up to `size` entries (never fewer than the inputs themselves)
fn bench_batch(inputs: &[Vec<u8>], size: usize) -> Vec<&[u8]> {
    inputs
        .iter()
        .map(Vec::as_slice)
        .cycle()
        .take(size.max(inputs.len()))
        .collect()
}

/// Every pattern plus the empty input, which never matches
fn default_bench_inputs(matcher: &SharedMatcher) -> Vec<Vec<u8>> {
    let snapshot = matcher.snapshot();
    let mut inputs: Vec<Vec<u8>> = snapshot.patterns().map(|p| p.as_bytes().to_vec()).collect();
    inputs.push(Vec::new());
    inputs
}

/// Split on `\n`, dropping a trailing `\r`; bytes are kept as-is
fn read_lines(reader: impl BufRead) -> io::Result<Vec<Vec<u8>>> {
    reader
        .split(b'\n')
        .map(|line| {
            line.map(|mut line| {
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                line
            })
        })
        .collect()
}

fn write_classification(out: &mut impl Write, result: &Classification) -> io::Result<()> {
    match &result.pattern {
        Some(pattern) => write!(out, "match\t{}\t", pattern)?,
        None => out.write_all(b"miss\t-\t")?,
    }
    out.write_all(&result.input)?;
    out.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(result: &Classification) -> Vec<u8> {
        let mut out = Vec::new();
        write_classification(&mut out, result).unwrap();
        out
    }

    #[test]
    fn test_parse_check_args() {
        let cli = Cli::try_parse_from(["prefixmatch", "-p", "a|b", "check", "ax", "--json"]).unwrap();
        assert_eq!(cli.patterns, "a|b");
        match cli.command {
            Commands::Check { inputs, json, .. } => {
                assert_eq!(inputs, vec!["ax"]);
                assert!(json);
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn test_write_classification() {
        let hit = Classification {
            input: b"GET /".to_vec(),
            pattern: Some("GET".into()),
        };
        let miss = Classification {
            input: b"PUT /".to_vec(),
            pattern: None,
        };
        assert_eq!(written(&hit), b"match\tGET\tGET /\n");
        assert_eq!(written(&miss), b"miss\t-\tPUT /\n");
    }

    #[test]
    fn test_read_lines() {
        let lines = read_lines("one\r\ntwo\n".as_bytes()).unwrap();
        assert_eq!(lines, vec![b"one".to_vec(), b"two".to_vec()]);
    }

    #[test]
    fn test_invalid_utf8_lines_classified() {
        let lines = read_lines(&b"GET /ok\n\xff\xfebinary-key\nSET x\n"[..]).unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], b"\xff\xfebinary-key");

        let matcher = SharedMatcher::new(Some("GET|SET"));
        let classifier = Classifier::new(ClassifyConfig::default()).unwrap();
        let report = classifier.classify(&matcher, &lines);

        assert_eq!(report.results[0].pattern.as_deref(), Some("GET"));
        assert_eq!(report.results[1].pattern, None);
        assert_eq!(report.results[2].pattern.as_deref(), Some("SET"));
        assert_eq!(written(&report.results[1]), b"miss\t-\t\xff\xfebinary-key\n");
    }

    #[test]
    fn test_default_bench_inputs() {
        let matcher = SharedMatcher::new(Some("k|v"));
        assert_eq!(
            default_bench_inputs(&matcher),
            vec![b"k".to_vec(), b"v".to_vec(), Vec::new()]
        );
    }

    #[test]
    fn test_bench_batch() {
        let inputs = vec![b"a".to_vec(), b"b".to_vec()];
        let batch = bench_batch(&inputs, 5);
        let expected: [&[u8]; 5] = [b"a", b"b", b"a", b"b", b"a"];
        assert_eq!(batch, expected);
        assert_eq!(bench_batch(&inputs, 0).len(), 2);
        assert!(bench_batch(&[], 10).is_empty());
    }

    #[test]
    fn test_run_bench_zero_duration() {
        let matcher = SharedMatcher::new(Some("k"));
        let classifier = Classifier::new(ClassifyConfig::default()).unwrap();
        let stats = ThroughputStats::new();
        let batch: [&[u8]; 1] = [b"k1"];
        run_bench(&matcher, &classifier, &batch, Duration::ZERO, &stats);
        assert_eq!(stats.total_checks(), 0);
        assert_eq!(matcher.stats().total_checks(), 0);
    }

    #[test]
    fn test_run_bench_counts_whole_batches() {
        let matcher = SharedMatcher::new(Some("k"));
        let classifier = Classifier::new(ClassifyConfig {
            threads: 2,
            parallel_threshold: 0,
        })
        .unwrap();
        let inputs = vec![b"k1".to_vec(), Vec::new()];
        let batch = bench_batch(&inputs, 100);
        let stats = ThroughputStats::new();

        run_bench(&matcher, &classifier, &batch, Duration::from_millis(30), &stats);

        let checks = stats.total_checks();
        assert!(checks >= 100);
        assert_eq!(checks % 100, 0);
        let counted = matcher.stats();
        assert_eq!(counted.total_checks(), checks);
        assert_eq!(counted.misses, checks / 2);
    }

    #[test]
    fn test_run_bench_stops_when_stopped() {
        let matcher = SharedMatcher::new(Some("k"));
        let classifier = Classifier::new(ClassifyConfig::default()).unwrap();
        let stats = ThroughputStats::new();
        stats.stop();
        let batch: [&[u8]; 1] = [b"k"];
        run_bench(&matcher, &classifier, &batch, Duration::from_secs(60), &stats);
        assert_eq!(stats.total_checks(), 0);
    }
}
