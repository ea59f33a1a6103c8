//! npubvanity CLI
//!
//! Vanity `npub` generator for Nostr identities.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use npubvanity_core::{
    decode_npub, decode_nsec, default_worker_count, estimate, expected_attempts,
    format_difficulty, format_keys, hex, sanitize_pattern, Coordinator, KeyEncoder, MatchPolicy,
    MatchResult, NostrKeyEncoder, Pattern, SearchConfig, SearchError, SearchRequest, SessionEvent,
    SessionHandle, SessionState, StatsSnapshot, DEFAULT_BATCH_SIZE,
};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Interval between progress line refreshes
const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// Long enough that a benchmark never stops on a match
const BENCHMARK_PATTERN: &str = "qqqqqqqqqqqqqqqq";

#[derive(Parser)]
#[command(name = "npubvanity")]
#[command(version)]
#[command(about = "Vanity npub generator for Nostr keys", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for keys whose npub matches a pattern
    Search {
        /// Pattern to search for (bech32 characters only)
        #[arg(short, long)]
        pattern: String,

        /// Where the pattern must appear
        #[arg(short = 't', long, default_value = "prefix")]
        policy: PolicyArg,

        /// Number of matches to collect
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,

        /// Number of workers (default: CPU count, at most 8)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Attempts between progress reports
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: u64,

        /// Stop after this many seconds (0 = unlimited)
        #[arg(long, default_value = "0")]
        max_time: u64,

        /// Drop characters outside the bech32 alphabet instead of failing
        #[arg(long)]
        sanitize: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Estimate how long a search would take
    Estimate {
        #[arg(short, long)]
        pattern: String,

        #[arg(short = 't', long, default_value = "prefix")]
        policy: PolicyArg,

        #[arg(short = 'n', long, default_value = "1")]
        count: usize,

        #[arg(short, long)]
        workers: Option<usize>,

        #[arg(long)]
        sanitize: bool,
    },

    /// Measure key generation throughput
    Benchmark {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,

        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Decode an npub or nsec and print its hex forms
    Inspect {
        /// `npub1...` or `nsec1...` identifier
        key: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Prefix,
    Suffix,
    Contains,
}

impl From<PolicyArg> for MatchPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Prefix => MatchPolicy::Prefix,
            PolicyArg::Suffix => MatchPolicy::Suffix,
            PolicyArg::Contains => MatchPolicy::Contains,
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Search {
            pattern,
            policy,
            count,
            workers,
            batch_size,
            max_time,
            sanitize,
            json,
        } => {
            let request = SearchRequest::new(pattern_input(&pattern, sanitize), policy.into())
                .with_target(count)
                .with_workers(workers.unwrap_or_else(default_worker_count));
            let config = SearchConfig {
                batch_size,
                ..Default::default()
            };
            cmd_search(request, config, max_time, json)?;
        }
        Commands::Estimate {
            pattern,
            policy,
            count,
            workers,
            sanitize,
        } => {
            let pattern = pattern_input(&pattern, sanitize);
            cmd_estimate(
                &pattern,
                policy.into(),
                count,
                workers.unwrap_or_else(default_worker_count),
            )?;
        }
        Commands::Benchmark { duration, workers } => {
            cmd_benchmark(duration, workers.unwrap_or_else(default_worker_count))?;
        }
        Commands::Inspect { key } => {
            cmd_inspect(&key)?;
        }
    }

    Ok(())
}

fn pattern_input(raw: &str, sanitize: bool) -> String {
    if !sanitize {
        return raw.to_string();
    }
    let cleaned = sanitize_pattern(raw);
    if cleaned != raw.to_ascii_lowercase() {
        warn!(input = raw, pattern = %cleaned, "dropped characters outside the bech32 alphabet");
    }
    cleaned
}

fn start_error(error: SearchError) -> anyhow::Error {
    let context = if error.is_validation() {
        "Invalid search request"
    } else {
        "Failed to start search"
    };
    anyhow::Error::new(error).context(context)
}

/// Install a Ctrl-C handler that raises the returned flag
fn interrupt_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let raised = flag.clone();
    if let Err(e) = ctrlc::set_handler(move || raised.store(true, Ordering::SeqCst)) {
        warn!(error = %e, "failed to install Ctrl-C handler");
    }
    flag
}

#[derive(Serialize)]
struct SearchReport<'a> {
    state: SessionState,
    pattern: &'a str,
    policy: MatchPolicy,
    target_matches: usize,
    stats: StatsSnapshot,
    results: Vec<MatchResult>,
}

fn cmd_search(request: SearchRequest, config: SearchConfig, max_time: u64, json: bool) -> Result<()> {
    let mut coordinator = Coordinator::new(config);
    let handle = coordinator.start(request).map_err(start_error)?;
    let request = handle.request().clone();

    let expected = expected_attempts(request.pattern.len(), request.policy, 1);
    if !json {
        let est = estimate(
            request.pattern.len(),
            request.policy,
            request.target_matches,
            request.workers,
        );
        eprintln!("npubvanity v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("Pattern: {} ({})", request.pattern.to_ascii_lowercase(), request.policy);
        eprintln!("Workers: {}", request.workers);
        eprintln!("Difficulty: {} ({} attempts)", est, format_difficulty(est.expected_attempts));
        eprintln!();
    }

    let interrupted = interrupt_flag();
    let deadline = (max_time > 0).then(|| Instant::now() + Duration::from_secs(max_time));
    let final_state = drive(&handle, &interrupted, deadline, !json, expected);

    let results = handle.results();
    let stats = handle.stats();

    if json {
        let report = SearchReport {
            state: final_state,
            pattern: &request.pattern,
            policy: request.policy,
            target_matches: request.target_matches,
            stats,
            results,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        eprintln!();
        for result in &results {
            print_result(result);
        }
        print_summary(&stats, results.len(), request.target_matches);
    }

    match final_state {
        SessionState::Failed => {
            let error = handle
                .failure()
                .context("session failed without recording an error")?;
            Err(error.into())
        }
        SessionState::Cancelled => {
            info!(found = handle.results().len(), "search stopped before reaching the target");
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Pump session events until the session ends, stopping it on Ctrl-C or deadline
fn drive(
    handle: &SessionHandle,
    interrupted: &AtomicBool,
    deadline: Option<Instant>,
    show_progress: bool,
    expected: f64,
) -> SessionState {
    let target = handle.request().target_matches;
    let mut last_draw = Instant::now();

    while !handle.is_finished() {
        match handle.events().recv_timeout(PROGRESS_INTERVAL) {
            Ok(SessionEvent::Match(event)) if show_progress => {
                eprintln!(
                    "\rFound {}/{}: {}",
                    event.result.index + 1,
                    target,
                    event.result.npub
                );
            }
            Ok(SessionEvent::Failed(error)) if show_progress => {
                eprintln!("\rSearch failed: {}", error);
            }
            _ => {}
        }

        if interrupted.load(Ordering::SeqCst) {
            handle.stop();
        }
        if deadline.map_or(false, |d| Instant::now() >= d) {
            handle.stop();
        }

        if show_progress && last_draw.elapsed() >= PROGRESS_INTERVAL {
            eprint!("\r{}", handle.stats().format(expected));
            let _ = std::io::stderr().flush();
            last_draw = Instant::now();
        }
    }

    handle.wait()
}

fn cmd_estimate(pattern: &str, policy: MatchPolicy, count: usize, workers: usize) -> Result<()> {
    let pattern = Pattern::new(pattern, policy)?;
    let est = estimate(pattern.len(), policy, count.max(1), workers);

    println!("Pattern:     {}", pattern);
    println!("Workers:     {}", workers.max(1));
    println!("Tier:        {} ({}%)", est.tier, est.tier.percentage());
    println!("Attempts:    {}", format_difficulty(est.expected_attempts));
    println!("Estimated:   {}", est);

    Ok(())
}

fn cmd_benchmark(duration_secs: u64, workers: usize) -> Result<()> {
    eprintln!("Benchmarking for {} seconds...", duration_secs);
    eprintln!("Workers: {}", workers);
    eprintln!();

    let mut coordinator = Coordinator::new(SearchConfig::default());
    let request = SearchRequest::new(BENCHMARK_PATTERN, MatchPolicy::Prefix).with_workers(workers);
    let handle = coordinator.start(request).map_err(start_error)?;

    let interrupted = interrupt_flag();
    let deadline = Some(Instant::now() + Duration::from_secs(duration_secs));
    let expected = expected_attempts(BENCHMARK_PATTERN.len(), MatchPolicy::Prefix, 1);
    let state = drive(&handle, &interrupted, deadline, true, expected);

    if state == SessionState::Failed {
        if let Some(error) = handle.failure() {
            return Err(error.into());
        }
    }

    let stats = handle.stats();
    eprintln!("\n\nBenchmark complete!");
    println!("Keys Tested: {}", format_keys(stats.total_checked));
    println!("Time:        {:.2}s", stats.elapsed.as_secs_f64());
    println!("Speed:       {:.0} key/s", stats.keys_per_second);
    println!(
        "Per worker:  {:.0} key/s",
        stats.keys_per_second / workers.max(1) as f64
    );

    Ok(())
}

fn cmd_inspect(key: &str) -> Result<()> {
    let encoder = NostrKeyEncoder;

    if key.starts_with("nsec1") {
        let private_key = decode_nsec(key)?;
        let public_key = encoder.derive_public(&private_key)?;
        println!("npub:        {}", encoder.encode_public(&public_key)?);
        println!("Public Hex:  {}", hex::encode(&public_key));
        println!("Private Hex: {}", hex::encode(&private_key));
    } else if key.starts_with("npub1") {
        let public_key = decode_npub(key)?;
        println!("npub:        {}", encoder.encode_public(&public_key)?);
        println!("Public Hex:  {}", hex::encode(&public_key));
    } else {
        bail!("Expected an npub1... or nsec1... identifier");
    }

    Ok(())
}

fn print_result(result: &MatchResult) {
    println!();
    println!("MATCH FOUND (#{})", result.index + 1);
    println!("{:-<72}", "");
    println!("npub:        {}", result.npub);
    println!("nsec:        {}", result.nsec);
    println!("Public Hex:  {}", result.public_key_hex());
    println!("Private Hex: {}", result.private_key_hex());
    println!("{:-<72}", "");
    println!("Worker:      {}", result.worker_id);
    println!("Found After: {:.2}s", result.elapsed.as_secs_f64());
}

fn print_summary(stats: &StatsSnapshot, found: usize, target: usize) {
    println!();
    println!("Found:       {}/{}", found, target);
    println!("Keys Tested: {}", format_keys(stats.total_checked));
    println!("Time:        {:.2}s", stats.elapsed.as_secs_f64());
    println!("Speed:       {:.0} key/s", stats.keys_per_second);
}
