//! Command-line interface.

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use rangefold::{
    BackoffPolicy, Config, DEFAULT_MAX_N, DEFAULT_WORKERS, FaultPolicy, JitterPolicy, NoFaults,
    RandomFaults, RetryPolicy,
};

/// Exact factorials computed by supervised, concurrent range products.
#[derive(Parser, Debug)]
#[command(name = "rangefold")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "RANGEFOLD_LOG_JSON", global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute n! across concurrent executors
    Run(RunArgs),

    /// Print the work units for n as JSON, one per line
    Partition {
        /// Upper bound of the product
        n: u64,

        /// Number of units to split into
        #[arg(short, long, env = "RANGEFOLD_WORKERS", default_value_t = DEFAULT_WORKERS)]
        workers: u32,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Upper bound of the product
    pub n: u64,

    /// Number of units to split into
    #[arg(short, long, env = "RANGEFOLD_WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub workers: u32,

    /// Largest accepted n (0 = unlimited)
    #[arg(long, env = "RANGEFOLD_MAX_N", default_value_t = DEFAULT_MAX_N)]
    pub max_n: u64,

    /// Executors allowed to run at once (0 = unlimited)
    #[arg(long, env = "RANGEFOLD_MAX_CONCURRENT", default_value_t = 0)]
    pub max_concurrent: usize,

    /// Per-attempt timeout in milliseconds (0 = none)
    #[arg(long, env = "RANGEFOLD_TIMEOUT_MS", default_value_t = 0)]
    pub timeout_ms: u64,

    /// Attempts per unit; 1 fails the run on the first error
    #[arg(long, env = "RANGEFOLD_ATTEMPTS", default_value_t = 1)]
    pub attempts: u32,

    /// Delay before the first retry in milliseconds
    #[arg(long, env = "RANGEFOLD_BACKOFF_MS", default_value_t = 100)]
    pub backoff_ms: u64,

    /// Injected failure probability per attempt, 0.0 to 1.0
    #[arg(long, env = "RANGEFOLD_FAILURE_RATE", default_value_t = 0.0)]
    pub failure_rate: f64,

    /// Lower bound of injected latency in milliseconds
    #[arg(long, env = "RANGEFOLD_LATENCY_MIN_MS", default_value_t = 0)]
    pub latency_min_ms: u64,

    /// Upper bound of injected latency in milliseconds
    #[arg(long, env = "RANGEFOLD_LATENCY_MAX_MS", default_value_t = 0)]
    pub latency_max_ms: u64,

    /// Simulate the classic demo: 5% failures and 1-3 s latency per unit
    #[arg(long, conflicts_with_all = ["failure_rate", "latency_min_ms", "latency_max_ms"])]
    pub legacy: bool,

    /// Seed for fault injection
    #[arg(long, env = "RANGEFOLD_SEED")]
    pub seed: Option<u64>,

    /// Print the outcome as a JSON object
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Coordinator settings for this invocation.
    pub fn config(&self) -> Config {
        let retry = if self.attempts > 1 {
            RetryPolicy::OnFailure {
                max_attempts: self.attempts,
            }
        } else {
            RetryPolicy::Never
        };
        Config {
            worker_count: self.workers,
            max_n: self.max_n,
            max_concurrent: self.max_concurrent,
            unit_timeout: Duration::from_millis(self.timeout_ms),
            retry,
            backoff: BackoffPolicy {
                first: Duration::from_millis(self.backoff_ms),
                jitter: JitterPolicy::Equal,
                ..BackoffPolicy::default()
            },
            ..Config::default()
        }
    }

    /// Fault injection for this invocation.
    pub fn faults(&self) -> Arc<dyn FaultPolicy> {
        let (rate, min, max) = if self.legacy {
            (0.05, 1000, 3000)
        } else {
            (self.failure_rate, self.latency_min_ms, self.latency_max_ms)
        };
        if rate <= 0.0 && max == 0 {
            return Arc::new(NoFaults);
        }
        let (min, max) = (Duration::from_millis(min), Duration::from_millis(max));
        match self.seed {
            Some(seed) => Arc::new(RandomFaults::seeded(rate, min, max, seed)),
            None => Arc::new(RandomFaults::new(rate, min, max)),
        }
    }
}
