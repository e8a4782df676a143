//! `rangefold` command-line entry point.

mod cli;
mod logging;
mod shutdown;

use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use rangefold::{
    Coordinator, LogWriter, ProductExecutor, RunOutcome, Subscribe, partition,
};
use serde_json::json;
use tracing::{info, warn};

use crate::cli::{Cli, Commands, RunArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet, cli.log_json)?;

    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Partition { n, workers } => print_partition(n, workers),
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let executor = Arc::new(ProductExecutor::with_faults(args.faults()));
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let coordinator = Coordinator::builder(args.config())
        .with_executor(executor)
        .with_subscribers(subs)
        .build();

    let handle = coordinator
        .start(args.n)
        .with_context(|| format!("cannot start run for n={}", args.n))?;
    let run = handle.run_id();

    let outcome = tokio::select! {
        outcome = handle.wait() => outcome,
        res = shutdown::wait_for_interrupt() => {
            res.context("failed to listen for interrupt")?;
            warn!(run = %run, "interrupted, resetting run");
            coordinator.reset();
            RunOutcome::Cancelled
        }
    };
    let snapshot = coordinator.snapshot();
    coordinator.shutdown().await;

    if args.json {
        let body = match &outcome {
            RunOutcome::Completed(value) => json!({
                "run": run,
                "status": "completed",
                "value": value.to_string(),
            }),
            RunOutcome::Failed(failure) => json!({
                "run": run,
                "status": "failed",
                "kind": failure.kind,
                "unit": failure.unit,
                "reason": failure.message,
            }),
            RunOutcome::Cancelled => json!({ "run": run, "status": "cancelled" }),
        };
        println!("{body}");
    } else if let RunOutcome::Completed(value) = &outcome {
        println!("{value}");
    }

    match outcome {
        RunOutcome::Completed(_) => {
            info!(run = %run, elapsed = ?snapshot.elapsed(), "done");
            Ok(())
        }
        RunOutcome::Failed(failure) => bail!("run {run} failed: {}", failure.message),
        RunOutcome::Cancelled => bail!("run {run} was cancelled"),
    }
}

fn print_partition(n: u64, workers: u32) -> anyhow::Result<()> {
    for line in partition_lines(n, workers)? {
        println!("{line}");
    }
    Ok(())
}

/// One `WorkUnit` JSON object per unit; no run is started, so no run id is attached.
fn partition_lines(n: u64, workers: u32) -> anyhow::Result<Vec<String>> {
    partition(n, workers)?
        .iter()
        .map(|unit| serde_json::to_string(unit).map_err(anyhow::Error::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_lines_are_bare_units() {
        let lines = partition_lines(10, 4).unwrap();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], r#"{"id":1,"start":1,"end":2}"#);
        assert_eq!(lines[3], r#"{"id":4,"start":7,"end":10}"#);
        assert!(lines.iter().all(|l| !l.contains("run")));
    }

    #[test]
    fn partition_lines_reject_zero() {
        assert!(partition_lines(0, 4).is_err());
    }
}
