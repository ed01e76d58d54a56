//! fitdistill - Distill fitness-tracker CSV exports into JSONL streams
//!
//! Orchestration only: discover CSV files, fan per-file extraction out over
//! a rayon pool, merge the immutable local results, run the single-threaded
//! tail (index sort, session enrichment, daily finalization), and write the
//! three output streams. Per-file failures become index error entries and
//! never change the exit status.

use std::panic::{AssertUnwindSafe, catch_unwind};

use clap::Parser;
use fitdistill::{
    aggregation::DailyAggregate,
    cli::Cli,
    enrich::{TimeSeriesStore, enrich_sessions},
    error::{DistillError, Result},
    extract::{FileOutcome, find_csv_files, process_file},
    heuristics::categorize_path,
    output::{DAILY_FILE, INDEX_FILE, SESSIONS_FILE, SUMMARY_FILE, write_jsonl, write_summary},
    types::FileIndexRecord,
};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging. The --quiet flag should override RUST_LOG.
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("warn")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("fitdistill=info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // A missing root is an empty run, not a failure: the output streams are
    // written empty and the exit status stays 0.
    if !cli.input.is_dir() {
        warn!(root = %cli.input.display(), "input root not found; output will be empty");
    }
    std::fs::create_dir_all(&cli.output)?;

    let csv_paths = find_csv_files(&cli.input);
    info!(files = csv_paths.len(), root = %cli.input.display(), "discovered CSV files");

    let show_progress =
        !cli.no_progress && is_terminal::is_terminal(std::io::stderr());
    let progress = if show_progress {
        let pb = ProgressBar::new(csv_paths.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} files")
                .expect("progress template is valid")
                .progress_chars("#>-"),
        );
        pb.set_message("Processing CSVs");
        Some(pb)
    } else {
        None
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cli.worker_count())
        .build()
        .map_err(|e| DistillError::InvalidArgument(e.to_string()))?;

    // One task per file, no shared mutable state; results are merged after
    // the parallel section, so the fold stays associative.
    let outcomes: Vec<FileOutcome> = pool.install(|| {
        csv_paths
            .par_iter()
            .map(|path| {
                let outcome = catch_unwind(AssertUnwindSafe(|| process_file(path, &cli.input)))
                    .unwrap_or_else(|payload| failed_task_outcome(path, &cli.input, payload));
                if let Some(pb) = &progress {
                    pb.inc(1);
                }
                outcome
            })
            .collect()
    });
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    let mut daily = DailyAggregate::new();
    let mut session_buffer = Vec::new();
    let mut index_records = Vec::new();
    for outcome in outcomes {
        daily.merge(outcome.daily);
        session_buffer.extend(outcome.sessions);
        index_records.push(outcome.index);
    }

    // Deterministic index output.
    index_records.sort_by(|a, b| a.path.cmp(&b.path));
    write_jsonl(&cli.output.join(INDEX_FILE), &index_records)?;

    // Time-series collection is an external collaborator; an empty store
    // leaves every session exactly as extracted.
    let mut series = TimeSeriesStore::new();
    series.sort();
    let sessions = enrich_sessions(&series, session_buffer);
    write_jsonl(&cli.output.join(SESSIONS_FILE), &sessions)?;

    let days = daily.finalize_daily();
    write_jsonl(&cli.output.join(DAILY_FILE), &days)?;

    write_summary(&cli.output.join(SUMMARY_FILE), csv_paths.len())?;

    println!(
        "Processed {} CSV files.\nWrote: {}\n       {}\n       {}",
        csv_paths.len(),
        cli.output.join(DAILY_FILE).display(),
        cli.output.join(SESSIONS_FILE).display(),
        cli.output.join(INDEX_FILE).display(),
    );
    Ok(())
}

/// Convert a panicked extraction task into an index error entry so one bad
/// file never aborts the run.
fn failed_task_outcome(
    path: &std::path::Path,
    input_root: &std::path::Path,
    payload: Box<dyn std::any::Any + Send>,
) -> FileOutcome {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "extraction task panicked".to_string());
    let rel_path = path
        .strip_prefix(input_root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned();
    warn!(path = %rel_path, error = %message, "extraction task failed");
    FileOutcome {
        daily: DailyAggregate::new(),
        sessions: Vec::new(),
        index: FileIndexRecord::error_entry(
            rel_path,
            categorize_path(path, input_root),
            vec![message],
        ),
    }
}
