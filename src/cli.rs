//! CLI interface for fitdistill
//!
//! A single flat command: point `--input` at the export root, get three
//! JSONL streams in `--output`. Individual file failures never change the
//! exit status; the process exits 0 on completion.
//!
//! # Example
//!
//! ```bash
//! # Distill an export with 8 workers, no progress bar
//! fitdistill --input Fitbit --output distilled --workers 8 --no-progress
//! ```

use std::path::PathBuf;

use clap::Parser;

/// Distill heterogeneous fitness-tracker CSV exports into normalized JSONL
#[derive(Parser, Debug, Clone)]
#[command(name = "fitdistill")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the export root directory
    #[arg(long, default_value = "Fitbit")]
    pub input: PathBuf,

    /// Path to the output directory
    #[arg(long, default_value = "distilled")]
    pub output: PathBuf,

    /// Number of parallel workers (default: available parallelism)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Disable the console progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Only log warnings and errors
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

impl Cli {
    /// Resolved worker count, never zero.
    pub fn worker_count(&self) -> usize {
        self.workers
            .unwrap_or_else(|| {
                std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
            })
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["fitdistill"]);
        assert_eq!(cli.input, PathBuf::from("Fitbit"));
        assert_eq!(cli.output, PathBuf::from("distilled"));
        assert!(!cli.no_progress);
        assert!(cli.worker_count() >= 1);
    }

    #[test]
    fn test_explicit_workers() {
        let cli = Cli::parse_from(["fitdistill", "--workers", "3"]);
        assert_eq!(cli.worker_count(), 3);
        let cli = Cli::parse_from(["fitdistill", "--workers", "0"]);
        assert_eq!(cli.worker_count(), 1);
    }
}
