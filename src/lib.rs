//! fitdistill - Distill heterogeneous fitness-tracker CSV exports into
//! normalized JSONL streams
//!
//! This library provides functionality to:
//! - Ingest CSV files of unknown encoding, delimiter, and header vocabulary
//! - Classify columns to normalized metric keys via fragment matching
//! - Detect and normalize workout sessions across inconsistent
//!   start/end/duration representations
//! - Aggregate per-day metrics under a declarative sum/average policy
//! - Back-fill missing session statistics from fine-grained time series
//!
//! Extraction is best-effort by design: a bad file, row, or cell degrades
//! to an absent field or an index error entry, never a fatal error.
//!
//! # Examples
//!
//! ```no_run
//! use std::path::Path;
//! use fitdistill::{aggregation::DailyAggregate, enrich, extract};
//!
//! let root = Path::new("Fitbit");
//! let outcome = extract::process_file(Path::new("Fitbit/Activity/steps.csv"), root);
//!
//! let mut daily = DailyAggregate::new();
//! daily.merge(outcome.daily);
//!
//! let store = enrich::TimeSeriesStore::new();
//! let sessions = enrich::enrich_sessions(&store, outcome.sessions);
//! let days = daily.finalize_daily();
//! ```

pub mod aggregation;
pub mod cli;
pub mod csv_reader;
pub mod enrich;
pub mod error;
pub mod extract;
pub mod heuristics;
pub mod output;
pub mod parsers;
pub mod types;

// Re-export commonly used types
pub use error::{DistillError, Result};
pub use types::{FileIndexRecord, SessionDraft, SessionRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
