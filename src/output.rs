//! JSONL output writers
//!
//! All three streams are newline-delimited JSON, one compact object per
//! line, UTF-8. The daily stream is sorted ascending by date and the index
//! stream ascending by path before writing; sessions are written in buffer
//! order.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::Result;

/// Output file names inside the output directory.
pub const DAILY_FILE: &str = "daily.jsonl";
pub const SESSIONS_FILE: &str = "sessions.jsonl";
pub const INDEX_FILE: &str = "files_index.jsonl";
pub const SUMMARY_FILE: &str = "summary.txt";

/// Write one serializable value per line.
pub fn write_jsonl<T: Serialize>(path: &Path, values: &[T]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for value in values {
        serde_json::to_writer(&mut writer, value)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    info!(path = %path.display(), lines = values.len(), "wrote output stream");
    Ok(())
}

/// Write a short plain-text description of the produced streams.
pub fn write_summary(path: &Path, files_processed: usize) -> Result<()> {
    let text = format!(
        "fitdistill output\n\
         =================\n\
         \n\
         Processed {files_processed} CSV files.\n\
         \n\
         Files:\n\
         - {DAILY_FILE}: one JSON object per day with aggregated metrics.\n\
         - {SESSIONS_FILE}: one JSON object per detected workout/activity session.\n\
         - {INDEX_FILE}: one JSON object per input CSV with audit metadata.\n\
         \n\
         Values occurring multiple times per day are summed by default;\n\
         rate-like metrics (resting heart rate, HRV, SpO2, scores, skin\n\
         temperature variation) are averaged. Absent fields are omitted\n\
         from daily and session records.\n"
    );
    std::fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_write_jsonl() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.jsonl");
        let values = vec![json!({"date": "2023-01-01", "steps": 8000.0}), json!({"date": "2023-01-02"})];
        write_jsonl(&path, &values).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["steps"], 8000.0);
    }

    #[test]
    fn test_write_summary() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SUMMARY_FILE);
        write_summary(&path, 7).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Processed 7 CSV files."));
    }
}
