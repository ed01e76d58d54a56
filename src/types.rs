//! Core domain types for fitdistill
//!
//! The session model is deliberately two-staged: extraction produces a
//! [`SessionDraft`] that keeps the parsed start/end timestamps alive for the
//! enrichment pass, and [`SessionDraft::finalize`] is the pure projection
//! that drops those internals and yields the sparse public
//! [`SessionRecord`]. Absent fields are omitted from the emitted JSON, not
//! serialized as null — except in [`FileIndexRecord`], which always carries
//! every field.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

/// One workout/activity occurrence as extracted from a session-like file,
/// still carrying the parsed timestamps needed by enrichment.
#[derive(Debug, Clone, Default)]
pub struct SessionDraft {
    /// Session date as an ISO `YYYY-MM-DD` string.
    pub date: Option<String>,
    /// Start timestamp, ISO formatted.
    pub start: Option<String>,
    /// End timestamp, ISO formatted.
    pub end: Option<String>,
    /// Duration in minutes, rounded to 3 decimals.
    pub duration_min: Option<f64>,
    /// Activity type or name (e.g. "Run").
    pub activity_type: Option<String>,
    pub calories: Option<f64>,
    pub distance: Option<f64>,
    pub steps: Option<f64>,
    pub avg_hr: Option<f64>,
    pub max_hr: Option<f64>,
    pub elevation_gain_m: Option<f64>,
    pub azm_minutes: Option<f64>,
    pub azm_fat_burn_minutes: Option<f64>,
    pub azm_cardio_minutes: Option<f64>,
    pub azm_peak_minutes: Option<f64>,
    /// Category derived from the file's position in the export tree.
    pub category: String,
    /// Source file path relative to the export root.
    pub source_path: String,
    /// Parsed start timestamp, internal to the enrichment pass.
    pub start_dt: Option<NaiveDateTime>,
    /// Parsed end timestamp, internal to the enrichment pass.
    pub end_dt: Option<NaiveDateTime>,
}

impl SessionDraft {
    /// Whether the presence condition for emitting a session holds: at
    /// least one of start, end, duration, or activity type was resolved.
    pub fn has_session_signal(&self) -> bool {
        self.start_dt.is_some()
            || self.end_dt.is_some()
            || self.duration_min.is_some()
            || self.activity_type.is_some()
    }

    /// Project into the public record, dropping the internal timestamps.
    pub fn finalize(self) -> SessionRecord {
        SessionRecord {
            date: self.date,
            start: self.start,
            end: self.end,
            duration_min: self.duration_min,
            activity_type: self.activity_type,
            calories: self.calories,
            distance: self.distance,
            steps: self.steps,
            avg_hr: self.avg_hr,
            max_hr: self.max_hr,
            elevation_gain_m: self.elevation_gain_m,
            azm_minutes: self.azm_minutes,
            azm_fat_burn_minutes: self.azm_fat_burn_minutes,
            azm_cardio_minutes: self.azm_cardio_minutes,
            azm_peak_minutes: self.azm_peak_minutes,
            category: self.category,
            source_path: self.source_path,
        }
    }
}

/// Public per-session record; absent fields are omitted from the JSON.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_min: Option<f64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_hr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_hr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation_gain_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azm_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azm_fat_burn_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azm_cardio_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azm_peak_minutes: Option<f64>,
    pub category: String,
    pub source_path: String,
}

/// Observed date range of a file, ISO-formatted min/max.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DateRange {
    pub min: Option<String>,
    pub max: Option<String>,
}

/// Audit entry describing one input file. Unlike the sparse session
/// records, every field is always serialized (nulls allowed) so downstream
/// consumers can rely on the shape.
#[derive(Debug, Clone, Serialize)]
pub struct FileIndexRecord {
    /// Path relative to the export root.
    pub path: String,
    pub category: String,
    /// Encoding actually used to decode the file.
    pub encoding: Option<String>,
    /// Header list as read.
    pub columns: Vec<String>,
    pub row_count: u64,
    /// Header inferred to carry the row date.
    pub date_column: Option<String>,
    pub date_range: DateRange,
    /// Metric key -> number of rows that contributed a value.
    pub metric_hits: BTreeMap<String, u64>,
    /// Non-fatal issues encountered while reading.
    pub errors: Vec<String>,
}

impl FileIndexRecord {
    /// Index entry for a file that contributed nothing (all encodings
    /// failed, or the extraction task itself failed).
    pub fn error_entry(path: String, category: String, errors: Vec<String>) -> Self {
        Self {
            path,
            category,
            encoding: None,
            columns: Vec::new(),
            row_count: 0,
            date_column: None,
            date_range: DateRange::default(),
            metric_hits: BTreeMap::new(),
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_sparse_serialization() {
        let draft = SessionDraft {
            date: Some("2023-01-01".to_string()),
            duration_min: Some(30.0),
            activity_type: Some("Run".to_string()),
            category: "Physical Activity".to_string(),
            source_path: "Physical Activity/run.csv".to_string(),
            ..Default::default()
        };
        assert!(draft.has_session_signal());
        let json = serde_json::to_value(draft.finalize()).unwrap();
        assert_eq!(json["type"], "Run");
        assert_eq!(json["duration_min"], 30.0);
        // Absent fields are omitted entirely, not null.
        assert!(json.get("calories").is_none());
        assert!(json.get("start").is_none());
        // Internal timestamps never appear.
        assert!(json.get("start_dt").is_none());
    }

    #[test]
    fn test_presence_condition() {
        let mut draft = SessionDraft {
            category: "Physical Activity".to_string(),
            source_path: "a.csv".to_string(),
            ..Default::default()
        };
        draft.steps = Some(4000.0);
        assert!(!draft.has_session_signal());
        draft.duration_min = Some(12.0);
        assert!(draft.has_session_signal());
    }

    #[test]
    fn test_index_record_always_full_shape() {
        let entry = FileIndexRecord::error_entry(
            "Sleep/bad.csv".to_string(),
            "Sleep".to_string(),
            vec!["utf-8: boom".to_string()],
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json["encoding"].is_null());
        assert!(json["date_column"].is_null());
        assert!(json["date_range"]["min"].is_null());
        assert_eq!(json["row_count"], 0);
        assert_eq!(json["errors"][0], "utf-8: boom");
    }
}
