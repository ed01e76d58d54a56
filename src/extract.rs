//! Per-file extraction: the parallelizable unit of work
//!
//! [`process_file`] turns one CSV file into three local results: a daily
//! aggregate delta, a list of session drafts, and an index record. It is
//! pure given its inputs — no shared mutable state — so the orchestrator can
//! run one task per file on a rayon pool and merge the results afterwards
//! in any order.
//!
//! Best-first keyword matching drives every field: a keyword list is
//! resolved against the headers in header order, and the first header
//! containing any keyword with a non-empty cell supplies the value.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::aggregation::DailyAggregate;
use crate::csv_reader::read_csv_table;
use crate::heuristics::{categorize_path, infer_date_column, is_session_headers, match_metric_key};
use crate::parsers::{parse_date, parse_datetime, parse_duration_minutes, parse_number, round3};
use crate::types::{DateRange, FileIndexRecord, SessionDraft};

/// Everything one file contributes to the run.
#[derive(Debug)]
pub struct FileOutcome {
    /// Local daily aggregate, merged globally by the orchestrator.
    pub daily: DailyAggregate,
    /// Session drafts buffered for the enrichment pass.
    pub sessions: Vec<SessionDraft>,
    /// Audit entry for the index stream.
    pub index: FileIndexRecord,
}

/// Recursively collect `*.csv` files under the root (case-insensitive
/// extension), sorted for deterministic task ordering. A missing or empty
/// root yields an empty list, so the run degrades to empty output streams
/// instead of failing.
pub fn find_csv_files(root: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .map(|entry| entry.into_path())
        .collect();
    paths.sort();
    paths
}

/// First non-empty cell whose header contains any of the keywords,
/// scanning headers in order.
fn first_value<'a>(headers: &[String], row: &'a [String], keywords: &[&str]) -> Option<&'a str> {
    for (idx, header) in headers.iter().enumerate() {
        let h = header.to_lowercase();
        if keywords.iter().any(|k| h.contains(k)) {
            if let Some(v) = row.get(idx) {
                if !v.is_empty() {
                    return Some(v);
                }
            }
        }
    }
    None
}

/// Numeric variant of [`first_value`].
fn num_value(headers: &[String], row: &[String], keywords: &[&str]) -> Option<f64> {
    first_value(headers, row, keywords).and_then(parse_number)
}

/// Extract one file into local daily deltas, session drafts, and an index
/// record.
///
/// Data-level problems (undecodable bytes, unparseable cells, missing
/// columns) degrade to absent fields or index error strings; they never
/// fail the task. A panic out of this function is the "task failure" case
/// the orchestrator converts into an index error entry.
pub fn process_file(path: &Path, input_root: &Path) -> FileOutcome {
    let category = categorize_path(path, input_root);
    let rel_path = path
        .strip_prefix(input_root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned();

    let table = read_csv_table(path);
    let date_column = if table.headers.is_empty() {
        None
    } else {
        infer_date_column(&table.headers)
    };
    let date_col_idx = date_column
        .as_ref()
        .and_then(|name| table.headers.iter().position(|h| h == name));

    // Resolve each header's metric key once, up front.
    let header_keys: Vec<Option<&'static str>> = table
        .headers
        .iter()
        .map(|h| match_metric_key(h, &category))
        .collect();

    // Sedentary-period exports structurally resemble session logs but are
    // not workouts; the path override beats the header heuristic.
    let session_mode = is_session_headers(&table.headers, &category)
        && !rel_path.to_lowercase().contains("sedentary_period");

    let mut daily = DailyAggregate::new();
    let mut sessions = Vec::new();
    let mut row_count: u64 = 0;
    let mut min_date: Option<String> = None;
    let mut max_date: Option<String> = None;
    let mut metric_hits: BTreeMap<String, u64> = BTreeMap::new();

    for row in table.rows() {
        row_count += 1;

        // Row date: inferred column first, then the first parseable
        // date-like value in any column.
        let mut date_str: Option<String> = None;
        if let Some(idx) = date_col_idx {
            if let Some(d) = row.get(idx).and_then(|v| parse_date(v)) {
                date_str = Some(d.format("%Y-%m-%d").to_string());
            }
        }
        if date_str.is_none() {
            for v in &row {
                if let Some(d) = parse_date(v) {
                    date_str = Some(d.format("%Y-%m-%d").to_string());
                    break;
                }
            }
        }

        if session_mode {
            extract_session(
                &table.headers,
                &row,
                &category,
                &rel_path,
                &mut date_str,
                &mut daily,
                &mut sessions,
            );
        }

        if let Some(date) = &date_str {
            match &min_date {
                Some(min) if min <= date => {}
                _ => min_date = Some(date.clone()),
            }
            match &max_date {
                Some(max) if max >= date => {}
                _ => max_date = Some(date.clone()),
            }

            for (idx, key) in header_keys.iter().enumerate() {
                let Some(key) = *key else { continue };
                let Some(value) = row.get(idx).and_then(|v| parse_number(v)) else {
                    continue;
                };
                *metric_hits.entry(key.to_string()).or_insert(0) += 1;
                daily.add(date, key, value);
            }
        }
    }

    debug!(
        path = %rel_path,
        rows = row_count,
        sessions = sessions.len(),
        session_mode,
        "extracted file"
    );

    FileOutcome {
        daily,
        sessions,
        index: FileIndexRecord {
            path: rel_path,
            category,
            encoding: table.encoding.map(|e| e.to_string()),
            columns: table.headers.clone(),
            row_count,
            date_column,
            date_range: DateRange {
                min: min_date,
                max: max_date,
            },
            metric_hits,
            errors: table.errors,
        },
    }
}

/// Session-mode handling for one row: resolve timestamps, duration, type,
/// and the session metric fields; emit a draft when the presence condition
/// holds; contribute workout aggregates when a date and duration resolved.
fn extract_session(
    headers: &[String],
    row: &[String],
    category: &str,
    rel_path: &str,
    date_str: &mut Option<String>,
    daily: &mut DailyAggregate,
    sessions: &mut Vec<SessionDraft>,
) {
    // Start/end timestamps: combined datetime-like columns first, then
    // separate date+time pairs, then date-only columns.
    let start_cand = first_value(
        headers,
        row,
        &["start datetime", "start date time", "start date", "start time", "start"],
    );
    let end_cand = first_value(
        headers,
        row,
        &["end datetime", "end date time", "end date", "end time", "finish", "end"],
    );
    let sd = first_value(headers, row, &["start date", "date"])
        .or_else(|| first_value(headers, row, &["date start"]));
    let st = first_value(headers, row, &["start time", "time start", "time"]);
    let ed = first_value(headers, row, &["end date"])
        .or_else(|| first_value(headers, row, &["date end"]));
    let et = first_value(headers, row, &["end time", "time end"]);

    let mut start_dt = start_cand.and_then(parse_datetime);
    if start_dt.is_none() {
        if let (Some(sd), Some(st)) = (sd, st) {
            start_dt = parse_datetime(&format!("{sd} {st}"))
                .or_else(|| parse_datetime(sd))
                .or_else(|| parse_datetime(st));
        }
    }
    if start_dt.is_none() {
        if let Some(sd) = sd {
            start_dt = parse_datetime(sd);
        }
    }

    let mut end_dt = end_cand.and_then(parse_datetime);
    if end_dt.is_none() {
        if let (Some(ed), Some(et)) = (ed, et) {
            end_dt = parse_datetime(&format!("{ed} {et}"))
                .or_else(|| parse_datetime(ed))
                .or_else(|| parse_datetime(et));
        }
    }
    if end_dt.is_none() {
        if let Some(ed) = ed {
            end_dt = parse_datetime(ed);
        }
    }

    // Duration: explicit column, else computed from the timestamps and
    // clamped at zero.
    let dur_field = first_value(headers, row, &["duration", "length", "elapsed time"])
        .or_else(|| first_value(headers, row, &["minutes"]));
    let mut duration_min = dur_field.and_then(parse_duration_minutes);
    if duration_min.is_none() {
        if let (Some(start), Some(end)) = (start_dt, end_dt) {
            let minutes = (end - start).num_seconds() as f64 / 60.0;
            duration_min = Some(minutes.max(0.0));
        }
    }

    let activity_type = first_value(
        headers,
        row,
        &[
            "activity type",
            "activity name",
            "activity",
            "exercise",
            "exercise name",
            "workout",
            "sport",
            "type",
        ],
    )
    .map(|v| v.to_string());

    let calories = num_value(headers, row, &["calories", "calorie", "kcal", "energy"]);
    let distance = num_value(
        headers,
        row,
        &["distance", "km", "kilometer", "kilometre", "miles", "mi", "meters", "metres"],
    );
    let steps = num_value(headers, row, &["steps", "step count", "stepcount", "step"]);
    let avg_hr = num_value(
        headers,
        row,
        &["average heart", "avg heart", "avg hr", "average hr", "avg bpm", "average bpm", "mean hr"],
    );
    let max_hr = num_value(headers, row, &["max heart", "max hr", "peak heart", "max bpm"]);
    let elevation_gain_m = num_value(
        headers,
        row,
        &[
            "elevation gain",
            "elevation (m)",
            "elevation gain (m)",
            "elevation gain (ft)",
            "elev gain",
            "ascent",
            "climb",
        ],
    );
    let azm_minutes = num_value(headers, row, &["active zone minutes", "azm", "zone minutes"]);
    let azm_fat_burn_minutes = num_value(
        headers,
        row,
        &["fat burn minutes", "azm - fat burn", "active zone minutes - fat burn", "fat burn zone minutes", "fat burn"],
    );
    let azm_cardio_minutes = num_value(
        headers,
        row,
        &["cardio minutes", "azm - cardio", "active zone minutes - cardio", "cardio zone minutes", "cardio"],
    );
    let azm_peak_minutes = num_value(
        headers,
        row,
        &["peak minutes", "azm - peak", "active zone minutes - peak", "peak zone minutes", "peak"],
    );

    // A start timestamp can stand in for a missing date column.
    if date_str.is_none() {
        if let Some(start) = start_dt {
            *date_str = Some(start.date().format("%Y-%m-%d").to_string());
        }
    }

    let draft = SessionDraft {
        date: date_str.clone(),
        start: start_dt.map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
        end: end_dt.map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
        duration_min: duration_min.map(round3),
        activity_type,
        calories,
        distance,
        steps,
        avg_hr,
        max_hr,
        elevation_gain_m,
        azm_minutes,
        azm_fat_burn_minutes,
        azm_cardio_minutes,
        azm_peak_minutes,
        category: category.to_string(),
        source_path: rel_path.to_string(),
        start_dt,
        end_dt,
    };
    if draft.has_session_signal() {
        sessions.push(draft);
    }

    if let (Some(date), Some(minutes)) = (date_str.as_deref(), duration_min) {
        daily.add(date, "workout_minutes", minutes);
        daily.add(date, "workout_count", 1.0);
    }
}
