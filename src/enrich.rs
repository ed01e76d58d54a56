//! Session enrichment from fine-grained time series
//!
//! Session files often omit statistics that finer-grained exports carry:
//! per-second heart rate, per-minute step/distance/elevation deltas. After
//! all files are processed, each buffered session with a valid
//! `[start, end]` window is checked against time series bucketed by
//! calendar date (both the start and end date, so a session crossing
//! midnight sees both buckets), and missing fields are back-filled from the
//! points inside the window. Enrichment only fills gaps; a value extracted
//! directly from the session file is never overwritten.
//!
//! Collecting the series is the orchestrator's concern; [`TimeSeriesStore`]
//! is the boundary the collaborator fills in.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use tracing::debug;

use crate::parsers::{round3, round6};
use crate::types::{SessionDraft, SessionRecord};

/// One heart-rate reading.
#[derive(Debug, Clone, Copy)]
pub struct HeartRatePoint {
    pub ts: NaiveDateTime,
    pub bpm: f64,
}

/// One pace reading: step, distance, and elevation deltas. Distances and
/// elevation are in millimetres, the unit the source series use.
#[derive(Debug, Clone, Copy)]
pub struct PacePoint {
    pub ts: NaiveDateTime,
    pub steps: Option<f64>,
    pub distance_mm: Option<f64>,
    pub altitude_gain_mm: Option<f64>,
}

/// Time-series points bucketed by ISO calendar date, sorted ascending by
/// timestamp within each bucket to support interval scans.
#[derive(Debug, Default)]
pub struct TimeSeriesStore {
    heart_rate: BTreeMap<String, Vec<HeartRatePoint>>,
    pace: BTreeMap<String, Vec<PacePoint>>,
}

impl TimeSeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_heart_rate(&mut self, point: HeartRatePoint) {
        self.heart_rate
            .entry(point.ts.date().format("%Y-%m-%d").to_string())
            .or_default()
            .push(point);
    }

    pub fn add_pace(&mut self, point: PacePoint) {
        self.pace
            .entry(point.ts.date().format("%Y-%m-%d").to_string())
            .or_default()
            .push(point);
    }

    /// Sort every bucket ascending by timestamp. Call once after
    /// collection, before enrichment.
    pub fn sort(&mut self) {
        for points in self.heart_rate.values_mut() {
            points.sort_by_key(|p| p.ts);
        }
        for points in self.pace.values_mut() {
            points.sort_by_key(|p| p.ts);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.heart_rate.is_empty() && self.pace.is_empty()
    }

    fn heart_rate_in_window(&self, dates: &[String], start: NaiveDateTime, end: NaiveDateTime) -> Vec<f64> {
        let mut values = Vec::new();
        for date in dates {
            for p in self.heart_rate.get(date).map(Vec::as_slice).unwrap_or(&[]) {
                if p.ts >= start && p.ts <= end {
                    values.push(p.bpm);
                }
            }
        }
        values
    }

    fn pace_in_window(
        &self,
        dates: &[String],
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Option<(f64, f64, f64)> {
        let mut steps = 0.0;
        let mut distance_mm = 0.0;
        let mut altitude_mm = 0.0;
        let mut any = false;
        for date in dates {
            for p in self.pace.get(date).map(Vec::as_slice).unwrap_or(&[]) {
                if p.ts >= start && p.ts <= end {
                    any = true;
                    if let Some(v) = p.steps {
                        steps += v;
                    }
                    if let Some(v) = p.distance_mm {
                        distance_mm += v;
                    }
                    if let Some(v) = p.altitude_gain_mm {
                        altitude_mm += v;
                    }
                }
            }
        }
        any.then_some((steps, distance_mm, altitude_mm))
    }
}

/// Back-fill missing session statistics from the time-series store, then
/// project every draft into its public record.
///
/// Only drafts with both timestamps and `end >= start` are considered for
/// enrichment; everything else passes through the projection untouched.
pub fn enrich_sessions(store: &TimeSeriesStore, drafts: Vec<SessionDraft>) -> Vec<SessionRecord> {
    drafts
        .into_iter()
        .map(|mut draft| {
            if let (Some(start), Some(end)) = (draft.start_dt, draft.end_dt) {
                if end >= start {
                    enrich_one(store, &mut draft, start, end);
                }
            }
            draft.finalize()
        })
        .collect()
}

fn enrich_one(store: &TimeSeriesStore, draft: &mut SessionDraft, start: NaiveDateTime, end: NaiveDateTime) {
    // Both endpoint dates, deduplicated, to handle sessions crossing
    // midnight.
    let mut dates = vec![start.date().format("%Y-%m-%d").to_string()];
    let end_date = end.date().format("%Y-%m-%d").to_string();
    if end_date != dates[0] {
        dates.push(end_date);
    }

    let hr = store.heart_rate_in_window(&dates, start, end);
    if !hr.is_empty() {
        if draft.avg_hr.is_none() {
            draft.avg_hr = Some(round3(hr.iter().sum::<f64>() / hr.len() as f64));
        }
        if draft.max_hr.is_none() {
            draft.max_hr = Some(hr.iter().copied().fold(f64::NEG_INFINITY, f64::max));
        }
        debug!(session = ?draft.start, points = hr.len(), "heart-rate enrichment");
    }

    if let Some((steps, distance_mm, altitude_mm)) = store.pace_in_window(&dates, start, end) {
        if draft.steps.is_none() && steps > 0.0 {
            draft.steps = Some(round3(steps));
        }
        if draft.distance.is_none() && distance_mm > 0.0 {
            draft.distance = Some(round6(distance_mm / 1_000_000.0));
        }
        if draft.elevation_gain_m.is_none() && altitude_mm > 0.0 {
            draft.elevation_gain_m = Some(round3(altitude_mm / 1000.0));
        }
    }
}
