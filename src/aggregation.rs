//! Daily aggregation: accumulate, merge, finalize
//!
//! Each extracted row contributes its parsed values to a per-`(date, key)`
//! accumulator holding a running sum and occurrence count. Per-file
//! aggregates are immutable local results merged by the orchestrator with
//! pointwise addition of sums *and* counts, which keeps the merge
//! associative and commutative and makes averaged keys finalize to true
//! cross-file means. Finalization resolves each key against the declarative
//! policy table: averaged keys emit `sum / max(count, 1)`, everything else
//! emits the raw sum, both rounded to 3 decimals.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use crate::heuristics::is_averaged_key;
use crate::parsers::round3;

/// Running sum and occurrence count for one `(date, key)` cell.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accum {
    pub sum: f64,
    pub count: u64,
}

/// Per-day, per-key accumulator map. `BTreeMap` keeps dates (ISO strings,
/// so lexicographic order is chronological) and keys deterministically
/// ordered.
#[derive(Debug, Clone, Default)]
pub struct DailyAggregate {
    days: BTreeMap<String, BTreeMap<String, Accum>>,
}

impl DailyAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contribute one row's value: the sum accumulates and the count is
    /// incremented exactly once.
    pub fn add(&mut self, date: &str, key: &str, value: f64) {
        let cell = self
            .days
            .entry(date.to_string())
            .or_default()
            .entry(key.to_string())
            .or_default();
        cell.sum += value;
        cell.count += 1;
    }

    /// Merge another aggregate into this one by pointwise addition.
    /// Associative and commutative, so per-file results can be combined in
    /// any completion order.
    pub fn merge(&mut self, other: DailyAggregate) {
        for (date, metrics) in other.days {
            let day = self.days.entry(date).or_default();
            for (key, accum) in metrics {
                let cell = day.entry(key).or_default();
                cell.sum += accum.sum;
                cell.count += accum.count;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Look up one cell, mainly for tests and diagnostics.
    pub fn get(&self, date: &str, key: &str) -> Option<Accum> {
        self.days.get(date).and_then(|m| m.get(key)).copied()
    }

    /// Resolve every cell against the accumulation policy and emit one
    /// JSON object per day, ascending by date.
    pub fn finalize_daily(&self) -> Vec<Value> {
        self.days
            .iter()
            .map(|(date, metrics)| {
                let mut record = Map::new();
                record.insert("date".to_string(), json!(date));
                for (key, accum) in metrics {
                    let value = if is_averaged_key(key) {
                        accum.sum / (accum.count.max(1) as f64)
                    } else {
                        accum.sum
                    };
                    record.insert(key.clone(), json!(round3(value)));
                }
                Value::Object(record)
            })
            .collect()
    }
}
