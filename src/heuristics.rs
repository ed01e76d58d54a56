//! Classification heuristics for unknown export schemas
//!
//! Nothing in a tracker export announces what a file contains. These
//! heuristics guess: which column carries the date, what category a file
//! belongs to (from its position in the export tree), which normalized
//! metric a header maps to, and whether a file's shape looks like a log of
//! workout sessions.
//!
//! The metric table is an *ordered* slice, not a map: matching is
//! substring-based and the first key whose fragment matches wins, so
//! iteration order is part of the contract.

use std::path::Path;

/// Candidate date/time column headers, in priority order. Exact
/// (case-insensitive) matches are preferred over fuzzy ones.
pub const DATE_COLUMN_CANDIDATES: &[&str] = &[
    "date",
    "date time",
    "date_time",
    "day",
    "start time",
    "start_time",
    "startdate",
    "start date",
    "log date",
    "log_date",
    "datetime",
    "time",
];

/// Fuzzy fragments tried when no exact date-column candidate matches.
const DATE_FUZZY_FRAGMENTS: &[&str] = &["date", "start", "time", "logged"];

/// Normalized metric keys and the lowercase header fragments that map to
/// them. Order matters: the first key with a matching fragment wins.
pub const METRIC_TABLE: &[(&str, &[&str])] = &[
    ("steps", &["steps", "step count"]),
    // Unit unknown; keep the raw numeric.
    ("distance", &["distance"]),
    ("calories", &["calories", "calorie"]),
    ("floors", &["floors"]),
    (
        "resting_heart_rate",
        &["resting heart rate", "restingheartrate", "resting_hr", "rhr"],
    ),
    ("hrv_ms", &["rmssd", "hrv", "heart rate variability"]),
    ("spo2_percent", &["spo2", "oxygen saturation", "o2 saturation"]),
    (
        "sleep_duration_min",
        &["minutes asleep", "sleep duration", "time asleep", "sleep minutes"],
    ),
    ("sleep_score", &["sleep score"]),
    ("readiness_score", &["readiness", "daily readiness"]),
    ("stress_score", &["stress score"]),
    (
        "skin_temp_variation",
        &["temperature variation", "temp variation", "temperature deviation"],
    ),
    ("azm_minutes", &["active zone minutes", "azm"]),
    (
        "azm_fat_burn_minutes",
        &[
            "fat burn minutes",
            "azm - fat burn",
            "active zone minutes - fat burn",
            "fat burn zone minutes",
            "fat burn",
        ],
    ),
    (
        "azm_cardio_minutes",
        &[
            "cardio minutes",
            "azm - cardio",
            "active zone minutes - cardio",
            "cardio zone minutes",
            "cardio",
        ],
    ),
    (
        "azm_peak_minutes",
        &[
            "peak minutes",
            "azm - peak",
            "active zone minutes - peak",
            "peak zone minutes",
            "peak",
        ],
    ),
    ("mindfulness_minutes", &["mindfulness minutes", "meditation minutes"]),
    ("lightly_active_minutes", &["lightly active minutes"]),
    ("fairly_active_minutes", &["fairly active minutes"]),
    ("very_active_minutes", &["very active minutes"]),
    ("sedentary_minutes", &["sedentary minutes"]),
];

/// Exact-match header aliases for the resting heart rate key, honored after
/// the fragment table.
const RESTING_HR_ALIASES: &[&str] =
    &["resting heart rate", "restingheartrate", "resting_hr", "rhr"];

/// Metric keys averaged across multiple entries per day.
pub const AVERAGED_KEYS: &[&str] = &[
    "resting_heart_rate",
    "hrv_ms",
    "spo2_percent",
    "sleep_score",
    "readiness_score",
    "stress_score",
    "skin_temp_variation",
];

/// Metric keys summed across multiple entries per day. Keys in neither set
/// default to summed.
pub const SUMMED_KEYS: &[&str] = &[
    "steps",
    "distance",
    "calories",
    "floors",
    "azm_minutes",
    "azm_fat_burn_minutes",
    "azm_cardio_minutes",
    "azm_peak_minutes",
    "mindfulness_minutes",
    "sleep_duration_min",
    "lightly_active_minutes",
    "fairly_active_minutes",
    "very_active_minutes",
    "sedentary_minutes",
    "workout_minutes",
    "workout_count",
];

/// Whether a metric key finalizes as a mean rather than a raw sum.
pub fn is_averaged_key(key: &str) -> bool {
    AVERAGED_KEYS.contains(&key)
}

/// Pick the header most likely to carry the row date.
///
/// Exact candidates win in priority-list order; otherwise the first header
/// (in header order) containing any fuzzy fragment is chosen.
pub fn infer_date_column(headers: &[String]) -> Option<String> {
    let lower: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    for cand in DATE_COLUMN_CANDIDATES {
        if let Some(idx) = lower.iter().position(|h| h == cand) {
            return Some(headers[idx].clone());
        }
    }
    for (idx, h) in lower.iter().enumerate() {
        if DATE_FUZZY_FRAGMENTS.iter().any(|frag| h.contains(frag)) {
            return Some(headers[idx].clone());
        }
    }
    None
}

/// Derive a category label from a file's position in the export tree.
///
/// Uses the path segment immediately following the export root's directory
/// name; if the root name never appears in the path, falls back to the
/// file's parent directory name, or `"root"` when even that is empty.
pub fn categorize_path(path: &Path, input_root: &Path) -> String {
    if let Some(root_name) = input_root.file_name().and_then(|n| n.to_str()) {
        let parts: Vec<&str> = path
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect();
        if let Some(idx) = parts.iter().position(|p| *p == root_name) {
            if idx + 1 < parts.len() {
                return parts[idx + 1].to_string();
            }
        }
    }
    path.parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(|n| n.to_string())
        .unwrap_or_else(|| "root".to_string())
}

/// Map a header to a normalized metric key, if any fragment matches.
///
/// Keys whose name starts with `sleep` are only honored when the literal
/// substring `sleep` appears in the header or the category; this keeps
/// generic "minutes" columns in non-sleep files from registering as sleep
/// metrics.
pub fn match_metric_key(header: &str, category: &str) -> Option<&'static str> {
    let h = header.trim().to_lowercase();
    let cat = category.to_lowercase();
    for (key, fragments) in METRIC_TABLE {
        for frag in *fragments {
            if h.contains(frag) {
                if key.starts_with("sleep") && !h.contains("sleep") && !cat.contains("sleep") {
                    continue;
                }
                return Some(key);
            }
        }
    }
    if RESTING_HR_ALIASES.contains(&h.as_str()) {
        return Some("resting_heart_rate");
    }
    None
}

/// Judge whether a file's headers look like a log of workout sessions.
///
/// Requires a start-like column AND (an end-like or duration-like column)
/// AND (an activity-type-like column OR a mindfulness category). Sleep and
/// goal categories never count as sessions. Callers additionally disable
/// session mode for `sedentary_period` files regardless of header shape.
pub fn is_session_headers(headers: &[String], category: &str) -> bool {
    let lower: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
    let cat = category.to_lowercase();
    if cat.contains("sleep") || cat.contains("goal") {
        return false;
    }
    let has_start = lower.iter().any(|h| h.contains("start"));
    let has_end = lower
        .iter()
        .any(|h| h.starts_with("end") || h.contains(" end") || h.contains("finish"));
    let has_duration = lower
        .iter()
        .any(|h| h.contains("duration") || (h.contains("minutes") && !h.contains("sleep")));
    let has_type = lower.iter().any(|h| {
        ["activity", "exercise", "workout", "sport"]
            .iter()
            .any(|k| h.contains(k))
    });
    has_start && (has_end || has_duration) && (has_type || cat.contains("mindfulness"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_infer_date_column_exact() {
        let h = headers(&["Steps", "Date", "Calories"]);
        assert_eq!(infer_date_column(&h), Some("Date".to_string()));
    }

    #[test]
    fn test_infer_date_column_priority() {
        // "date" outranks "time" even though "Time" appears first.
        let h = headers(&["Time", "Date"]);
        assert_eq!(infer_date_column(&h), Some("Date".to_string()));
    }

    #[test]
    fn test_infer_date_column_fuzzy() {
        let h = headers(&["Steps", "Logged At"]);
        assert_eq!(infer_date_column(&h), Some("Logged At".to_string()));
        assert_eq!(infer_date_column(&headers(&["Steps", "Calories"])), None);
    }

    #[test]
    fn test_categorize_path() {
        let root = PathBuf::from("/export/Fitbit");
        let path = PathBuf::from("/export/Fitbit/Sleep/sleep_2023.csv");
        assert_eq!(categorize_path(&path, &root), "Sleep");

        // Root name absent: parent directory wins.
        let stray = PathBuf::from("/elsewhere/Activity/data.csv");
        assert_eq!(categorize_path(&stray, &root), "Activity");
    }

    #[test]
    fn test_match_metric_key_basic() {
        assert_eq!(match_metric_key("Steps", "Activity"), Some("steps"));
        assert_eq!(match_metric_key("Calories Burned", "Activity"), Some("calories"));
        assert_eq!(
            match_metric_key("Resting Heart Rate", "Health"),
            Some("resting_heart_rate")
        );
        assert_eq!(match_metric_key("Comment", "Activity"), None);
    }

    #[test]
    fn test_match_metric_key_order() {
        // "active zone minutes" must hit azm_minutes, not the later
        // fat-burn/cardio/peak splits.
        assert_eq!(
            match_metric_key("Active Zone Minutes", "Activity"),
            Some("azm_minutes")
        );
        assert_eq!(
            match_metric_key("Fat Burn Minutes", "Activity"),
            Some("azm_fat_burn_minutes")
        );
    }

    #[test]
    fn test_sleep_disambiguation() {
        // "Minutes Asleep" carries "sleep" context in the header itself.
        assert_eq!(
            match_metric_key("Minutes Asleep", "Activity"),
            Some("sleep_duration_min")
        );
        // A generic minutes column matches no sleep fragment and never
        // registers as a sleep metric, whatever the category.
        assert_eq!(match_metric_key("Duration Minutes", "Sleep"), None);
        assert_eq!(match_metric_key("Duration Minutes", "Activity"), None);
    }

    #[test]
    fn test_is_session_headers() {
        let session = headers(&["Start Time", "End Time", "Activity", "Calories"]);
        assert!(is_session_headers(&session, "Physical Activity"));

        // Missing type context fails unless the category is mindfulness.
        let untyped = headers(&["Start Time", "Duration"]);
        assert!(!is_session_headers(&untyped, "Physical Activity"));
        assert!(is_session_headers(&untyped, "Mindfulness"));

        // Sleep and goal categories are never sessions.
        assert!(!is_session_headers(&session, "Sleep"));
        assert!(!is_session_headers(&session, "Activity Goals"));

        // Start alone is not enough.
        let start_only = headers(&["Start Time", "Steps"]);
        assert!(!is_session_headers(&start_only, "Physical Activity"));
    }
}
