//! Per-entry durations, intervals and session statistics.

use serde::Serialize;

use crate::model::{ContractionLogEntry, sort_chronologically};
use crate::time::clamped_duration_seconds;

/// Maximum number of entries in the "recent" list.
pub const MAX_RECENT_ENTRIES: usize = 10;

/// An entry enriched with its position, duration and gap to the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayEntry {
    #[serde(flatten)]
    pub entry: ContractionLogEntry,
    /// 1-based position in chronological order.
    pub index: usize,
    pub duration_sec: u64,
    /// Seconds from the previous entry's end to this entry's start.
    /// `None` for the first entry.
    pub interval_sec: Option<u64>,
}

/// Aggregate statistics over a set of display entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub count: usize,
    pub average_duration_sec: u64,
    pub average_interval_sec: u64,
    pub has_interval_data: bool,
}

/// Sorts `entries` and derives each one's duration and interval.
pub fn derive_display(entries: &[ContractionLogEntry]) -> Vec<DisplayEntry> {
    let sorted = sort_chronologically(entries.to_vec());
    let mut previous_end: Option<i64> = None;
    sorted
        .into_iter()
        .enumerate()
        .map(|(position, entry)| {
            let duration_sec = clamped_duration_seconds(entry.end.saturating_sub(entry.start));
            let interval_sec =
                previous_end.map(|end| clamped_duration_seconds(entry.start.saturating_sub(end)));
            previous_end = Some(entry.end);
            DisplayEntry {
                entry,
                index: position + 1,
                duration_sec,
                interval_sec,
            }
        })
        .collect()
}

/// Counts and averages; averages round half away from zero.
pub fn summarize(entries: &[DisplayEntry]) -> Stats {
    let durations: Vec<u64> = entries.iter().map(|e| e.duration_sec).collect();
    let intervals: Vec<u64> = entries.iter().filter_map(|e| e.interval_sec).collect();
    Stats {
        count: entries.len(),
        average_duration_sec: rounded_mean(&durations),
        average_interval_sec: rounded_mean(&intervals),
        has_interval_data: !intervals.is_empty(),
    }
}

/// The last [`MAX_RECENT_ENTRIES`] of a timeline, newest first.
pub fn recent(timeline: &[DisplayEntry]) -> Vec<DisplayEntry> {
    timeline.iter().rev().take(MAX_RECENT_ENTRIES).cloned().collect()
}

/// Mean of non-negative values rounded to the nearest integer, halves up.
fn rounded_mean(values: &[u64]) -> u64 {
    let count = values.len() as u64;
    if count == 0 {
        return 0;
    }
    let sum: u64 = values.iter().sum();
    (sum + count / 2) / count
}
