//! Descriptive statistics over one field's sampled values.
//!
//! Everything here is a pure function over an in-memory slice. Callers
//! strip nulls before calling; empty input yields `None` rather than NaN.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Summary of a numeric field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub mean: f64,
    pub median: f64,
    /// Most frequent value; ties resolve to the smallest value.
    pub mode: f64,
    /// Occurrences of `mode`.
    pub mode_count: usize,
    /// Sample standard deviation (n - 1); zero for a single value.
    pub std_dev: f64,
}

/// A value and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frequency {
    pub value: String,
    pub count: usize,
}

/// Frequency table of a categorical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrequencySummary {
    pub count: usize,
    pub distinct: usize,
    /// Sorted by count descending, then value ascending.
    pub top: Vec<Frequency>,
}

/// Earliest/latest instant of a date field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateRange {
    pub count: usize,
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
    pub span_days: f64,
}

/// Computes min/max/mean/median/mode/stddev.
///
/// Non-finite values are ignored.
#[must_use]
pub fn summarize_numbers(values: &[f64]) -> Option<NumericSummary> {
    // `+ 0.0` folds -0.0 into 0.0 so both count toward the same mode.
    let mut sorted: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .map(|v| v + 0.0)
        .collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let count = sorted.len();
    let sum: f64 = sorted.iter().sum();
    let mean = sum / count as f64;

    let mid = count / 2;
    let median = if count % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    let (mode, mode_count) = mode_of_sorted(&sorted);

    let std_dev = if count < 2 {
        0.0
    } else {
        let squares: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
        let variance = squares / (count - 1) as f64;
        variance.sqrt()
    };

    Some(NumericSummary {
        count,
        min: sorted[0],
        max: sorted[count - 1],
        sum,
        mean,
        median,
        mode,
        mode_count,
        std_dev,
    })
}

/// Longest run in a sorted slice; the first (smallest) run wins ties.
fn mode_of_sorted(sorted: &[f64]) -> (f64, usize) {
    let mut best = (sorted[0], 0);
    let mut run_start = 0;

    for i in 1..=sorted.len() {
        if i == sorted.len() || sorted[i] != sorted[run_start] {
            let run_len = i - run_start;
            if run_len > best.1 {
                best = (sorted[run_start], run_len);
            }
            run_start = i;
        }
    }

    best
}

/// Counts occurrences and keeps the `top_n` most frequent values.
#[must_use]
pub fn frequencies<I, S>(values: I, top_n: usize) -> Option<FrequencySummary>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut count = 0;
    for value in values {
        *counts.entry(value.into()).or_insert(0) += 1;
        count += 1;
    }
    if count == 0 {
        return None;
    }

    let distinct = counts.len();
    let mut top: Vec<Frequency> = counts
        .into_iter()
        .map(|(value, count)| Frequency { value, count })
        .collect();
    top.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    top.truncate(top_n);

    Some(FrequencySummary {
        count,
        distinct,
        top,
    })
}

/// Finds the earliest and latest instant.
#[must_use]
pub fn date_range(values: &[DateTime<Utc>]) -> Option<DateRange> {
    let earliest = *values.iter().min()?;
    let latest = *values.iter().max()?;
    let span_days = (latest - earliest).num_milliseconds() as f64 / 86_400_000.0;

    Some(DateRange {
        count: values.len(),
        earliest,
        latest,
        span_days,
    })
}
