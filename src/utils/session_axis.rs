//! Compressed time axis
//!
//! Maps bar timestamps onto an x coordinate measured in seconds of *visible*
//! time. Every range covered by a [`RangeBreak`] contributes nothing, so
//! weekends and overnight sessions collapse instead of leaving flat gaps.
//! Session boundaries are US/Eastern wall clock.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use chrono_tz::US::Eastern;

use crate::models::RangeBreak;

/// Regular session open, 09:30 Eastern
fn session_open() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default()
}

/// Regular session close, 16:00 Eastern
fn session_close() -> NaiveTime {
    NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct SessionAxis {
    timestamps: Vec<DateTime<Utc>>,
    positions: Vec<f64>,
}

impl SessionAxis {
    /// Build the axis for timestamps sorted oldest first
    pub fn new(timestamps: &[DateTime<Utc>], breaks: &[RangeBreak]) -> Self {
        let mut positions = Vec::with_capacity(timestamps.len());
        let mut previous: Option<NaiveDateTime> = None;
        let mut x = 0.0;

        for ts in timestamps {
            let local = to_eastern(ts);
            if let Some(prev) = previous {
                let elapsed = (local - prev).num_seconds().max(0);
                let hidden = excluded_seconds(prev, local, breaks);
                x += (elapsed - hidden).max(0) as f64;
            }
            positions.push(x);
            previous = Some(local);
        }

        Self {
            timestamps: timestamps.to_vec(),
            positions,
        }
    }

    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    /// Median gap between neighbouring bars, 1.0 when there is none
    pub fn typical_spacing(&self) -> f64 {
        let mut gaps: Vec<f64> = self
            .positions
            .windows(2)
            .map(|w| w[1] - w[0])
            .filter(|g| *g > 0.0)
            .collect();
        if gaps.is_empty() {
            return 1.0;
        }
        gaps.sort_by(|a, b| a.total_cmp(b));
        gaps[gaps.len() / 2]
    }

    /// Axis bounds padded by half a bar on each side
    pub fn range(&self) -> (f64, f64) {
        let pad = self.typical_spacing() / 2.0;
        let first = self.positions.first().copied().unwrap_or(0.0);
        let last = self.positions.last().copied().unwrap_or(0.0);
        (first - pad, last + pad)
    }

    /// Timestamp of the bar closest to `x`
    pub fn timestamp_at(&self, x: f64) -> Option<DateTime<Utc>> {
        if self.positions.is_empty() {
            return None;
        }
        let idx = self.positions.partition_point(|p| *p < x);
        let nearest = if idx == 0 {
            0
        } else if idx >= self.positions.len() {
            self.positions.len() - 1
        } else if (self.positions[idx] - x).abs() < (x - self.positions[idx - 1]).abs() {
            idx
        } else {
            idx - 1
        };
        self.timestamps.get(nearest).copied()
    }

    /// Tick label for `x`, formatted in Eastern time
    pub fn label_at(&self, x: f64, intraday: bool) -> String {
        let format = if intraday { "%m-%d %H:%M" } else { "%Y-%m-%d" };
        self.timestamp_at(x)
            .map(|ts| to_eastern(&ts).format(format).to_string())
            .unwrap_or_default()
    }
}

fn to_eastern(ts: &DateTime<Utc>) -> NaiveDateTime {
    ts.with_timezone(&Eastern).naive_local()
}

/// Seconds of `[from, to)` covered by any of `breaks`
fn excluded_seconds(from: NaiveDateTime, to: NaiveDateTime, breaks: &[RangeBreak]) -> i64 {
    if to <= from || breaks.is_empty() {
        return 0;
    }
    let weekends = breaks.contains(&RangeBreak::Weekends);
    let off_hours = breaks.contains(&RangeBreak::OffHours);

    let mut total = 0;
    let mut day = from.date();
    while day <= to.date() {
        for (start, end) in hidden_intervals(day, weekends, off_hours) {
            let lo = start.max(from);
            let hi = end.min(to);
            if hi > lo {
                total += (hi - lo).num_seconds();
            }
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    total
}

/// Hidden intervals of one calendar day, non-overlapping
fn hidden_intervals(day: NaiveDate, weekends: bool, off_hours: bool) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    let midnight = day.and_time(NaiveTime::default());
    let next_midnight = midnight + Duration::days(1);

    if weekends && matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
        return vec![(midnight, next_midnight)];
    }
    if off_hours {
        return vec![
            (midnight, day.and_time(session_open())),
            (day.and_time(session_close()), next_midnight),
        ];
    }
    Vec::new()
}
