//! Summary statistics over a set of readings, used by the trend prompts and
//! the status view.

use crate::model::Reading;
use chrono::NaiveDateTime;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl Range {
    fn of(values: impl Iterator<Item = f64>) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        if count == 0 {
            return None;
        }
        Some(Self {
            min,
            max,
            mean: sum / count as f64,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadingStats {
    pub count: usize,
    pub first: NaiveDateTime,
    pub last: NaiveDateTime,
    pub temperature: Range,
    pub humidity: Range,
}

impl ReadingStats {
    /// `None` for an empty slice.
    pub fn from_readings(readings: &[Reading]) -> Option<Self> {
        let first = readings.first()?;
        let last = readings.last()?;
        Some(Self {
            count: readings.len(),
            first: first.timestamp,
            last: last.timestamp,
            temperature: Range::of(readings.iter().map(|r| r.temperature))?,
            humidity: Range::of(readings.iter().map(|r| r.humidity))?,
        })
    }
}
