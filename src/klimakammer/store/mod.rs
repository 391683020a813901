//! # Persistence Store
//!
//! The [`DataStore`] trait is the only way the rest of the crate touches
//! persisted readings and analyses. The acquisition loop writes through it,
//! the advisory commands read through it.
//!
//! ## Implementations
//!
//! - [`fs::FileStore`]: production, a plain directory shared between the
//!   logger process and the advisory process.
//! - [`memory::InMemoryStore`]: no persistence, for tests.
//!
//! ## Storage Format
//!
//! For `FileStore`:
//! ```text
//! sensordata/
//! ├── current_reading.txt          # CurrentSnapshot, overwritten per reading
//! ├── latest_readings.txt          # RollingWindow, newest N readings
//! ├── config.json                  # optional configuration
//! ├── daily/
//! │   ├── 2025-06-01.csv           # DailyLog, append-only
//! │   └── 2025-06-01.jsonl         # JSON-lines mirror of the DailyLog
//! └── analyses/
//!     ├── latest_analysis.txt      # latest pointer, overwritten per analysis
//!     └── 2025-06-01/
//!         └── 14-05-09_current_conditions.txt
//! ```
//!
//! The snapshot, the window and the latest pointer are caches: `doctor`
//! rebuilds them from the daily logs and the dated archives.

use crate::error::Result;
use crate::model::{AnalysisEntry, AnalysisRecord, DaySummary, Reading};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

pub mod format;
pub mod fs;
pub mod memory;

pub const DEFAULT_WINDOW_SIZE: usize = 100;

/// Report from the `doctor` operation.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DoctorReport {
    pub restored_snapshot: bool,
    pub window_entries: usize,
    pub restored_latest_analysis: bool,
}

pub trait DataStore {
    /// Apply one reading: overwrite the snapshot, push onto the rolling
    /// window, append to the reading's daily log.
    fn save_reading(&mut self, reading: &Reading) -> Result<()>;

    /// The current snapshot, if any reading was ever stored.
    fn current_reading(&self) -> Result<Option<Reading>>;

    /// Rolling window, oldest first.
    fn latest_readings(&self) -> Result<Vec<Reading>>;

    /// Every reading of one calendar day in arrival order. Empty if the day
    /// has no log.
    fn daily_readings(&self, date: NaiveDate) -> Result<Vec<Reading>>;

    /// One entry per daily log, oldest day first.
    fn daily_summaries(&self) -> Result<Vec<DaySummary>>;

    /// Archive one analysis and refresh the latest pointer. Returns the
    /// archive location.
    fn save_analysis(&mut self, record: &AnalysisRecord) -> Result<PathBuf>;

    fn latest_analysis(&self) -> Result<Option<AnalysisRecord>>;

    /// Archived analyses, newest first.
    fn list_analyses(&self) -> Result<Vec<AnalysisEntry>>;

    /// Rebuild the derived caches from the append-only data.
    fn doctor(&mut self) -> Result<DoctorReport>;
}

impl<S: DataStore + ?Sized> DataStore for &mut S {
    fn save_reading(&mut self, reading: &Reading) -> Result<()> {
        (**self).save_reading(reading)
    }

    fn current_reading(&self) -> Result<Option<Reading>> {
        (**self).current_reading()
    }

    fn latest_readings(&self) -> Result<Vec<Reading>> {
        (**self).latest_readings()
    }

    fn daily_readings(&self, date: NaiveDate) -> Result<Vec<Reading>> {
        (**self).daily_readings(date)
    }

    fn daily_summaries(&self) -> Result<Vec<DaySummary>> {
        (**self).daily_summaries()
    }

    fn save_analysis(&mut self, record: &AnalysisRecord) -> Result<PathBuf> {
        (**self).save_analysis(record)
    }

    fn latest_analysis(&self) -> Result<Option<AnalysisRecord>> {
        (**self).latest_analysis()
    }

    fn list_analyses(&self) -> Result<Vec<AnalysisEntry>> {
        (**self).list_analyses()
    }

    fn doctor(&mut self) -> Result<DoctorReport> {
        (**self).doctor()
    }
}

/// Collects the newest `limit` readings across days, oldest first.
pub(crate) fn tail_readings<S: DataStore + ?Sized>(store: &S, limit: usize) -> Result<Vec<Reading>> {
    let mut days = store.daily_summaries()?;
    days.reverse();

    let mut collected: Vec<Reading> = Vec::new();
    for day in days {
        if collected.len() >= limit {
            break;
        }
        let mut readings = store.daily_readings(day.date)?;
        readings.append(&mut collected);
        collected = readings;
    }

    let skip = collected.len().saturating_sub(limit);
    Ok(collected.split_off(skip))
}

/// Newest first. Archives written in the same second are told apart by
/// their collision suffix; the unsuffixed file was written first.
pub(crate) fn sort_newest_first(entries: &mut [AnalysisEntry]) {
    entries.sort_by(|a, b| {
        (b.record.timestamp, collision_index(&b.path))
            .cmp(&(a.record.timestamp, collision_index(&a.path)))
    });
}

/// `14-05-09_current_conditions-3.txt` is 3, no suffix is 1.
fn collision_index(path: &Path) -> u32 {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|stem| stem.rsplit_once('-'))
        .and_then(|(_, n)| n.parse().ok())
        .unwrap_or(1)
}
