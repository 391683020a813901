use super::{sort_newest_first, tail_readings, DataStore, DoctorReport, DEFAULT_WINDOW_SIZE};
use crate::error::Result;
use crate::model::{AnalysisEntry, AnalysisRecord, DaySummary, Reading};
use chrono::NaiveDate;
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;

/// In-memory storage for testing and development.
/// Does NOT persist data.
pub struct InMemoryStore {
    window_size: usize,
    current: Option<Reading>,
    window: VecDeque<Reading>,
    daily: BTreeMap<NaiveDate, Vec<Reading>>,
    analyses: Vec<AnalysisEntry>,
    latest: Option<AnalysisRecord>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            current: None,
            window: VecDeque::new(),
            daily: BTreeMap::new(),
            analyses: Vec::new(),
            latest: None,
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size.max(1);
        self
    }

    /// Drops the derived caches, leaving only daily logs and archives.
    pub fn clear_caches(&mut self) {
        self.current = None;
        self.window.clear();
        self.latest = None;
    }

    fn archive_path(&self, record: &AnalysisRecord) -> PathBuf {
        let stem = format!(
            "analyses/{}/{}_{}",
            record.timestamp.format("%Y-%m-%d"),
            record.timestamp.format("%H-%M-%S"),
            record.kind
        );
        let taken = |p: &PathBuf| self.analyses.iter().any(|e| &e.path == p);

        let mut candidate = PathBuf::from(format!("{}.txt", stem));
        let mut n = 2;
        while taken(&candidate) {
            candidate = PathBuf::from(format!("{}-{}.txt", stem, n));
            n += 1;
        }
        candidate
    }
}

impl DataStore for InMemoryStore {
    fn save_reading(&mut self, reading: &Reading) -> Result<()> {
        self.daily
            .entry(reading.date())
            .or_default()
            .push(reading.clone());
        self.current = Some(reading.clone());
        self.window.push_back(reading.clone());
        while self.window.len() > self.window_size {
            self.window.pop_front();
        }
        Ok(())
    }

    fn current_reading(&self) -> Result<Option<Reading>> {
        Ok(self.current.clone())
    }

    fn latest_readings(&self) -> Result<Vec<Reading>> {
        Ok(self.window.iter().cloned().collect())
    }

    fn daily_readings(&self, date: NaiveDate) -> Result<Vec<Reading>> {
        Ok(self.daily.get(&date).cloned().unwrap_or_default())
    }

    fn daily_summaries(&self) -> Result<Vec<DaySummary>> {
        Ok(self
            .daily
            .iter()
            .map(|(date, readings)| DaySummary {
                date: *date,
                readings: readings.len(),
            })
            .collect())
    }

    fn save_analysis(&mut self, record: &AnalysisRecord) -> Result<PathBuf> {
        let path = self.archive_path(record);
        self.analyses.push(AnalysisEntry {
            path: path.clone(),
            record: record.clone(),
        });
        self.latest = Some(record.clone());
        Ok(path)
    }

    fn latest_analysis(&self) -> Result<Option<AnalysisRecord>> {
        Ok(self.latest.clone())
    }

    fn list_analyses(&self) -> Result<Vec<AnalysisEntry>> {
        let mut entries = self.analyses.clone();
        sort_newest_first(&mut entries);
        Ok(entries)
    }

    fn doctor(&mut self) -> Result<DoctorReport> {
        let mut report = DoctorReport::default();

        let window = tail_readings(&*self, self.window_size)?;
        if let Some(last) = window.last() {
            self.current = Some(last.clone());
            report.restored_snapshot = true;
            report.window_entries = window.len();
        }
        self.window = window.into();

        if let Some(newest) = self.list_analyses()?.into_iter().next() {
            self.latest = Some(newest.record);
            report.restored_latest_analysis = true;
        }
        Ok(report)
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;
    use crate::model::AnalysisKind;
    use chrono::{Duration, Local, NaiveDateTime, TimeZone};

    pub struct StoreFixture {
        pub store: InMemoryStore,
    }

    impl Default for StoreFixture {
        fn default() -> Self {
            Self::new()
        }
    }

    impl StoreFixture {
        pub fn new() -> Self {
            Self {
                store: InMemoryStore::new(),
            }
        }

        pub fn with_reading(mut self, at: NaiveDateTime, temperature: f64, humidity: f64) -> Self {
            let local = Local
                .from_local_datetime(&at)
                .earliest()
                .unwrap_or_else(|| Local.from_utc_datetime(&at));
            self.store
                .save_reading(&Reading::new(local, temperature, humidity))
                .unwrap();
            self
        }

        /// `count` readings one minute apart starting at `start`, warming by
        /// a tenth of a degree each step.
        pub fn with_series(mut self, start: NaiveDateTime, count: usize) -> Self {
            for i in 0..count {
                let at = start + Duration::minutes(i as i64);
                self = self.with_reading(at, 20.0 + i as f64 / 10.0, 50.0 + i as f64);
            }
            self
        }

        pub fn with_analysis(mut self, at: NaiveDateTime, kind: AnalysisKind, response: &str) -> Self {
            let record = AnalysisRecord {
                timestamp: at,
                model: "gpt-4".to_string(),
                kind,
                prompt: "fixture prompt".to_string(),
                response: response.to_string(),
            };
            self.store.save_analysis(&record).unwrap();
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::StoreFixture;
    use super::*;
    use crate::model::AnalysisKind;

    fn at(day: u32, h: u32, m: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn window_is_bounded() {
        let mut fixture = StoreFixture::new();
        fixture.store = InMemoryStore::new().with_window_size(5);
        let store = fixture.with_series(at(1, 9, 0), 6).store;

        let window = store.latest_readings().unwrap();
        assert_eq!(window.len(), 5);
        assert_eq!(window[0].timestamp, at(1, 9, 1));
        assert_eq!(store.current_reading().unwrap().unwrap().timestamp, at(1, 9, 5));
        assert_eq!(store.daily_readings(at(1, 0, 0).date()).unwrap().len(), 6);
    }

    #[test]
    fn doctor_restores_cleared_caches() {
        let mut store = StoreFixture::new()
            .with_series(at(1, 23, 58), 4)
            .with_analysis(at(2, 1, 0), AnalysisKind::TrendMultiDay, "fine")
            .store;
        let before = store.latest_readings().unwrap();
        store.clear_caches();

        let report = store.doctor().unwrap();
        assert_eq!(report.window_entries, 4);
        assert!(report.restored_snapshot);
        assert!(report.restored_latest_analysis);
        assert_eq!(store.latest_readings().unwrap(), before);
    }

    #[test]
    fn same_second_archives_get_suffixes() {
        let store = StoreFixture::new()
            .with_analysis(at(1, 12, 0), AnalysisKind::CurrentConditions, "a")
            .with_analysis(at(1, 12, 0), AnalysisKind::CurrentConditions, "b")
            .store;

        let paths: Vec<PathBuf> = store.list_analyses().unwrap().into_iter().map(|e| e.path).collect();
        assert!(paths.contains(&PathBuf::from("analyses/2025-06-01/12-00-00_current_conditions.txt")));
        assert!(paths.contains(&PathBuf::from("analyses/2025-06-01/12-00-00_current_conditions-2.txt")));
    }

    #[test]
    fn doctor_picks_the_last_archive_of_a_second() {
        let mut store = StoreFixture::new()
            .with_analysis(at(1, 12, 0), AnalysisKind::CurrentConditions, "first")
            .with_analysis(at(1, 12, 0), AnalysisKind::CurrentConditions, "second")
            .store;
        store.clear_caches();

        store.doctor().unwrap();
        assert_eq!(store.latest_analysis().unwrap().unwrap().response, "second");
        assert_eq!(store.list_analyses().unwrap()[0].record.response, "second");
    }
}
