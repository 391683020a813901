use super::format::{
    parse_archive, parse_payload, parse_snapshot, parse_window, render_archive, render_payload,
    render_snapshot, render_window, DAILY_HEADER,
};
use super::{sort_newest_first, tail_readings, DataStore, DoctorReport, DEFAULT_WINDOW_SIZE};
use crate::error::{KlimaError, Result};
use crate::model::{AnalysisEntry, AnalysisRecord, DaySummary, Reading};
use chrono::NaiveDate;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const CURRENT_FILE: &str = "current_reading.txt";
const WINDOW_FILE: &str = "latest_readings.txt";
const DAILY_DIR: &str = "daily";
const ANALYSES_DIR: &str = "analyses";
const LATEST_ANALYSIS_FILE: &str = "latest_analysis.txt";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct FileStore {
    root: PathBuf,
    window_size: usize,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Creates the data directory layout. The logger calls this at startup
    /// so an unwritable location fails before the port is touched.
    pub fn ensure_layout(&self) -> Result<()> {
        ensure_dir(&self.root)?;
        ensure_dir(&self.root.join(DAILY_DIR))?;
        ensure_dir(&self.root.join(ANALYSES_DIR))
    }

    pub fn current_path(&self) -> PathBuf {
        self.root.join(CURRENT_FILE)
    }

    pub fn window_path(&self) -> PathBuf {
        self.root.join(WINDOW_FILE)
    }

    pub fn daily_csv_path(&self, date: NaiveDate) -> PathBuf {
        self.root
            .join(DAILY_DIR)
            .join(format!("{}.csv", date.format(DATE_FORMAT)))
    }

    pub fn daily_jsonl_path(&self, date: NaiveDate) -> PathBuf {
        self.root
            .join(DAILY_DIR)
            .join(format!("{}.jsonl", date.format(DATE_FORMAT)))
    }

    pub fn latest_analysis_path(&self) -> PathBuf {
        self.root.join(ANALYSES_DIR).join(LATEST_ANALYSIS_FILE)
    }

    fn append_daily(&self, reading: &Reading) -> Result<()> {
        let csv_path = self.daily_csv_path(reading.date());
        let is_new = fs::metadata(&csv_path).map(|m| m.len() == 0).unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&csv_path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            writer.write_record(DAILY_HEADER)?;
        }
        writer.serialize(reading)?;
        writer.flush()?;

        let mut jsonl = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.daily_jsonl_path(reading.date()))?;
        let line = format!("{}\n", serde_json::to_string(reading)?);
        jsonl.write_all(line.as_bytes())?;
        Ok(())
    }

    fn write_window(&self, readings: &[Reading]) -> Result<()> {
        let updated = readings
            .last()
            .map(|r| r.timestamp)
            .unwrap_or_default();
        write_atomic(&self.window_path(), &render_window(readings, &updated))
    }

    fn archive_path(&self, record: &AnalysisRecord) -> PathBuf {
        let dir = self
            .root
            .join(ANALYSES_DIR)
            .join(record.timestamp.format(DATE_FORMAT).to_string());
        let stem = format!("{}_{}", record.timestamp.format("%H-%M-%S"), record.kind);

        let mut candidate = dir.join(format!("{}.txt", stem));
        let mut n = 2;
        while candidate.exists() {
            candidate = dir.join(format!("{}-{}.txt", stem, n));
            n += 1;
        }
        candidate
    }

    fn count_rows(path: &Path) -> Result<usize> {
        let mut reader = csv::Reader::from_path(path)?;
        Ok(reader.records().filter(|r| r.is_ok()).count())
    }
}

impl DataStore for FileStore {
    fn save_reading(&mut self, reading: &Reading) -> Result<()> {
        ensure_dir(&self.root.join(DAILY_DIR))?;

        // The daily log is authoritative, so it is written first.
        self.append_daily(reading)?;
        write_atomic(&self.current_path(), &render_snapshot(reading))?;

        let mut window = self.latest_readings()?;
        window.push(reading.clone());
        let excess = window.len().saturating_sub(self.window_size);
        window.drain(..excess);
        self.write_window(&window)
    }

    fn current_reading(&self) -> Result<Option<Reading>> {
        let path = self.current_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        parse_snapshot(&content).map(Some)
    }

    fn latest_readings(&self) -> Result<Vec<Reading>> {
        let path = self.window_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        Ok(parse_window(&fs::read_to_string(path)?))
    }

    fn daily_readings(&self, date: NaiveDate) -> Result<Vec<Reading>> {
        let path = self.daily_csv_path(date);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&path)?;
        let mut readings = Vec::new();
        for row in reader.deserialize::<Reading>() {
            match row {
                Ok(reading) => readings.push(reading),
                Err(e) => log::warn!("skipping bad row in {}: {}", path.display(), e),
            }
        }
        Ok(readings)
    }

    fn daily_summaries(&self) -> Result<Vec<DaySummary>> {
        let dir = self.root.join(DAILY_DIR);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut days = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let Some(date) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
            else {
                continue;
            };
            days.push(DaySummary {
                date,
                readings: Self::count_rows(&path)?,
            });
        }

        days.sort_by_key(|d| d.date);
        Ok(days)
    }

    fn save_analysis(&mut self, record: &AnalysisRecord) -> Result<PathBuf> {
        let path = self.archive_path(record);
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }

        write_atomic(&path, &render_archive(record))?;
        write_atomic(&self.latest_analysis_path(), &render_payload(record))?;
        Ok(path)
    }

    fn latest_analysis(&self) -> Result<Option<AnalysisRecord>> {
        let path = self.latest_analysis_path();
        if !path.exists() {
            return Ok(None);
        }
        parse_payload(&fs::read_to_string(path)?).map(Some)
    }

    fn list_analyses(&self) -> Result<Vec<AnalysisEntry>> {
        let dir = self.root.join(ANALYSES_DIR);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for day in fs::read_dir(&dir)? {
            let day_path = day?.path();
            let is_day_dir = day_path.is_dir()
                && day_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| NaiveDate::parse_from_str(n, DATE_FORMAT).is_ok())
                    .unwrap_or(false);
            if !is_day_dir {
                continue;
            }

            for file in fs::read_dir(&day_path)? {
                let path = file?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                    continue;
                }
                let text = match fs::read_to_string(&path) {
                    Ok(text) => text,
                    Err(e) => {
                        log::warn!("skipping unreadable archive {}: {}", path.display(), e);
                        continue;
                    }
                };
                match parse_archive(&text) {
                    Ok(record) => entries.push(AnalysisEntry { path, record }),
                    Err(e) => log::warn!("skipping unreadable archive {}: {}", path.display(), e),
                }
            }
        }

        sort_newest_first(&mut entries);
        Ok(entries)
    }

    fn doctor(&mut self) -> Result<DoctorReport> {
        let mut report = DoctorReport::default();

        let window = tail_readings(&*self, self.window_size)?;
        if let Some(last) = window.last() {
            write_atomic(&self.current_path(), &render_snapshot(last))?;
            self.write_window(&window)?;
            report.restored_snapshot = true;
            report.window_entries = window.len();
        }

        if let Some(newest) = self.list_analyses()?.into_iter().next() {
            write_atomic(&self.latest_analysis_path(), &render_payload(&newest.record))?;
            report.restored_latest_analysis = true;
        }

        Ok(report)
    }
}

fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(KlimaError::Io)?;
    }
    Ok(())
}

/// Write-temp-then-rename so a killed process never leaves a half file.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| KlimaError::Store(format!("invalid target path: {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnalysisKind;
    use chrono::{Local, NaiveDateTime, TimeZone};

    fn reading_at(day: u32, h: u32, m: u32, t: f64, hum: f64) -> Reading {
        Reading::new(
            Local.with_ymd_and_hms(2025, 6, day, h, m, 0).unwrap(),
            t,
            hum,
        )
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    fn record_at(ts: NaiveDateTime, kind: AnalysisKind, response: &str) -> AnalysisRecord {
        AnalysisRecord {
            timestamp: ts,
            model: "gpt-4".into(),
            kind,
            prompt: "prompt body".into(),
            response: response.into(),
        }
    }

    #[test]
    fn two_readings_update_all_three_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().to_path_buf());

        let first = reading_at(1, 12, 0, 22.8, 63.5);
        let second = reading_at(1, 12, 1, 23.1, 64.2);
        store.save_reading(&first).unwrap();
        store.save_reading(&second).unwrap();

        assert_eq!(store.current_reading().unwrap(), Some(second.clone()));
        assert_eq!(store.latest_readings().unwrap(), vec![first.clone(), second.clone()]);
        assert_eq!(store.daily_readings(date(1)).unwrap(), vec![first, second.clone()]);

        let csv = fs::read_to_string(store.daily_csv_path(date(1))).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "timestamp,temperature,humidity,unix_timestamp");
        assert!(lines[2].starts_with("2025-06-01 12:01:00,23.1,64.2,"));

        let jsonl = fs::read_to_string(store.daily_jsonl_path(date(1))).unwrap();
        assert_eq!(jsonl.lines().count(), 2);

        let snapshot = fs::read_to_string(store.current_path()).unwrap();
        assert!(snapshot.contains("Temperature: 23.1°C"));
        assert!(snapshot.contains("Humidity: 64.2%"));
    }

    #[test]
    fn window_keeps_only_newest_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().to_path_buf()).with_window_size(3);

        let readings: Vec<Reading> = (0..4)
            .map(|i| reading_at(1, 10, i, 20.0 + i as f64, 50.0))
            .collect();
        for r in &readings {
            store.save_reading(r).unwrap();
        }

        assert_eq!(store.latest_readings().unwrap(), readings[1..].to_vec());
        assert_eq!(store.daily_readings(date(1)).unwrap().len(), 4);
    }

    #[test]
    fn rollover_starts_a_new_daily_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().to_path_buf());

        store.save_reading(&reading_at(1, 23, 59, 21.0, 55.0)).unwrap();
        store.save_reading(&reading_at(2, 0, 0, 20.5, 56.0)).unwrap();

        let days = store.daily_summaries().unwrap();
        assert_eq!(
            days,
            vec![
                DaySummary { date: date(1), readings: 1 },
                DaySummary { date: date(2), readings: 1 },
            ]
        );
        let csv = fs::read_to_string(store.daily_csv_path(date(2))).unwrap();
        assert!(csv.starts_with("timestamp,temperature,humidity,unix_timestamp\n"));
        assert_eq!(store.latest_readings().unwrap().len(), 2);
    }

    #[test]
    fn empty_directory_reads_as_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("missing"));

        assert_eq!(store.current_reading().unwrap(), None);
        assert!(store.latest_readings().unwrap().is_empty());
        assert!(store.daily_readings(date(1)).unwrap().is_empty());
        assert!(store.daily_summaries().unwrap().is_empty());
        assert!(store.list_analyses().unwrap().is_empty());
        assert!(store.latest_analysis().unwrap().is_none());
    }

    #[test]
    fn analysis_goes_to_dated_archive_and_latest_pointer() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().to_path_buf());
        let ts = date(1).and_hms_opt(14, 5, 9).unwrap();

        let record = record_at(ts, AnalysisKind::CurrentConditions, "Ventilate more.");
        let path = store.save_analysis(&record).unwrap();

        assert_eq!(
            path,
            dir.path()
                .join("analyses/2025-06-01/14-05-09_current_conditions.txt")
        );
        assert_eq!(store.latest_analysis().unwrap(), Some(record.clone()));

        let second = store.save_analysis(&record).unwrap();
        assert!(second.ends_with("14-05-09_current_conditions-2.txt"));
        assert_eq!(store.list_analyses().unwrap().len(), 2);
    }

    #[test]
    fn history_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().to_path_buf());

        let older = record_at(date(1).and_hms_opt(9, 0, 0).unwrap(), AnalysisKind::TrendSingleDay, "old");
        let newer = record_at(date(2).and_hms_opt(8, 0, 0).unwrap(), AnalysisKind::TrendMultiDay, "new");
        store.save_analysis(&older).unwrap();
        store.save_analysis(&newer).unwrap();

        let history = store.list_analyses().unwrap();
        assert_eq!(history[0].record, newer);
        assert_eq!(history[1].record, older);
    }

    #[test]
    fn doctor_rebuilds_caches() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().to_path_buf()).with_window_size(2);

        let readings = vec![
            reading_at(1, 8, 0, 19.0, 60.0),
            reading_at(2, 8, 0, 20.0, 61.0),
            reading_at(2, 9, 0, 21.0, 62.0),
        ];
        for r in &readings {
            store.save_reading(r).unwrap();
        }
        let record = record_at(date(2).and_hms_opt(10, 0, 0).unwrap(), AnalysisKind::TrendMultiDay, "ok");
        store.save_analysis(&record).unwrap();

        fs::remove_file(store.current_path()).unwrap();
        fs::remove_file(store.window_path()).unwrap();
        fs::remove_file(store.latest_analysis_path()).unwrap();

        let report = store.doctor().unwrap();
        assert_eq!(
            report,
            DoctorReport {
                restored_snapshot: true,
                window_entries: 2,
                restored_latest_analysis: true,
            }
        );
        assert_eq!(store.current_reading().unwrap(), Some(readings[2].clone()));
        assert_eq!(store.latest_readings().unwrap(), readings[1..].to_vec());
        assert_eq!(store.latest_analysis().unwrap(), Some(record));
    }

    #[test]
    fn daily_log_accepts_fractional_unix_seconds() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        let path = store.daily_csv_path(date(1));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            "timestamp,temperature,humidity,unix_timestamp\n\
             2025-06-01 12:00:00,22.8,63.5,1748772000.734\n\
             2025-06-01 12:01:00,23.1,64.2,1748772060.5\n",
        )
        .unwrap();

        let readings = store.daily_readings(date(1)).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].unix_timestamp, 1_748_772_000);
        assert_eq!(readings[1].unix_timestamp, 1_748_772_060);
        assert_eq!(store.daily_summaries().unwrap()[0].readings, 2);
    }

    #[test]
    fn doctor_picks_the_last_archive_of_a_second() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().to_path_buf());
        let noon = date(1).and_hms_opt(12, 0, 0).unwrap();
        let first = store
            .save_analysis(&record_at(noon, AnalysisKind::CurrentConditions, "first"))
            .unwrap();
        let second = store
            .save_analysis(&record_at(noon, AnalysisKind::CurrentConditions, "second"))
            .unwrap();
        assert_ne!(first, second);

        fs::remove_file(store.latest_analysis_path()).unwrap();
        store.doctor().unwrap();

        assert_eq!(store.latest_analysis().unwrap().unwrap().response, "second");
        let listed = store.list_analyses().unwrap();
        assert_eq!(listed[0].path, second);
        assert_eq!(listed[1].path, first);
    }

    #[test]
    fn unreadable_archives_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().to_path_buf());
        let saved = store
            .save_analysis(&record_at(
                date(1).and_hms_opt(9, 0, 0).unwrap(),
                AnalysisKind::TrendSingleDay,
                "ok",
            ))
            .unwrap();
        let broken = saved.with_file_name("10-00-00_trend_single_day.txt");
        fs::write(&broken, [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let listed = store.list_analyses().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].path, saved);
    }

    #[test]
    fn no_temp_files_survive_a_write() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().to_path_buf());
        store.save_reading(&reading_at(1, 12, 0, 22.0, 50.0)).unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
