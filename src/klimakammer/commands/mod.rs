use crate::config::KlimaConfig;
use crate::model::{AnalysisEntry, AnalysisRecord, DaySummary, Reading};
use crate::registry::BuildingRecord;
use crate::stats::ReadingStats;
use std::path::PathBuf;

pub mod advise;
pub mod building;
pub mod config;
pub mod doctor;
pub mod history;
pub mod init;
pub mod record;
pub mod status;

#[derive(Debug, Clone)]
pub struct KlimaPaths {
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub reading: Option<Reading>,
    pub window_entries: Option<usize>,
    pub window_stats: Option<ReadingStats>,
    pub days: Vec<DaySummary>,
    pub analysis: Option<AnalysisRecord>,
    pub archive_path: Option<PathBuf>,
    pub analyses: Vec<AnalysisEntry>,
    pub building: Option<BuildingRecord>,
    pub config: Option<KlimaConfig>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_reading(mut self, reading: Reading) -> Self {
        self.reading = Some(reading);
        self
    }

    pub fn with_analysis(mut self, record: AnalysisRecord, path: PathBuf) -> Self {
        self.analysis = Some(record);
        self.archive_path = Some(path);
        self
    }

    pub fn with_analyses(mut self, entries: Vec<AnalysisEntry>) -> Self {
        self.analyses = entries;
        self
    }

    pub fn with_building(mut self, building: Option<BuildingRecord>) -> Self {
        self.building = building;
        self
    }

    pub fn with_days(mut self, days: Vec<DaySummary>) -> Self {
        self.days = days;
        self
    }

    pub fn with_config(mut self, config: KlimaConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Folds a follow-up result into this one. Messages keep their order;
    /// payload fields of `other` win when set.
    pub fn merge(mut self, other: CmdResult) -> Self {
        self.messages.extend(other.messages);
        self.reading = other.reading.or(self.reading);
        self.window_entries = other.window_entries.or(self.window_entries);
        self.window_stats = other.window_stats.or(self.window_stats);
        if !other.days.is_empty() {
            self.days = other.days;
        }
        self.analysis = other.analysis.or(self.analysis);
        self.archive_path = other.archive_path.or(self.archive_path);
        if !other.analyses.is_empty() {
            self.analyses = other.analyses;
        }
        self.building = other.building.or(self.building);
        self.config = other.config.or(self.config);
        self
    }
}
