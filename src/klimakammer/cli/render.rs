//! Terminal output for `CmdResult` payloads.
//!
//! Layout (widths, truncation, padding) is computed here into plain strings so
//! it can be tested; the `print_*` wrappers add color on the way out.

use chrono::{Local, NaiveDateTime};
use colored::Colorize;
use klimakammer::commands::{CmdMessage, CmdResult, MessageLevel};
use klimakammer::config::{KlimaConfig, KEYS};
use klimakammer::model::{AnalysisEntry, AnalysisRecord, Reading};
use klimakammer::registry::BuildingRecord;
use timeago::Formatter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub const LINE_WIDTH: usize = 100;
pub const TIME_WIDTH: usize = 16;
const KIND_WIDTH: usize = 28;
const RULE: &str = "--------------------------------";

pub fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content.dimmed()),
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => println!("{}", message.content.yellow()),
            MessageLevel::Error => println!("{}", message.content.red()),
        }
    }
}

pub fn render_reading(reading: &Reading) -> String {
    format!(
        "{:.1}°C  {:.1}%  at {}",
        reading.temperature,
        reading.humidity,
        reading.formatted_timestamp()
    )
}

pub fn render_status(result: &CmdResult) -> String {
    let mut out = String::new();
    if let Some(reading) = &result.reading {
        out.push_str(&format!("Current:  {}\n", render_reading(reading)));
    }
    if let Some(entries) = result.window_entries {
        out.push_str(&format!("Rolling window: {} entries\n", entries));
    }
    if let Some(stats) = &result.window_stats {
        out.push_str(&format!(
            "  temperature {:.1} to {:.1}°C (mean {:.1})\n",
            stats.temperature.min, stats.temperature.max, stats.temperature.mean
        ));
        out.push_str(&format!(
            "  humidity    {:.1} to {:.1}% (mean {:.1})\n",
            stats.humidity.min, stats.humidity.max, stats.humidity.mean
        ));
    }
    if result.days.is_empty() {
        out.push_str("No daily logs yet.\n");
    } else {
        out.push_str("Daily logs:\n");
        for day in &result.days {
            out.push_str(&format!("  {}  {:>6} readings\n", day.date, day.readings));
        }
    }
    out
}

/// One line per archive: age, kind, model and the first response line.
pub fn render_history(entries: &[AnalysisEntry], now: NaiveDateTime) -> String {
    if entries.is_empty() {
        return "No analyses archived yet.\n".to_string();
    }

    let mut out = String::new();
    for (i, entry) in entries.iter().enumerate() {
        let record = &entry.record;
        let idx = format!("{:>3}. ", i + 1);
        let kind = format!("{:<width$}", record.kind.as_str(), width = KIND_WIDTH);
        let first_line = record.response.lines().next().unwrap_or("").trim();
        let preview = format!("[{}] {}", record.model, first_line);

        let fixed = idx.width() + kind.width() + TIME_WIDTH + 1;
        let available = LINE_WIDTH.saturating_sub(fixed);
        let preview = truncate_to_width(&preview, available);
        let padding = available.saturating_sub(preview.width());

        out.push_str(&format!(
            "{}{}{}{} {}\n",
            idx,
            kind,
            preview,
            " ".repeat(padding),
            format_time_ago(record.timestamp, now)
        ));
    }
    out
}

pub fn render_analysis(record: &AnalysisRecord) -> String {
    format!(
        "{} {} ({})\n{}\n{}\n",
        record.kind.as_str().to_uppercase(),
        record.timestamp.format("%Y-%m-%d %H:%M:%S"),
        record.model,
        RULE,
        record.response.trim_end()
    )
}

pub fn render_building(building: &BuildingRecord) -> String {
    building.summary()
}

pub fn render_config(config: &KlimaConfig) -> String {
    KEYS.iter()
        .filter_map(|key| config.get(key).map(|value| format!("{} = {}\n", key, value)))
        .collect()
}

pub fn print_status(result: &CmdResult) {
    print!("{}", render_status(result));
}

pub fn print_history(entries: &[AnalysisEntry]) {
    print!("{}", render_history(entries, Local::now().naive_local()));
}

pub fn print_analysis(record: &AnalysisRecord) {
    let rendered = render_analysis(record);
    let mut lines = rendered.lines();
    if let Some(title) = lines.next() {
        println!("{}", title.bold());
    }
    for line in lines {
        println!("{}", line);
    }
}

pub fn print_building(building: &BuildingRecord) {
    let rendered = render_building(building);
    let mut lines = rendered.lines();
    if let Some(address) = lines.next() {
        println!("{}", address.bold());
    }
    for line in lines {
        println!("{}", line);
    }
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }

    result
}

fn format_time_ago(timestamp: NaiveDateTime, now: NaiveDateTime) -> String {
    let duration = now.signed_duration_since(timestamp);

    let formatter = Formatter::new();
    let time_str = formatter.convert(duration.to_std().unwrap_or_default());

    format!("{:>width$}", time_str, width = TIME_WIDTH)
}
