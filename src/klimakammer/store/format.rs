//! Text layouts of the persisted artifacts.
//!
//! Every render function has a matching parse function so the store can read
//! back what it wrote (and `doctor` can rebuild caches from archives).

use crate::error::{KlimaError, Result};
use crate::model::{unix_seconds, AnalysisKind, AnalysisRecord, Reading, TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;
use std::collections::HashMap;

pub const DAILY_HEADER: [&str; 4] = ["timestamp", "temperature", "humidity", "unix_timestamp"];

const BANNER: &str = "============================================================";
const RULE: &str = "------------------------------------------------------------";
const WINDOW_COLUMNS: &str = "# Latest sensor readings (timestamp,temperature,humidity,unix_timestamp)";

// --- Current snapshot ---

pub fn render_snapshot(reading: &Reading) -> String {
    format!(
        "Last Updated: {}\nTemperature: {}°C\nHumidity: {}%\nUnix Timestamp: {}\n",
        reading.formatted_timestamp(),
        reading.temperature,
        reading.humidity,
        reading.unix_timestamp
    )
}

pub fn parse_snapshot(text: &str) -> Result<Reading> {
    let fields: HashMap<&str, &str> = text
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect();

    let field = |key: &str| {
        fields
            .get(key)
            .copied()
            .ok_or_else(|| KlimaError::Parse(format!("snapshot is missing `{}`", key)))
    };

    let timestamp = parse_timestamp(field("Last Updated")?)?;
    let temperature = parse_number(field("Temperature")?.trim_end_matches("°C"))?;
    let humidity = parse_number(field("Humidity")?.trim_end_matches('%'))?;
    let unix_timestamp = parse_unix(field("Unix Timestamp")?)?;

    Ok(Reading {
        timestamp,
        temperature,
        humidity,
        unix_timestamp,
    })
}

// --- Rolling window ---

pub fn format_row(reading: &Reading) -> String {
    format!(
        "{},{},{},{}",
        reading.formatted_timestamp(),
        reading.temperature,
        reading.humidity,
        reading.unix_timestamp
    )
}

/// Parses a window line. Older files carry no unix column; it is then
/// derived from the local wall-clock stamp.
pub fn parse_row(line: &str) -> Result<Reading> {
    let parts: Vec<&str> = line.trim().split(',').map(str::trim).collect();
    let (timestamp, temperature, humidity, unix) = match parts.as_slice() {
        [ts, t, h] => (*ts, *t, *h, None),
        [ts, t, h, u] => (*ts, *t, *h, Some(*u)),
        _ => return Err(KlimaError::Parse(format!("malformed reading line: {:?}", line))),
    };

    let timestamp = parse_timestamp(timestamp)?;
    let unix_timestamp = match unix {
        Some(raw) => parse_unix(raw)?,
        None => Reading::unix_from_local(&timestamp),
    };

    Ok(Reading {
        timestamp,
        temperature: parse_number(temperature)?,
        humidity: parse_number(humidity)?,
        unix_timestamp,
    })
}

pub fn render_window(readings: &[Reading], updated: &NaiveDateTime) -> String {
    let mut out = String::new();
    out.push_str(WINDOW_COLUMNS);
    out.push('\n');
    out.push_str(&format!("# Updated: {}\n", updated.format(TIMESTAMP_FORMAT)));
    for reading in readings {
        out.push_str(&format_row(reading));
        out.push('\n');
    }
    out
}

/// Lines that fail to parse are skipped; the window is a cache.
pub fn parse_window(text: &str) -> Vec<Reading> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| match parse_row(line) {
            Ok(reading) => Some(reading),
            Err(e) => {
                log::warn!("dropping unreadable window line: {}", e);
                None
            }
        })
        .collect()
}

// --- Analysis archive and latest pointer ---

fn prompt_marker() -> String {
    format!("{RULE}\nPROMPT:\n{RULE}\n")
}

fn response_marker() -> String {
    format!("\n\n{RULE}\nRESPONSE:\n{RULE}\n")
}

/// Body shared by the dated archive and the latest pointer.
pub fn render_payload(record: &AnalysisRecord) -> String {
    format!(
        "Timestamp: {}\nModel: {}\nKind: {}\n\n{}{}{}{}\n",
        record.timestamp.format(TIMESTAMP_FORMAT),
        record.model,
        record.kind,
        prompt_marker(),
        record.prompt,
        response_marker(),
        record.response
    )
}

pub fn render_archive(record: &AnalysisRecord) -> String {
    format!(
        "{BANNER}\nCLIMATE ANALYSIS - {}\n{BANNER}\n{}\n{BANNER}\n",
        record.kind.as_str().to_uppercase(),
        render_payload(record)
    )
}

pub fn parse_archive(text: &str) -> Result<AnalysisRecord> {
    let mut rest = text;
    for _ in 0..3 {
        rest = rest
            .split_once('\n')
            .map(|(_, tail)| tail)
            .ok_or_else(|| KlimaError::Parse("archive header is truncated".to_string()))?;
    }
    let footer = format!("\n{BANNER}\n");
    let payload = rest.strip_suffix(footer.as_str()).unwrap_or(rest);
    parse_payload(payload)
}

pub fn parse_payload(text: &str) -> Result<AnalysisRecord> {
    let prompt_marker = prompt_marker();
    let response_marker = response_marker();

    let (head, body) = text
        .split_once(prompt_marker.as_str())
        .ok_or_else(|| KlimaError::Parse("analysis has no prompt block".to_string()))?;
    let (prompt, response) = body
        .split_once(response_marker.as_str())
        .ok_or_else(|| KlimaError::Parse("analysis has no response block".to_string()))?;

    let fields: HashMap<&str, &str> = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect();

    let timestamp = fields
        .get("Timestamp")
        .ok_or_else(|| KlimaError::Parse("analysis has no timestamp".to_string()))
        .and_then(|raw| parse_timestamp(raw))?;
    let model = fields.get("Model").copied().unwrap_or_default().to_string();
    let kind = fields
        .get("Kind")
        .ok_or_else(|| KlimaError::Parse("analysis has no kind".to_string()))?
        .parse::<AnalysisKind>()
        .map_err(KlimaError::Parse)?;

    Ok(AnalysisRecord {
        timestamp,
        model,
        kind,
        prompt: prompt.to_string(),
        response: response.strip_suffix('\n').unwrap_or(response).to_string(),
    })
}

// --- Field helpers ---

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
        .map_err(|e| KlimaError::Parse(format!("bad timestamp {:?}: {}", raw, e)))
}

fn parse_number(raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| KlimaError::Parse(format!("bad number {:?}", raw)))
}

/// Accepts integer seconds, and the fractional seconds older loggers wrote.
fn parse_unix(raw: &str) -> Result<i64> {
    unix_seconds::parse(raw).ok_or_else(|| KlimaError::Parse(format!("bad unix timestamp {:?}", raw)))
}
