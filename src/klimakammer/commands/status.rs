use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::stats::ReadingStats;
use crate::store::DataStore;

/// Number of daily logs shown in the data summary.
pub const RECENT_DAYS: usize = 7;

/// Latest reading, rolling window size and the newest daily logs.
pub fn run<S: DataStore>(store: &S) -> Result<CmdResult> {
    let mut result = CmdResult::default();

    match store.current_reading()? {
        Some(reading) => result.reading = Some(reading),
        None => result.add_message(CmdMessage::warning(
            "No current reading yet. Start the logger with `klimakammer log`.",
        )),
    }

    let window = store.latest_readings()?;
    result.window_entries = Some(window.len());
    result.window_stats = ReadingStats::from_readings(&window);

    let mut days = store.daily_summaries()?;
    days.reverse();
    days.truncate(RECENT_DAYS);
    Ok(result.with_days(days))
}
