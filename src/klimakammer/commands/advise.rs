//! Advisory analyses: gather context, render the prompt, ask the inference
//! API, archive the exchange.
//!
//! Nothing is archived unless the inference call succeeds.

use crate::clock::Clock;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::{KlimaError, Result};
use crate::inference::InferenceClient;
use crate::model::{AnalysisKind, AnalysisRecord, Reading};
use crate::prompt::PromptBuilder;
use crate::registry::BuildingRecord;
use crate::stats::ReadingStats;
use crate::store::DataStore;
use chrono::{Days, SubsecRound};

/// Longest trend window a caller may ask for.
pub const MAX_TREND_DAYS: u32 = 366;

/// Collaborators every analysis needs.
pub struct Advisor<'a> {
    pub inference: &'a dyn InferenceClient,
    pub prompts: &'a PromptBuilder,
    pub clock: &'a dyn Clock,
}

/// The snapshot an analysis of current conditions is based on.
pub fn current_reading<S: DataStore>(store: &S) -> Result<Reading> {
    store.current_reading()?.ok_or_else(|| {
        KlimaError::NoData("no current reading; is the logger running?".to_string())
    })
}

pub fn current<S: DataStore>(
    store: &mut S,
    advisor: &Advisor<'_>,
    reading: &Reading,
    address: Option<&str>,
    building: Option<&BuildingRecord>,
) -> Result<CmdResult> {
    let kind = if building.is_some() {
        AnalysisKind::CurrentConditionsRegistry
    } else {
        AnalysisKind::CurrentConditions
    };
    let prompt = advisor.prompts.current(reading, address, building)?;

    let mut result = CmdResult::default().with_reading(reading.clone());
    result.add_message(CmdMessage::info(format!(
        "Current reading: {:.1}°C, {:.1}% at {}",
        reading.temperature,
        reading.humidity,
        reading.formatted_timestamp()
    )));
    Ok(result.merge(ask_and_archive(store, advisor, kind, prompt)?))
}

/// Trend over the last `days` calendar days, today inclusive.
pub fn trend<S: DataStore>(
    store: &mut S,
    advisor: &Advisor<'_>,
    days: u32,
    address: Option<&str>,
    building: Option<&BuildingRecord>,
) -> Result<CmdResult> {
    if days > MAX_TREND_DAYS {
        return Err(KlimaError::Parse(format!(
            "trend window of {} days exceeds the maximum of {}",
            days, MAX_TREND_DAYS
        )));
    }
    let days = days.max(1);
    let today = advisor.clock.now().date_naive();

    let mut all = Vec::new();
    let mut per_day = Vec::new();
    for offset in (0..days).rev() {
        let date = today
            .checked_sub_days(Days::new(u64::from(offset)))
            .ok_or_else(|| {
                KlimaError::Parse(format!("{} days before {} is out of range", offset, today))
            })?;
        let readings = store.daily_readings(date)?;
        if let Some(stats) = ReadingStats::from_readings(&readings) {
            per_day.push((date, stats));
            all.extend(readings);
        }
    }

    let overall = ReadingStats::from_readings(&all).ok_or_else(|| {
        KlimaError::NoData(format!("no readings in the last {} day(s)", days))
    })?;
    let prompt = advisor
        .prompts
        .trend(days, &overall, &per_day, address, building)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::info(format!(
        "Analysing {} readings from {} of the last {} day(s)",
        overall.count,
        per_day.len(),
        days
    )));
    Ok(result.merge(ask_and_archive(
        store,
        advisor,
        AnalysisKind::for_trend(days),
        prompt,
    )?))
}

fn ask_and_archive<S: DataStore>(
    store: &mut S,
    advisor: &Advisor<'_>,
    kind: AnalysisKind,
    prompt: String,
) -> Result<CmdResult> {
    log::info!("requesting {} analysis from {}", kind, advisor.inference.model());
    let response = advisor.inference.complete(&prompt)?;

    let record = AnalysisRecord {
        timestamp: advisor.clock.now().trunc_subsecs(0).naive_local(),
        model: advisor.inference.model().to_string(),
        kind,
        prompt,
        response,
    };
    let path = store.save_analysis(&record)?;

    let mut result = CmdResult::default().with_analysis(record, path.clone());
    result.add_message(CmdMessage::success(format!(
        "Analysis saved to {}",
        path.display()
    )));
    Ok(result)
}
