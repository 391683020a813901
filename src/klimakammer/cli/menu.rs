//! Interactive advisory menu.
//!
//! A loop over a fixed table of [`MenuChoice`]s. Each handler gets the API,
//! the advisory session and a [`Prompter`] explicitly; there is no other
//! state. A failing handler prints its error and the menu comes back.

use super::commands::{print_error, show_analysis};
use super::render::{print_building, print_history, print_messages, print_status};
use colored::Colorize;
use klimakammer::api::{AdvisorySession, KlimaApi};
use klimakammer::commands::advise::MAX_TREND_DAYS;
use klimakammer::error::{KlimaError, Result};
use klimakammer::store::DataStore;
use std::io::{self, BufRead, Write};

const DEFAULT_TREND_DAYS: u32 = 3;
const HISTORY_LIMIT: usize = 10;

/// Source of user answers. `None` means the input is exhausted.
pub trait Prompter {
    fn ask(&mut self, question: &str) -> Option<String>;
}

pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn ask(&mut self, question: &str) -> Option<String> {
        print!("{}", question);
        io::stdout().flush().ok()?;
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    CurrentAnalysis,
    TrendToday,
    TrendDays,
    BuildingDetails,
    ChangeAddress,
    DataSummary,
    History,
    Quit,
}

type Handler<S> = fn(&mut KlimaApi<S>, &mut AdvisorySession, &mut dyn Prompter) -> Result<()>;

impl MenuChoice {
    pub fn all() -> &'static [MenuChoice] {
        &[
            MenuChoice::CurrentAnalysis,
            MenuChoice::TrendToday,
            MenuChoice::TrendDays,
            MenuChoice::BuildingDetails,
            MenuChoice::ChangeAddress,
            MenuChoice::DataSummary,
            MenuChoice::History,
            MenuChoice::Quit,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            MenuChoice::CurrentAnalysis => "Analyse current conditions",
            MenuChoice::TrendToday => "Analyse today's trend",
            MenuChoice::TrendDays => "Analyse the trend over several days",
            MenuChoice::BuildingDetails => "Show building details",
            MenuChoice::ChangeAddress => "Change address",
            MenuChoice::DataSummary => "Data summary",
            MenuChoice::History => "Analysis history",
            MenuChoice::Quit => "Quit",
        }
    }

    /// Menu entries are numbered from 1; `q` also quits.
    pub fn parse(input: &str) -> Option<MenuChoice> {
        let input = input.trim();
        if input.eq_ignore_ascii_case("q") {
            return Some(MenuChoice::Quit);
        }
        let n: usize = input.parse().ok()?;
        Self::all().get(n.checked_sub(1)?).copied()
    }

    fn handler<S: DataStore>(self) -> Option<Handler<S>> {
        let handler: Handler<S> = match self {
            MenuChoice::CurrentAnalysis => current_analysis,
            MenuChoice::TrendToday => trend_today,
            MenuChoice::TrendDays => trend_days,
            MenuChoice::BuildingDetails => building_details,
            MenuChoice::ChangeAddress => change_address,
            MenuChoice::DataSummary => data_summary,
            MenuChoice::History => history,
            MenuChoice::Quit => return None,
        };
        Some(handler)
    }
}

pub fn run_menu<S: DataStore>(
    api: &mut KlimaApi<S>,
    session: &mut AdvisorySession,
    prompter: &mut dyn Prompter,
) {
    loop {
        print_menu(session);
        let Some(input) = prompter.ask("Select an option: ") else {
            break;
        };
        let Some(choice) = MenuChoice::parse(&input) else {
            println!("{}", format!("Unknown option: {}", input).yellow());
            continue;
        };
        let Some(handler) = choice.handler::<S>() else {
            break;
        };
        if let Err(e) = handler(api, session, prompter) {
            print_error(&e);
        }
    }
}

fn print_menu(session: &AdvisorySession) {
    println!();
    println!("{}", "Klimakammer".bold());
    match (session.address(), session.building()) {
        (Some(address), Some(_)) => println!("{}", format!("Address: {} (registry data)", address).dimmed()),
        (Some(address), None) => println!("{}", format!("Address: {}", address).dimmed()),
        (None, _) => println!("{}", "No address set".dimmed()),
    }
    for (i, choice) in MenuChoice::all().iter().enumerate() {
        println!("  {}. {}", i + 1, choice.label());
    }
}

fn current_analysis<S: DataStore>(
    api: &mut KlimaApi<S>,
    session: &mut AdvisorySession,
    _: &mut dyn Prompter,
) -> Result<()> {
    show_analysis(&api.advise_current(session)?);
    Ok(())
}

fn trend_today<S: DataStore>(
    api: &mut KlimaApi<S>,
    session: &mut AdvisorySession,
    _: &mut dyn Prompter,
) -> Result<()> {
    show_analysis(&api.advise_trend(session, 1)?);
    Ok(())
}

fn trend_days<S: DataStore>(
    api: &mut KlimaApi<S>,
    session: &mut AdvisorySession,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    let answer = prompter
        .ask(&format!("Number of days [{}]: ", DEFAULT_TREND_DAYS))
        .unwrap_or_default();
    let days = parse_days(&answer)?;
    show_analysis(&api.advise_trend(session, days)?);
    Ok(())
}

fn parse_days(answer: &str) -> Result<u32> {
    let answer = answer.trim();
    if answer.is_empty() {
        return Ok(DEFAULT_TREND_DAYS);
    }
    match answer.parse::<u32>() {
        Ok(days) if (1..=MAX_TREND_DAYS).contains(&days) => Ok(days),
        _ => Err(KlimaError::Parse(format!(
            "number of days must be a whole number from 1 to {}, got '{}'",
            MAX_TREND_DAYS, answer
        ))),
    }
}

fn building_details<S: DataStore>(
    api: &mut KlimaApi<S>,
    session: &mut AdvisorySession,
    _: &mut dyn Prompter,
) -> Result<()> {
    let result = api.building_details(session)?;
    print_messages(&result.messages);
    if let Some(building) = &result.building {
        print_building(building);
    }
    Ok(())
}

fn change_address<S: DataStore>(
    api: &mut KlimaApi<S>,
    session: &mut AdvisorySession,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    let answer = prompter
        .ask("Address (empty to clear): ")
        .unwrap_or_default();
    let result = api.set_address(session, &answer, false)?;
    print_messages(&result.messages);
    Ok(())
}

fn data_summary<S: DataStore>(
    api: &mut KlimaApi<S>,
    _: &mut AdvisorySession,
    _: &mut dyn Prompter,
) -> Result<()> {
    let result = api.status()?;
    print_status(&result);
    print_messages(&result.messages);
    Ok(())
}

fn history<S: DataStore>(
    api: &mut KlimaApi<S>,
    _: &mut AdvisorySession,
    _: &mut dyn Prompter,
) -> Result<()> {
    let result = api.history(Some(HISTORY_LIMIT))?;
    print_history(&result.analyses);
    print_messages(&result.messages);
    Ok(())
}
