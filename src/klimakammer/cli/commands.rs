//! # CLI Layer
//!
//! This module is **one possible UI client** for klimakammer. It is the
//! **only** place in the codebase that:
//! - Knows about terminal I/O (stdout, stderr, stdin for the menu)
//! - Installs the Ctrl-C / SIGTERM handler and the logger
//! - Handles argument parsing
//! - Formats output for human consumption
//!
//! ## Structure
//!
//! - `run()`: Main dispatch logic (called by `main.rs`)
//! - `handle_*()`: Per-command handlers that call the API and print the result
//! - `hint()`: Remediation advice printed under fatal errors

use super::menu::{run_menu, StdinPrompter};
use super::render::{
    print_analysis, print_building, print_history, print_messages, print_status, render_config,
    render_reading,
};
use super::setup::{AdviseCommands, Cli, Commands};
use clap::Parser;
use colored::Colorize;
use klimakammer::api::AdvisorySession;
use klimakammer::commands::config::ConfigAction;
use klimakammer::commands::CmdResult;
use klimakammer::config::{Secrets, OPENAI_KEY_VAR, REGISTRY_PASSWORD_VAR, REGISTRY_USER_VAR};
use klimakammer::error::{KlimaError, Result};
use klimakammer::inference::InferenceError;
use klimakammer::init::{initialize, resolve_data_dir, KlimaContext};
use log::LevelFilter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let data_dir = resolve_data_dir(cli.data_dir);
    log::debug!("data directory: {}", data_dir.display());
    let mut ctx = initialize(data_dir, &Secrets::from_env())?;

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Log { port, interval } => handle_log(&mut ctx, port, interval),
        Commands::Read { port } => handle_read(&mut ctx, port),
        Commands::Status => handle_status(&ctx),
        Commands::Menu { address } => handle_menu(&mut ctx, address),
        Commands::Advise(AdviseCommands::Current { address }) => {
            handle_advise_current(&mut ctx, address)
        }
        Commands::Advise(AdviseCommands::Trend { days, address }) => {
            handle_advise_trend(&mut ctx, days, address)
        }
        Commands::Building { address } => handle_building(&ctx, address.join(" ")),
        Commands::History { limit } => handle_history(&ctx, limit),
        Commands::Latest => handle_latest(&ctx),
        Commands::Doctor => handle_doctor(&mut ctx),
        Commands::Config { key, value } => handle_config(&ctx, key, value),
        Commands::Init => handle_init(&ctx),
    }
}

/// `RUST_LOG` wins over the default level.
fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

/// Prints an error and, when there is one, what to do about it.
pub fn print_error(err: &KlimaError) {
    eprintln!("{} {}", "Error:".red(), err);
    if let Some(hint) = hint(err) {
        eprintln!("{}", hint.yellow());
    }
}

pub fn hint(err: &KlimaError) -> Option<String> {
    match err {
        KlimaError::Serial(_) => Some(
            "Check that the sensor is connected, then point klimakammer at it with \
             `klimakammer config serial_port <port>` or `--port <port>`."
                .to_string(),
        ),
        KlimaError::NoData(_) => {
            Some("Record some readings first with `klimakammer log` or `klimakammer read`.".to_string())
        }
        KlimaError::Config(msg) if msg.contains(OPENAI_KEY_VAR) => Some(format!(
            "Export {} in the environment to enable analyses.",
            OPENAI_KEY_VAR
        )),
        KlimaError::Inference(InferenceError::Auth(_)) => {
            Some(format!("Check the key in {}.", OPENAI_KEY_VAR))
        }
        KlimaError::Inference(InferenceError::RateLimited(_)) => {
            Some("The inference API is rate limiting requests; try again shortly.".to_string())
        }
        KlimaError::Registry(_) => Some(format!(
            "Check {} and {} and the network connection.",
            REGISTRY_USER_VAR, REGISTRY_PASSWORD_VAR
        )),
        _ => None,
    }
}

fn handle_log(ctx: &mut KlimaContext, port: Option<String>, interval: Option<u64>) -> Result<()> {
    ctx.api.store().ensure_layout()?;
    let connector = ctx.connector(port.as_deref());
    let interval = interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| ctx.config.interval());

    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    // SIGINT, plus SIGTERM and SIGHUP through the `termination` feature.
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .map_err(|e| KlimaError::Config(format!("cannot install Ctrl-C handler: {}", e)))?;

    println!(
        "{}",
        format!(
            "Logging to {} every {}s. Press Ctrl-C to stop.",
            ctx.api.paths().data_dir.display(),
            interval.as_secs()
        )
        .dimmed()
    );
    let result = ctx.api.log(connector, interval, &stop)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_read(ctx: &mut KlimaContext, port: Option<String>) -> Result<()> {
    let connector = ctx.connector(port.as_deref());
    let result = ctx.api.read_once(connector)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_status(ctx: &KlimaContext) -> Result<()> {
    let result = ctx.api.status()?;
    print_status(&result);
    print_messages(&result.messages);
    Ok(())
}

fn handle_menu(ctx: &mut KlimaContext, address: Option<String>) -> Result<()> {
    let mut session = AdvisorySession::default();
    if let Some(address) = address {
        match ctx.api.set_address(&mut session, &address, false) {
            Ok(result) => print_messages(&result.messages),
            Err(e) => print_error(&e),
        }
    }
    if let Some(reading) = ctx.api.status()?.reading {
        println!("{}", format!("Latest reading: {}", render_reading(&reading)).dimmed());
    }

    run_menu(&mut ctx.api, &mut session, &mut StdinPrompter);
    Ok(())
}

pub(super) fn show_analysis(result: &CmdResult) {
    print_messages(&result.messages);
    if let Some(record) = &result.analysis {
        print_analysis(record);
    }
}

fn handle_advise_current(ctx: &mut KlimaContext, address: Option<String>) -> Result<()> {
    let mut session = AdvisorySession::new(address);
    let result = ctx.api.advise_current(&mut session)?;
    show_analysis(&result);
    Ok(())
}

fn handle_advise_trend(ctx: &mut KlimaContext, days: u32, address: Option<String>) -> Result<()> {
    let mut session = AdvisorySession::new(address);
    let result = ctx.api.advise_trend(&mut session, days)?;
    show_analysis(&result);
    Ok(())
}

fn handle_building(ctx: &KlimaContext, address: String) -> Result<()> {
    let mut session = AdvisorySession::default();
    let result = ctx.api.set_address(&mut session, &address, true)?;
    print_messages(&result.messages);
    if let Some(building) = &result.building {
        print_building(building);
    }
    Ok(())
}

fn handle_history(ctx: &KlimaContext, limit: Option<usize>) -> Result<()> {
    let result = ctx.api.history(limit)?;
    print_history(&result.analyses);
    print_messages(&result.messages);
    Ok(())
}

fn handle_latest(ctx: &KlimaContext) -> Result<()> {
    let result = ctx.api.latest_analysis()?;
    show_analysis(&result);
    Ok(())
}

fn handle_doctor(ctx: &mut KlimaContext) -> Result<()> {
    let result = ctx.api.doctor()?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_config(ctx: &KlimaContext, key: Option<String>, value: Option<String>) -> Result<()> {
    let action = match (key, value) {
        (None, _) => ConfigAction::ShowAll,
        (Some(key), None) => ConfigAction::ShowKey(key),
        (Some(key), Some(value)) => ConfigAction::Set(key, value),
    };

    let result = ctx.api.config(action)?;
    if let (Some(config), true) = (&result.config, result.messages.is_empty()) {
        print!("{}", render_config(config));
    }
    print_messages(&result.messages);
    Ok(())
}

fn handle_init(ctx: &KlimaContext) -> Result<()> {
    let result = ctx.api.init()?;
    print_messages(&result.messages);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_errors_get_a_hint() {
        let hint = hint(&KlimaError::Serial("No such file or directory".into())).unwrap();
        assert!(hint.contains("serial_port"));
    }

    #[test]
    fn test_missing_key_hint_names_the_variable() {
        let err = KlimaError::Config(format!("{} is not set; cannot request an analysis", OPENAI_KEY_VAR));
        assert!(hint(&err).unwrap().contains(OPENAI_KEY_VAR));
    }

    #[test]
    fn test_plain_errors_have_no_hint() {
        assert!(hint(&KlimaError::Parse("bad".into())).is_none());
        assert!(hint(&KlimaError::Config("other".into())).is_none());
    }
}
