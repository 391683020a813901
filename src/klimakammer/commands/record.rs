use crate::acquisition::{Acquisition, TickOutcome};
use crate::clock::Clock;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::{KlimaError, Result};
use crate::serial::Connector;
use crate::store::DataStore;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

/// Opens the sensor, takes one reading and stores it.
pub fn read_once<C: Connector, S: DataStore, K: Clock>(
    connector: C,
    store: S,
    clock: K,
) -> Result<CmdResult> {
    let mut acquisition = Acquisition::start(connector, store, clock)?;
    match acquisition.tick()? {
        TickOutcome::Recorded(reading) => {
            let mut result = CmdResult::default();
            result.add_message(CmdMessage::success(format!(
                "Reading saved: {:.1}°C, {:.1}% at {}",
                reading.temperature,
                reading.humidity,
                reading.formatted_timestamp()
            )));
            Ok(result.with_reading(reading))
        }
        TickOutcome::Rejected(e) => Err(KlimaError::Line(e)),
        TickOutcome::ReadFailed(msg) | TickOutcome::StillDisconnected(msg) => {
            Err(KlimaError::Serial(msg))
        }
    }
}

/// Runs the acquisition loop until `stop` is raised.
pub fn log<C: Connector, S: DataStore, K: Clock>(
    connector: C,
    store: S,
    clock: K,
    interval: Duration,
    stop: &AtomicBool,
) -> Result<CmdResult> {
    let mut acquisition = Acquisition::start(connector, store, clock)?;
    let counters = acquisition.run(interval, stop);

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::info("Logging stopped."));
    result.add_message(CmdMessage::info(format!(
        "Total readings: {}, errors: {}",
        counters.readings,
        counters.errors()
    )));
    Ok(result)
}
