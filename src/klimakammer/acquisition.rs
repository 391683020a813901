//! # Acquisition Loop
//!
//! Once per interval: read one sensor line, validate it, stamp it and apply
//! it to the store.
//!
//! The serial link is a two-state machine:
//!
//! ```text
//!            read error
//! Connected ───────────────▶ Disconnected
//!     ▲                          │
//!     └──────────────────────────┘
//!        reopen ok (read in the same tick)
//! ```
//!
//! A tick in `Disconnected` makes exactly one reopen attempt. There is no
//! backoff; the interval is the retry cadence. Opening the port at startup is
//! the only serial failure that is fatal.

use crate::clock::Clock;
use crate::error::Result;
use crate::model::Reading;
use crate::serial::{parse_line, Connector, LineError, LineSource};
use crate::store::DataStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Granularity of the interruptible sleep between ticks.
const SLEEP_SLICE: Duration = Duration::from_millis(200);

pub enum Link<S> {
    Connected(S),
    Disconnected,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    pub readings: u64,
    pub rejected: u64,
    pub read_failures: u64,
    pub write_failures: u64,
    pub reconnects: u64,
}

impl Counters {
    pub fn errors(&self) -> u64 {
        self.rejected + self.read_failures + self.write_failures
    }
}

#[derive(Debug, PartialEq)]
pub enum TickOutcome {
    Recorded(Reading),
    Rejected(LineError),
    ReadFailed(String),
    /// The reopen attempt of this tick failed.
    StillDisconnected(String),
}

pub struct Acquisition<C: Connector, S: DataStore, K: Clock> {
    connector: C,
    store: S,
    clock: K,
    link: Link<C::Source>,
    last: Option<Reading>,
    counters: Counters,
}

impl<C: Connector, S: DataStore, K: Clock> Acquisition<C, S, K> {
    /// Opens the sensor. Failure here is fatal for the logger.
    pub fn start(mut connector: C, store: S, clock: K) -> Result<Self> {
        let source = connector.open()?;
        log::info!("connected to {}", connector.describe());

        // Seed the monotonic stamp from the previous run.
        let last = match store.current_reading() {
            Ok(last) => last,
            Err(e) => {
                log::warn!("ignoring unreadable snapshot: {}", e);
                None
            }
        };

        Ok(Self {
            connector,
            store,
            clock,
            link: Link::Connected(source),
            last,
            counters: Counters::default(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.link, Link::Connected(_))
    }

    /// One acquisition attempt. Only a failed store write is an `Err`;
    /// serial trouble is reported through the outcome.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        if let Link::Disconnected = self.link {
            match self.connector.open() {
                Ok(source) => {
                    log::info!("reconnected to {}", self.connector.describe());
                    self.counters.reconnects += 1;
                    self.link = Link::Connected(source);
                }
                Err(e) => {
                    log::warn!("reopen of {} failed: {}", self.connector.describe(), e);
                    self.counters.read_failures += 1;
                    return Ok(TickOutcome::StillDisconnected(e.to_string()));
                }
            }
        }

        let read = match &mut self.link {
            Link::Connected(source) => source.discard_pending().and_then(|_| source.read_line()),
            Link::Disconnected => return Ok(TickOutcome::StillDisconnected("no link".to_string())),
        };

        let line = match read {
            Ok(line) => line,
            Err(e) => {
                log::warn!("serial read failed, dropping link: {}", e);
                self.link = Link::Disconnected;
                self.counters.read_failures += 1;
                return Ok(TickOutcome::ReadFailed(e.to_string()));
            }
        };

        let (temperature, humidity) = match parse_line(&line) {
            Ok(values) => values,
            Err(e) => {
                log::warn!("discarding sensor line {:?}: {}", line, e);
                self.counters.rejected += 1;
                return Ok(TickOutcome::Rejected(e));
            }
        };

        let reading = self.stamp(temperature, humidity);
        if let Err(e) = self.store.save_reading(&reading) {
            self.counters.write_failures += 1;
            return Err(e);
        }
        self.counters.readings += 1;
        self.last = Some(reading.clone());
        Ok(TickOutcome::Recorded(reading))
    }

    /// Stamps with the clock, never earlier than the previous reading.
    fn stamp(&self, temperature: f64, humidity: f64) -> Reading {
        let reading = Reading::new(self.clock.now(), temperature, humidity);
        match &self.last {
            Some(prev) if reading.unix_timestamp < prev.unix_timestamp => {
                log::warn!(
                    "clock stepped back to {}, reusing {}",
                    reading.formatted_timestamp(),
                    prev.formatted_timestamp()
                );
                Reading {
                    timestamp: prev.timestamp,
                    unix_timestamp: prev.unix_timestamp,
                    ..reading
                }
            }
            _ => reading,
        }
    }

    /// Ticks every `interval` until `stop` is raised, then drops the link.
    pub fn run(&mut self, interval: Duration, stop: &AtomicBool) -> Counters {
        log::info!("logging every {}s", interval.as_secs());

        while !stop.load(Ordering::SeqCst) {
            let started = Instant::now();
            match self.tick() {
                Ok(TickOutcome::Recorded(r)) => log::info!(
                    "reading #{}: {:.1}°C, {:.1}% at {}",
                    self.counters.readings,
                    r.temperature,
                    r.humidity,
                    r.formatted_timestamp()
                ),
                Ok(_) => log::debug!("tick without a reading ({} errors so far)", self.counters.errors()),
                Err(e) => log::error!("could not store reading: {}", e),
            }
            sleep_until_next(interval.saturating_sub(started.elapsed()), stop);
        }

        self.link = Link::Disconnected;
        log::info!(
            "stopped: {} readings, {} errors ({} rejected, {} read failures, {} write failures)",
            self.counters.readings,
            self.counters.errors(),
            self.counters.rejected,
            self.counters.read_failures,
            self.counters.write_failures
        );
        self.counters
    }
}

fn sleep_until_next(total: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + total;
    while !stop.load(Ordering::SeqCst) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        thread::sleep(remaining.min(SLEEP_SLICE));
    }
}
