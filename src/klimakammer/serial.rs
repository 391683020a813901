//! Serial side of the acquisition loop.
//!
//! The sensor prints one `"<temperature>,<humidity>\n"` line per measurement.
//! [`parse_line`] validates such a line; [`Connector`] and [`LineSource`] are
//! the ports the loop drives, with [`SerialPortConnector`] as the production
//! adapter over the `serialport` crate.

use crate::error::Result;
use std::io::{self, BufRead, BufReader};
use std::time::Duration;
use thiserror::Error;

pub const TEMPERATURE_RANGE: (f64, f64) = (-50.0, 80.0);
pub const HUMIDITY_RANGE: (f64, f64) = (0.0, 100.0);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LineError {
    #[error("empty line")]
    Empty,

    #[error("expected `<temperature>,<humidity>`, got {0:?}")]
    Shape(String),

    #[error("not a number: {0:?}")]
    NotANumber(String),

    #[error("temperature out of range: {0}°C")]
    TemperatureRange(f64),

    #[error("humidity out of range: {0}%")]
    HumidityRange(f64),
}

/// Parses a sensor line into `(temperature, humidity)`.
pub fn parse_line(line: &str) -> std::result::Result<(f64, f64), LineError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(LineError::Empty);
    }

    let mut fields = line.split(',');
    let (temp_raw, humidity_raw) = match (fields.next(), fields.next(), fields.next()) {
        (Some(t), Some(h), None) => (t.trim(), h.trim()),
        _ => return Err(LineError::Shape(line.to_string())),
    };

    let temperature = parse_field(temp_raw)?;
    let humidity = parse_field(humidity_raw)?;

    if !(TEMPERATURE_RANGE.0..=TEMPERATURE_RANGE.1).contains(&temperature) {
        return Err(LineError::TemperatureRange(temperature));
    }
    if !(HUMIDITY_RANGE.0..=HUMIDITY_RANGE.1).contains(&humidity) {
        return Err(LineError::HumidityRange(humidity));
    }

    Ok((temperature, humidity))
}

fn parse_field(raw: &str) -> std::result::Result<f64, LineError> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(LineError::NotANumber(raw.to_string())),
    }
}

/// An open, line-oriented sensor connection.
pub trait LineSource {
    /// Blocks until one line arrives. Errors mean the link is unusable.
    fn read_line(&mut self) -> io::Result<String>;

    /// Drops input that arrived since the last read, so the next line is fresh.
    fn discard_pending(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Opens sensor connections. Called once at startup and once per
/// reconnect attempt.
pub trait Connector {
    type Source: LineSource;

    fn open(&mut self) -> Result<Self::Source>;

    /// Human readable target, for logs.
    fn describe(&self) -> String;
}

pub struct SerialPortConnector {
    port: String,
    baud_rate: u32,
    timeout: Duration,
}

impl SerialPortConnector {
    pub fn new(port: impl Into<String>, baud_rate: u32, timeout: Duration) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            timeout,
        }
    }
}

impl Connector for SerialPortConnector {
    type Source = SerialLine;

    fn open(&mut self) -> Result<SerialLine> {
        let port = serialport::new(&self.port, self.baud_rate)
            .timeout(self.timeout)
            .open()?;
        Ok(SerialLine {
            reader: BufReader::new(port),
            resync: true,
        })
    }

    fn describe(&self) -> String {
        format!("{} @ {} baud", self.port, self.baud_rate)
    }
}

pub struct SerialLine {
    reader: BufReader<Box<dyn serialport::SerialPort>>,
    /// The next line may start mid-transmission and is skipped.
    resync: bool,
}

impl SerialLine {
    fn next_raw_line(&mut self) -> io::Result<String> {
        let mut buf = Vec::new();
        let read = self.reader.read_until(b'\n', &mut buf)?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "serial port closed",
            ));
        }
        Ok(String::from_utf8_lossy(&buf).trim().to_string())
    }
}

impl LineSource for SerialLine {
    fn read_line(&mut self) -> io::Result<String> {
        if self.resync {
            let partial = self.next_raw_line()?;
            log::trace!("skipped partial line {:?}", partial);
            self.resync = false;
        }
        self.next_raw_line()
    }

    fn discard_pending(&mut self) -> io::Result<()> {
        let buffered = self.reader.buffer().len();
        self.reader.consume(buffered);
        self.reader
            .get_ref()
            .clear(serialport::ClearBuffer::Input)
            .map_err(io::Error::from)?;
        self.resync = true;
        Ok(())
    }
}
