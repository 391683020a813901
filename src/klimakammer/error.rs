use crate::inference::InferenceError;
use crate::serial::LineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KlimaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Serial port error: {0}")]
    Serial(String),

    #[error("Malformed sensor line: {0}")]
    Line(#[from] LineError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No data available: {0}")]
    NoData(String),

    #[error("Building registry error: {0}")]
    Registry(String),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Store error: {0}")]
    Store(String),
}

impl From<serialport::Error> for KlimaError {
    fn from(err: serialport::Error) -> Self {
        KlimaError::Serial(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, KlimaError>;
