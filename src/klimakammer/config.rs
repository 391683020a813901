use crate::error::{KlimaError, Result};
use crate::inference::CompletionSettings;
use crate::store::DEFAULT_WINDOW_SIZE;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

const CONFIG_FILENAME: &str = "config.json";

pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";
pub const REGISTRY_USER_VAR: &str = "DATAFORDELER_NO_CERT_USERNAME";
pub const REGISTRY_PASSWORD_VAR: &str = "DATAFORDELER_NO_CERT_PASSWORD";

/// Keys accepted by `config get/set`, in display order.
pub const KEYS: &[&str] = &[
    "serial_port",
    "baud_rate",
    "read_timeout_secs",
    "interval_secs",
    "window_size",
    "model",
    "inference_base_url",
    "max_tokens",
    "temperature",
    "dawa_base_url",
    "bbr_base_url",
];

/// Configuration, stored in `<data_dir>/config.json`. Secrets never live
/// here; see [`Secrets`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KlimaConfig {
    pub serial_port: String,
    pub baud_rate: u32,
    pub read_timeout_secs: u64,
    /// Seconds between acquisition ticks
    pub interval_secs: u64,
    /// Rolling window length
    pub window_size: usize,
    pub model: String,
    pub inference_base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub dawa_base_url: String,
    pub bbr_base_url: String,
}

impl Default for KlimaConfig {
    fn default() -> Self {
        Self {
            serial_port: "/dev/cu.usbserial-0001".to_string(),
            baud_rate: 115_200,
            read_timeout_secs: 5,
            interval_secs: 60,
            window_size: DEFAULT_WINDOW_SIZE,
            model: "gpt-4".to_string(),
            inference_base_url: "https://api.openai.com/v1".to_string(),
            max_tokens: 1000,
            temperature: 0.3,
            dawa_base_url: "https://api.dataforsyningen.dk".to_string(),
            bbr_base_url: "https://services.datafordeler.dk".to_string(),
        }
    }
}

impl KlimaConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let config_path = data_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(KlimaError::Io)?;
        let config: KlimaConfig =
            serde_json::from_str(&content).map_err(KlimaError::Serialization)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, data_dir: P) -> Result<()> {
        let data_dir = data_dir.as_ref();
        if !data_dir.exists() {
            fs::create_dir_all(data_dir).map_err(KlimaError::Io)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(KlimaError::Serialization)?;
        fs::write(data_dir.join(CONFIG_FILENAME), content).map_err(KlimaError::Io)?;
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn completion_settings(&self) -> CompletionSettings {
        CompletionSettings {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "serial_port" => self.serial_port.clone(),
            "baud_rate" => self.baud_rate.to_string(),
            "read_timeout_secs" => self.read_timeout_secs.to_string(),
            "interval_secs" => self.interval_secs.to_string(),
            "window_size" => self.window_size.to_string(),
            "model" => self.model.clone(),
            "inference_base_url" => self.inference_base_url.clone(),
            "max_tokens" => self.max_tokens.to_string(),
            "temperature" => self.temperature.to_string(),
            "dawa_base_url" => self.dawa_base_url.clone(),
            "bbr_base_url" => self.bbr_base_url.clone(),
            _ => return None,
        };
        Some(value)
    }

    pub fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), String> {
        fn number<T: std::str::FromStr>(key: &str, value: &str) -> std::result::Result<T, String> {
            value
                .trim()
                .parse::<T>()
                .map_err(|_| format!("Invalid value for {}: {}", key, value))
        }

        match key {
            "serial_port" => self.serial_port = value.to_string(),
            "baud_rate" => self.baud_rate = number(key, value)?,
            "read_timeout_secs" => self.read_timeout_secs = number(key, value)?,
            "interval_secs" => {
                let secs: u64 = number(key, value)?;
                if secs == 0 {
                    return Err("interval_secs must be at least 1".to_string());
                }
                self.interval_secs = secs;
            }
            "window_size" => {
                let size: usize = number(key, value)?;
                if size == 0 {
                    return Err("window_size must be at least 1".to_string());
                }
                self.window_size = size;
            }
            "model" => self.model = value.to_string(),
            "inference_base_url" => self.inference_base_url = value.to_string(),
            "max_tokens" => self.max_tokens = number(key, value)?,
            "temperature" => {
                let t: f32 = number(key, value)?;
                if !(0.0..=2.0).contains(&t) {
                    return Err("temperature must be between 0 and 2".to_string());
                }
                self.temperature = t;
            }
            "dawa_base_url" => self.dawa_base_url = value.to_string(),
            "bbr_base_url" => self.bbr_base_url = value.to_string(),
            _ => return Err(format!("Unknown config key: {}", key)),
        }
        Ok(())
    }
}

/// Credentials read from the environment.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub openai_api_key: Option<String>,
    pub registry_user: Option<String>,
    pub registry_password: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        let var = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            openai_api_key: var(OPENAI_KEY_VAR),
            registry_user: var(REGISTRY_USER_VAR),
            registry_password: var(REGISTRY_PASSWORD_VAR),
        }
    }

    pub fn registry_credentials(&self) -> Option<(String, String)> {
        match (&self.registry_user, &self.registry_password) {
            (Some(user), Some(password)) => Some((user.clone(), password.clone())),
            _ => None,
        }
    }
}
