use crate::api::KlimaApi;
use crate::commands::KlimaPaths;
use crate::config::{KlimaConfig, Secrets};
use crate::error::Result;
use crate::inference::OpenAiClient;
use crate::registry::http::DawaBbrRegistry;
use crate::serial::SerialPortConnector;
use crate::store::fs::FileStore;
use std::env;
use std::path::PathBuf;

pub const HOME_VAR: &str = "KLIMA_HOME";
const DEFAULT_DATA_DIR: &str = "sensordata";

pub struct KlimaContext {
    pub api: KlimaApi<FileStore>,
    pub config: KlimaConfig,
}

impl KlimaContext {
    /// Serial connector from config, with an optional port override.
    pub fn connector(&self, port: Option<&str>) -> SerialPortConnector {
        SerialPortConnector::new(
            port.unwrap_or(&self.config.serial_port),
            self.config.baud_rate,
            self.config.read_timeout(),
        )
    }
}

/// `--data-dir` wins, then `KLIMA_HOME`, then `./sensordata`.
pub fn resolve_data_dir(cli: Option<PathBuf>) -> PathBuf {
    pick_data_dir(cli, env::var_os(HOME_VAR).map(PathBuf::from))
}

fn pick_data_dir(cli: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    cli.or(home.filter(|p| !p.as_os_str().is_empty()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Builds the API over the file store in `data_dir`. Clients whose
/// credentials are missing are left out; the commands that need them
/// report it when called.
pub fn initialize(data_dir: PathBuf, secrets: &Secrets) -> Result<KlimaContext> {
    let config = KlimaConfig::load(&data_dir)?;

    let store = FileStore::new(data_dir.clone()).with_window_size(config.window_size);
    let paths = KlimaPaths { data_dir };
    let mut api = KlimaApi::new(store, paths)?;

    match &secrets.openai_api_key {
        Some(key) => {
            let client = OpenAiClient::new(
                &config.inference_base_url,
                key.clone(),
                config.completion_settings(),
            )?;
            api = api.with_inference(Box::new(client));
        }
        None => log::debug!("no inference key; analyses disabled"),
    }

    match secrets.registry_credentials() {
        Some((user, password)) => {
            let registry =
                DawaBbrRegistry::new(&config.dawa_base_url, &config.bbr_base_url, user, password)?;
            api = api.with_registry(Box::new(registry));
        }
        None => log::debug!("no registry credentials; building lookups disabled"),
    }

    Ok(KlimaContext { api, config })
}
