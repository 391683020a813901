use crate::commands::{CmdMessage, CmdResult, KlimaPaths};
use crate::config::KlimaConfig;
use crate::error::Result;

#[derive(Debug, Clone)]
pub enum ConfigAction {
    ShowAll,
    ShowKey(String),
    Set(String, String),
}

/// Shows or updates `config.json`. Unknown keys and invalid values are
/// reported as messages and leave the file untouched.
pub fn run(paths: &KlimaPaths, action: ConfigAction) -> Result<CmdResult> {
    let dir = &paths.data_dir;
    let mut config = KlimaConfig::load(dir)?;

    let message = match action {
        ConfigAction::ShowAll => return Ok(CmdResult::default().with_config(config)),
        ConfigAction::ShowKey(key) => config
            .get(&key)
            .map(CmdMessage::info)
            .unwrap_or_else(|| CmdMessage::error(format!("Unknown config key: {}", key))),
        ConfigAction::Set(key, value) => {
            if let Err(reason) = config.set(&key, &value) {
                let mut rejected = CmdResult::default();
                rejected.add_message(CmdMessage::error(reason));
                return Ok(rejected);
            }
            config.save(dir)?;
            let stored = config.get(&key).unwrap_or(value);
            let mut updated = CmdResult::default().with_config(config);
            updated.add_message(CmdMessage::success(format!("{} set to {}", key, stored)));
            return Ok(updated);
        }
    };

    let mut result = CmdResult::default();
    result.add_message(message);
    Ok(result)
}
