use crate::commands::{CmdMessage, CmdResult, KlimaPaths};
use crate::config::KlimaConfig;
use crate::error::{KlimaError, Result};
use std::fs;

/// Creates the data directory layout and a default `config.json`.
/// Existing files are left alone.
pub fn run(paths: &KlimaPaths) -> Result<CmdResult> {
    let root = &paths.data_dir;
    for dir in [root.clone(), root.join("daily"), root.join("analyses")] {
        fs::create_dir_all(&dir).map_err(|e| {
            KlimaError::Store(format!("cannot create {}: {}", dir.display(), e))
        })?;
    }

    let mut result = CmdResult::default();
    if root.join("config.json").exists() {
        result.add_message(CmdMessage::info("Keeping existing config.json"));
    } else {
        KlimaConfig::default().save(root)?;
        result.add_message(CmdMessage::info("Wrote default config.json"));
    }
    result.add_message(CmdMessage::success(format!(
        "Data directory ready at {}",
        root.display()
    )));
    Ok(result)
}
