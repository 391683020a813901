use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::store::DataStore;

/// Archived analyses, newest first, optionally capped.
pub fn run<S: DataStore>(store: &S, limit: Option<usize>) -> Result<CmdResult> {
    let mut entries = store.list_analyses()?;
    let total = entries.len();
    if let Some(limit) = limit {
        entries.truncate(limit);
    }

    let mut result = CmdResult::default();
    if entries.is_empty() {
        result.add_message(CmdMessage::info("No analyses archived yet."));
    } else if entries.len() < total {
        result.add_message(CmdMessage::info(format!(
            "Showing {} of {} analyses.",
            entries.len(),
            total
        )));
    }
    Ok(result.with_analyses(entries))
}

pub fn latest<S: DataStore>(store: &S) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    match store.latest_analysis()? {
        Some(record) => result.analysis = Some(record),
        None => result.add_message(CmdMessage::info("No analyses archived yet.")),
    }
    Ok(result)
}
