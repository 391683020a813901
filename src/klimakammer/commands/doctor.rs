use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::store::DataStore;

pub fn run<S: DataStore>(store: &mut S) -> Result<CmdResult> {
    let report = store.doctor()?;
    let mut result = CmdResult::default();

    if !report.restored_snapshot && !report.restored_latest_analysis {
        result.add_message(CmdMessage::info("Nothing to rebuild: no daily logs or archives found."));
        return Ok(result);
    }

    result.add_message(CmdMessage::success("Caches rebuilt:"));
    if report.restored_snapshot {
        result.add_message(CmdMessage::info(format!(
            "  - current reading and rolling window ({} entries) from the daily logs",
            report.window_entries
        )));
    }
    if report.restored_latest_analysis {
        result.add_message(CmdMessage::info(
            "  - latest analysis pointer from the newest archive",
        ));
    }
    Ok(result)
}
