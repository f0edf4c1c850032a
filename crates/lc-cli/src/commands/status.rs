//! Status command: the timer, current session statistics and recent entries.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use lc_core::time::session_label;
use lc_core::{Clock, ContractionState, DisplayEntry, KeyValueStore, SessionId, Stats, Tracker};

use super::util::{duration_text, write_entry_table};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport<'a> {
    session_id: &'a SessionId,
    state: ContractionState,
    started_at: Option<i64>,
    elapsed: String,
    stats: Stats,
    storage_warning: bool,
    recent: Vec<DisplayEntry>,
}

pub fn run<C: Clock, K: KeyValueStore, W: Write>(
    writer: &mut W,
    tracker: &Tracker<C, K>,
    json: bool,
) -> Result<()> {
    if json {
        let report = StatusReport {
            session_id: tracker.current_session_id(),
            state: tracker.state(),
            started_at: tracker.started_at(),
            elapsed: tracker.elapsed_display(),
            stats: tracker.stats(),
            storage_warning: tracker.storage_warning(),
            recent: tracker.recent_entries(),
        };
        serde_json::to_writer_pretty(&mut *writer, &report)?;
        writeln!(writer)?;
        return Ok(());
    }

    let session_id = tracker.current_session_id();
    writeln!(
        writer,
        "Session {session_id} ({})",
        session_label(session_id.as_str())
    )?;
    match tracker.state() {
        ContractionState::Idle => writeln!(writer, "Timer: idle")?,
        ContractionState::Contracting => {
            writeln!(writer, "Timer: contracting {}", tracker.elapsed_display())?;
        }
    }

    let stats = tracker.stats();
    writeln!(writer, "Contractions: {}", stats.count)?;
    if stats.count > 0 {
        writeln!(
            writer,
            "Average duration: {}",
            duration_text(stats.average_duration_sec)
        )?;
        let interval = if stats.has_interval_data {
            duration_text(stats.average_interval_sec)
        } else {
            "--".to_string()
        };
        writeln!(writer, "Average interval: {interval}")?;
    }
    if tracker.storage_warning() {
        writeln!(
            writer,
            "Storage is nearly full; clear old sessions to keep saving."
        )?;
    }

    let recent = tracker.recent_entries();
    if recent.is_empty() {
        writeln!(writer, "No contractions logged yet.")?;
        return Ok(());
    }
    writeln!(writer)?;
    writeln!(writer, "Recent:")?;
    write_entry_table(writer, tracker.clock(), &recent)?;

    Ok(())
}
