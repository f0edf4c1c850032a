//! Sessions command: every stored day with its entry count.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use lc_core::time::session_label;
use lc_core::{Clock, KeyValueStore, SessionId, Tracker};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionSummary<'a> {
    id: &'a SessionId,
    label: String,
    count: usize,
    current: bool,
}

pub fn run<C: Clock, K: KeyValueStore, W: Write>(
    writer: &mut W,
    tracker: &Tracker<C, K>,
    json: bool,
) -> Result<()> {
    let current = tracker.current_session_id();
    let summaries: Vec<SessionSummary<'_>> = tracker
        .store()
        .sessions()
        .values()
        .map(|session| SessionSummary {
            id: &session.id,
            label: session_label(session.id.as_str()),
            count: session.len(),
            current: &session.id == current,
        })
        .collect();

    if json {
        serde_json::to_writer_pretty(&mut *writer, &summaries)?;
        writeln!(writer)?;
        return Ok(());
    }

    for summary in &summaries {
        let noun = if summary.count == 1 { "contraction" } else { "contractions" };
        let marker = if summary.current { "  (current)" } else { "" };
        writeln!(
            writer,
            "{}  {:<11}  {} {noun}{marker}",
            summary.id, summary.label, summary.count
        )?;
    }
    Ok(())
}
