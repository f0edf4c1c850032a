//! Timeline command: every entry of one session, oldest first.

use std::io::Write;

use anyhow::{Result, bail};

use lc_core::time::session_label;
use lc_core::{Clock, KeyValueStore, Tracker, derive_display};

use super::util::{resolve_session, write_entry_table};

pub fn run<C: Clock, K: KeyValueStore, W: Write>(
    writer: &mut W,
    tracker: &Tracker<C, K>,
    session: Option<&str>,
    json: bool,
) -> Result<()> {
    let session_id = resolve_session(tracker, session)?;
    let Some(session) = tracker.store().session(&session_id) else {
        bail!("no session for {session_id}");
    };
    let entries = derive_display(session.entries());

    if json {
        serde_json::to_writer_pretty(&mut *writer, &entries)?;
        writeln!(writer)?;
        return Ok(());
    }

    writeln!(
        writer,
        "Session {session_id} ({})",
        session_label(session_id.as_str())
    )?;
    if entries.is_empty() {
        writeln!(writer, "No contractions logged.")?;
        return Ok(());
    }
    write_entry_table(writer, tracker.clock(), &entries)?;
    Ok(())
}
