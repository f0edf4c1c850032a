//! Shared utilities for CLI commands.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use lc_core::time::{clock_time, format_duration};
use lc_core::{Clock, DisplayEntry, KeyValueStore, SessionId, Tracker};

/// Asks a yes/no question, defaulting to no.
///
/// `assume_yes` answers without prompting.
pub fn confirm<R: BufRead, W: Write>(
    input: &mut R,
    writer: &mut W,
    question: &str,
    assume_yes: bool,
) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    write!(writer, "{question} [y/N] ")?;
    writer.flush()?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Parses an optional `--session` argument, defaulting to the current session.
pub fn resolve_session<C: Clock, K: KeyValueStore>(
    tracker: &Tracker<C, K>,
    session: Option<&str>,
) -> Result<SessionId> {
    match session {
        Some(raw) => SessionId::new(raw).with_context(|| format!("invalid session id: {raw}")),
        None => Ok(tracker.current_session_id().clone()),
    }
}

/// Seconds as `MM:SS`.
pub fn duration_text(seconds: u64) -> String {
    format_duration(i64::try_from(seconds).unwrap_or(i64::MAX))
}

/// Writes entries as an aligned table.
pub fn write_entry_table<C: Clock, W: Write>(
    writer: &mut W,
    clock: &C,
    entries: &[DisplayEntry],
) -> Result<()> {
    writeln!(
        writer,
        "{:>3}  {:<8}  {:<8}  {:<8}  {}",
        "#", "start", "end", "duration", "interval"
    )?;
    for entry in entries {
        let interval = entry
            .interval_sec
            .map_or_else(|| "--".to_string(), duration_text);
        writeln!(
            writer,
            "{:>3}  {}  {}  {:<8}  {}",
            entry.index,
            clock_time(clock, entry.entry.start),
            clock_time(clock, entry.entry.end),
            duration_text(entry.duration_sec),
            interval,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use lc_core::{ManualClock, MemoryStorage};

    #[test]
    fn confirm_accepts_yes_variants() {
        for answer in ["y\n", "Y\n", " yes \n"] {
            let mut output = Vec::new();
            assert!(confirm(&mut Cursor::new(answer), &mut output, "Go?", false).unwrap());
            assert_eq!(String::from_utf8(output).unwrap(), "Go? [y/N] ");
        }
    }

    #[test]
    fn confirm_defaults_to_no() {
        for answer in ["\n", "n\n", "sure\n", ""] {
            let mut output = Vec::new();
            assert!(!confirm(&mut Cursor::new(answer), &mut output, "Go?", false).unwrap());
        }
    }

    #[test]
    fn confirm_skips_prompt_when_assumed() {
        let mut output = Vec::new();
        assert!(confirm(&mut Cursor::new(""), &mut output, "Go?", true).unwrap());
        assert!(output.is_empty());
    }

    #[test]
    fn resolve_session_validates_input() {
        let tracker = Tracker::open(ManualClock::new(1_741_946_400_000), MemoryStorage::new());
        assert_eq!(resolve_session(&tracker, None).unwrap().as_str(), "2025-03-14");
        assert_eq!(
            resolve_session(&tracker, Some("2025-03-01")).unwrap().as_str(),
            "2025-03-01"
        );
        assert!(resolve_session(&tracker, Some("yesterday")).is_err());
    }
}
