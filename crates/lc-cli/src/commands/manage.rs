//! Commands that remove entries or switch sessions, each behind a prompt.

use std::io::{BufRead, Write};

use anyhow::Result;
use lc_core::time::clock_time;
use lc_core::{Clock, Committed, KeyValueStore, Tracker};

use super::util::confirm;

pub fn undo<C: Clock, K: KeyValueStore, R: BufRead, W: Write>(
    input: &mut R,
    writer: &mut W,
    tracker: &mut Tracker<C, K>,
    assume_yes: bool,
) -> Result<()> {
    if !tracker.request_undo() {
        writeln!(writer, "Nothing to undo.")?;
        return Ok(());
    }
    if !confirm(input, writer, "Remove the most recent contraction?", assume_yes)? {
        tracker.dismiss_pending();
        writeln!(writer, "Kept.")?;
        return Ok(());
    }
    match tracker.confirm_pending() {
        Some(Committed::Undone(entry)) => writeln!(
            writer,
            "Removed the contraction started at {}.",
            clock_time(tracker.clock(), entry.start)
        )?,
        _ => writeln!(writer, "Nothing to undo.")?,
    }
    Ok(())
}

pub fn clear<C: Clock, K: KeyValueStore, R: BufRead, W: Write>(
    input: &mut R,
    writer: &mut W,
    tracker: &mut Tracker<C, K>,
    assume_yes: bool,
) -> Result<()> {
    let count = tracker.current_session().len();
    if count == 0 {
        writeln!(writer, "Session is already empty.")?;
        return Ok(());
    }
    let question = format!(
        "Clear all {count} contractions from {}?",
        tracker.current_session_id()
    );
    if !confirm(input, writer, &question, assume_yes)? {
        writeln!(writer, "Kept.")?;
        return Ok(());
    }
    tracker.clear_session();
    writeln!(writer, "Session cleared.")?;
    Ok(())
}

pub fn new_session<C: Clock, K: KeyValueStore, R: BufRead, W: Write>(
    input: &mut R,
    writer: &mut W,
    tracker: &mut Tracker<C, K>,
    assume_yes: bool,
) -> Result<()> {
    tracker.request_new_session();
    let question = "Start logging to today's session? Earlier sessions are kept.";
    if !confirm(input, writer, question, assume_yes)? {
        tracker.dismiss_pending();
        writeln!(writer, "Kept.")?;
        return Ok(());
    }
    if let Some(Committed::SwitchedTo(id)) = tracker.confirm_pending() {
        writeln!(writer, "Now logging to {id}.")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use lc_core::{ManualClock, MemoryStorage, PendingAction};

    // 2025-03-14T10:00:00Z
    const MORNING: i64 = 1_741_946_400_000;

    fn tracker_with_entries(n: i64) -> (Tracker<ManualClock, MemoryStorage>, ManualClock) {
        let clock = ManualClock::new(MORNING);
        let mut tracker = Tracker::open(clock.clone(), MemoryStorage::new());
        for i in 0..n {
            clock.set_ms(MORNING + i * 120_000);
            tracker.start();
            clock.advance_secs(30);
            tracker.stop();
        }
        (tracker, clock)
    }

    #[test]
    fn undo_on_empty_session_does_nothing() {
        let (mut tracker, _) = tracker_with_entries(0);
        let mut output = Vec::new();
        undo(&mut Cursor::new(""), &mut output, &mut tracker, true).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "Nothing to undo.\n");
        assert_eq!(tracker.pending(), None);
    }

    #[test]
    fn undo_declined_keeps_entries() {
        let (mut tracker, _) = tracker_with_entries(2);
        let mut output = Vec::new();
        undo(&mut Cursor::new("n\n"), &mut output, &mut tracker, false).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Remove the most recent contraction? [y/N] Kept.\n"
        );
        assert_eq!(tracker.current_session().len(), 2);
        assert_eq!(tracker.pending(), None);
    }

    #[test]
    fn undo_confirmed_removes_latest() {
        let (mut tracker, _) = tracker_with_entries(2);
        let mut output = Vec::new();
        undo(&mut Cursor::new("y\n"), &mut output, &mut tracker, false).unwrap();
        assert!(
            String::from_utf8(output)
                .unwrap()
                .ends_with("Removed the contraction started at 10:02:00.\n")
        );
        assert_eq!(tracker.current_session().len(), 1);
    }

    #[test]
    fn clear_empties_only_after_confirmation() {
        let (mut tracker, _) = tracker_with_entries(3);

        let mut output = Vec::new();
        clear(&mut Cursor::new("\n"), &mut output, &mut tracker, false).unwrap();
        assert_eq!(tracker.current_session().len(), 3);

        let mut output = Vec::new();
        clear(&mut Cursor::new("yes\n"), &mut output, &mut tracker, false).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Clear all 3 contractions from 2025-03-14? [y/N] Session cleared.\n"
        );
        assert!(tracker.current_session().is_empty());

        let mut output = Vec::new();
        clear(&mut Cursor::new(""), &mut output, &mut tracker, true).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "Session is already empty.\n");
    }

    #[test]
    fn new_session_switches_to_today() {
        let (mut tracker, clock) = tracker_with_entries(1);
        // Past midnight without a rollover check having run.
        clock.set_ms(MORNING + 86_400_000);

        let mut output = Vec::new();
        new_session(&mut Cursor::new(""), &mut output, &mut tracker, true).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "Now logging to 2025-03-15.\n");
        assert_eq!(tracker.current_session_id().as_str(), "2025-03-15");
        assert_eq!(tracker.store().sessions().len(), 2);
    }

    #[test]
    fn new_session_declined_clears_pending() {
        let (mut tracker, _) = tracker_with_entries(1);
        let mut output = Vec::new();
        new_session(&mut Cursor::new("no\n"), &mut output, &mut tracker, false).unwrap();
        assert_ne!(tracker.pending(), Some(PendingAction::NewSession));
        assert_eq!(tracker.current_session().len(), 1);
    }
}
