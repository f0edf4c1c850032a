//! Edit command: nudge the bounds of a logged contraction.
//!
//! Each bound may move at most two minutes from where it was logged and the
//! entry never gets shorter than the minimum contraction length; larger
//! deltas are clamped rather than rejected.

use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};
use lc_core::time::{clock_time, signed_delta};
use lc_core::{
    Clock, Committed, EDIT_ADJUST_OPTIONS, EditField, EditingDraft, EntryId, KeyValueStore,
    SessionId, Tracker, derive_display,
};

use super::util::{confirm, duration_text, resolve_session};

/// The changes requested on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct Adjustment {
    pub start_delta: i64,
    pub end_delta: i64,
}

pub fn run<C: Clock, K: KeyValueStore, R: BufRead, W: Write>(
    input: &mut R,
    writer: &mut W,
    tracker: &mut Tracker<C, K>,
    target: &str,
    session: Option<&str>,
    adjustment: Adjustment,
    assume_yes: bool,
) -> Result<()> {
    if adjustment.start_delta == 0 && adjustment.end_delta == 0 {
        let steps: Vec<String> = EDIT_ADJUST_OPTIONS.iter().map(ToString::to_string).collect();
        bail!(
            "nothing to change: pass --start-delta or --end-delta (usual steps: {} seconds)",
            steps.join(", ")
        );
    }
    let session_id = resolve_session(tracker, session)?;
    let entry_id = resolve_entry(tracker, &session_id, target)?;
    if !tracker.open_editor(&session_id, &entry_id) {
        bail!("no entry {target} in session {session_id}");
    }
    tracker.adjust_edit(EditField::Start, adjustment.start_delta);
    tracker.adjust_edit(EditField::End, adjustment.end_delta);

    if let Some(draft) = tracker.editing() {
        write_draft(writer, tracker.clock(), draft)?;
    }

    if let Err(err) = tracker.save_edit() {
        tracker.cancel_edit();
        writeln!(writer, "Not saved: {err}.")?;
        return Ok(());
    }
    if !confirm(input, writer, "Save these changes?", assume_yes)? {
        tracker.cancel_edit();
        writeln!(writer, "Discarded.")?;
        return Ok(());
    }
    match tracker.confirm_pending() {
        Some(Committed::Edited(_)) => writeln!(writer, "Entry updated.")?,
        _ => writeln!(writer, "Entry no longer exists; nothing saved.")?,
    }
    Ok(())
}

/// Resolves a 1-based timeline position or an entry id.
fn resolve_entry<C: Clock, K: KeyValueStore>(
    tracker: &Tracker<C, K>,
    session_id: &SessionId,
    target: &str,
) -> Result<EntryId> {
    let Ok(position) = target.parse::<usize>() else {
        return EntryId::new(target).context("invalid entry id");
    };
    let session = tracker
        .store()
        .session(session_id)
        .with_context(|| format!("no session for {session_id}"))?;
    derive_display(session.entries())
        .into_iter()
        .find(|entry| entry.index == position)
        .map(|entry| entry.entry.id)
        .with_context(|| {
            format!(
                "session {session_id} has {} entries, no #{position}",
                session.len()
            )
        })
}

fn write_draft<C: Clock, W: Write>(writer: &mut W, clock: &C, draft: &EditingDraft) -> Result<()> {
    let (start_offset, end_offset) = draft.offsets_sec();
    writeln!(
        writer,
        "Start:    {} -> {} ({})",
        clock_time(clock, draft.original_start),
        clock_time(clock, draft.draft_start),
        signed_delta(start_offset)
    )?;
    writeln!(
        writer,
        "End:      {} -> {} ({})",
        clock_time(clock, draft.original_end),
        clock_time(clock, draft.draft_end),
        signed_delta(end_offset)
    )?;
    writeln!(writer, "Duration: {}", duration_text(draft.duration_sec()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use insta::assert_snapshot;
    use lc_core::{ManualClock, MemoryStorage};

    // 2025-03-14T10:00:00Z
    const MORNING: i64 = 1_741_946_400_000;

    fn tracker() -> Tracker<ManualClock, MemoryStorage> {
        let clock = ManualClock::new(MORNING);
        let mut tracker = Tracker::open(clock.clone(), MemoryStorage::new());
        for offset_sec in [0, 600] {
            clock.set_ms(MORNING + offset_sec * 1000);
            tracker.start();
            clock.advance_secs(30);
            tracker.stop();
        }
        tracker
    }

    fn edit(
        tracker: &mut Tracker<ManualClock, MemoryStorage>,
        target: &str,
        start_delta: i64,
        end_delta: i64,
        answer: &str,
    ) -> Result<String> {
        let mut output = Vec::new();
        run(
            &mut Cursor::new(answer),
            &mut output,
            tracker,
            target,
            None,
            Adjustment {
                start_delta,
                end_delta,
            },
            false,
        )?;
        Ok(String::from_utf8(output).unwrap())
    }

    #[test]
    fn edit_by_position_shows_draft_and_saves() {
        let mut tracker = tracker();
        let output = edit(&mut tracker, "2", -60, 10, "y\n").unwrap();
        assert_snapshot!(output, @r"
        Start:    10:10:00 -> 10:09:00 (−01:00)
        End:      10:10:30 -> 10:10:40 (+00:10)
        Duration: 01:40
        Save these changes? [y/N] Entry updated.
        ");

        let latest = tracker.current_session().latest().unwrap();
        assert_eq!(latest.start, MORNING + 540_000);
        assert_eq!(latest.end, MORNING + 640_000);
        assert!(tracker.editing().is_none());
    }

    #[test]
    fn deltas_are_clamped_to_two_minutes() {
        let mut tracker = tracker();
        edit(&mut tracker, "1", -600, 0, "y\n").unwrap();
        assert_eq!(tracker.current_session().entries()[0].start, MORNING - 120_000);
    }

    #[test]
    fn edit_by_entry_id() {
        let mut tracker = tracker();
        let id = tracker.current_session().entries()[0].id.to_string();
        edit(&mut tracker, &id, 0, 5, "y\n").unwrap();
        assert_eq!(tracker.current_session().entries()[0].end, MORNING + 35_000);
    }

    #[test]
    fn declined_edit_changes_nothing() {
        let mut tracker = tracker();
        let before = tracker.store().clone();
        let output = edit(&mut tracker, "1", 10, 0, "n\n").unwrap();
        assert!(output.ends_with("Discarded.\n"));
        assert_eq!(tracker.store(), &before);
        assert!(tracker.editing().is_none());
        assert_eq!(tracker.pending(), None);
    }

    #[test]
    fn bad_targets_are_errors() {
        let mut tracker = tracker();
        let err = edit(&mut tracker, "3", 10, 0, "y\n").unwrap_err();
        assert_eq!(err.to_string(), "session 2025-03-14 has 2 entries, no #3");
        let err = edit(&mut tracker, "no-such-id", 10, 0, "y\n").unwrap_err();
        assert_eq!(err.to_string(), "no entry no-such-id in session 2025-03-14");
        let err = edit(&mut tracker, "1", 0, 0, "y\n").unwrap_err();
        assert!(err.to_string().ends_with("(usual steps: -60, -10, 10, 60 seconds)"));
    }
}
