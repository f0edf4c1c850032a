//! Start, stop and tap commands.

use std::io::Write;

use anyhow::Result;
use lc_core::time::{clamped_duration_seconds, clock_time};
use lc_core::{
    Clock, ContractionLogEntry, KeyValueStore, StartOutcome, StopOutcome, StopReason, TapOutcome,
    Tracker,
};

use super::util::duration_text;

pub fn tap<C: Clock, K: KeyValueStore, W: Write>(
    writer: &mut W,
    tracker: &mut Tracker<C, K>,
) -> Result<()> {
    match tracker.toggle() {
        TapOutcome::Debounced => writeln!(writer, "Ignored: tapped again too quickly.")?,
        TapOutcome::Started => write_started(writer, tracker)?,
        TapOutcome::Stop(outcome) => write_stop(writer, tracker, &outcome)?,
    }
    Ok(())
}

pub fn start<C: Clock, K: KeyValueStore, W: Write>(
    writer: &mut W,
    tracker: &mut Tracker<C, K>,
) -> Result<()> {
    match tracker.start() {
        StartOutcome::Started => write_started(writer, tracker)?,
        StartOutcome::AlreadyContracting => writeln!(
            writer,
            "Already timing a contraction ({}).",
            tracker.elapsed_display()
        )?,
    }
    Ok(())
}

pub fn stop<C: Clock, K: KeyValueStore, W: Write>(
    writer: &mut W,
    tracker: &mut Tracker<C, K>,
) -> Result<()> {
    let outcome = tracker.stop();
    write_stop(writer, tracker, &outcome)
}

fn write_started<C: Clock, K: KeyValueStore, W: Write>(
    writer: &mut W,
    tracker: &Tracker<C, K>,
) -> Result<()> {
    let started_at = tracker.started_at().unwrap_or_else(|| tracker.clock().now_ms());
    writeln!(
        writer,
        "Contraction started at {}.",
        clock_time(tracker.clock(), started_at)
    )?;
    Ok(())
}

fn write_stop<C: Clock, K: KeyValueStore, W: Write>(
    writer: &mut W,
    tracker: &Tracker<C, K>,
    outcome: &StopOutcome,
) -> Result<()> {
    match outcome {
        StopOutcome::Logged { entry, reason } => write_logged(writer, tracker, entry, *reason)?,
        StopOutcome::TooShort { elapsed_sec } => writeln!(
            writer,
            "Too short to log ({}); still timing.",
            duration_text(*elapsed_sec)
        )?,
        StopOutcome::NotContracting => writeln!(writer, "No contraction is being timed.")?,
    }
    Ok(())
}

/// Reports a logged entry, including an auto-stop.
pub fn write_logged<C: Clock, K: KeyValueStore, W: Write>(
    writer: &mut W,
    tracker: &Tracker<C, K>,
    entry: &ContractionLogEntry,
    reason: StopReason,
) -> Result<()> {
    let duration = duration_text(clamped_duration_seconds(entry.duration_ms()));
    let prefix = match reason {
        StopReason::Manual => "Contraction logged",
        StopReason::Auto => "Contraction auto-stopped at the maximum length and logged",
    };
    writeln!(
        writer,
        "{prefix}: {duration} (#{} in {}).",
        tracker.current_session().len(),
        tracker.current_session_id()
    )?;
    if let Some(err) = tracker.last_persist_error() {
        writeln!(writer, "Warning: could not save ({err}).")?;
    }
    Ok(())
}
