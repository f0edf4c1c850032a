//! Watch command: a foreground timer driven by stdin.
//!
//! Ticks once a second so the elapsed time updates and long contractions
//! auto-stop, checks for a new day every minute, and treats each input line
//! as a tap. `s` prints the status, `q` or end of input quits.

use std::io::Write;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::{Duration, MissedTickBehavior};

use lc_core::tracker::{ROLLOVER_CHECK_SECS, TICK_INTERVAL_MS};
use lc_core::{Clock, ContractionState, KeyValueStore, StopReason, TickOutcome, Tracker};

use super::{status, timer};

pub async fn run<C, K, R, W>(input: R, writer: &mut W, tracker: &mut Tracker<C, K>) -> Result<()>
where
    C: Clock,
    K: KeyValueStore,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut ticker = tokio::time::interval(Duration::from_millis(TICK_INTERVAL_MS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut rollover = tokio::time::interval(Duration::from_secs(ROLLOVER_CHECK_SECS));
    rollover.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut lines = input.lines();

    writeln!(
        writer,
        "Press Enter to start or stop a contraction, s for status, q to quit."
    )?;
    loop {
        tokio::select! {
            biased;

            _ = ticker.tick() => match tracker.tick() {
                TickOutcome::Idle => {}
                TickOutcome::Running { .. } => {
                    write!(writer, "\r{}", tracker.elapsed_display())?;
                    writer.flush()?;
                }
                TickOutcome::AutoStopped(entry) => {
                    writeln!(writer)?;
                    timer::write_logged(writer, tracker, &entry, StopReason::Auto)?;
                }
            },
            _ = rollover.tick() => {
                if let Some(today) = tracker.check_rollover() {
                    writeln!(writer)?;
                    writeln!(writer, "New day: logging to {today}.")?;
                }
            },
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read input")? else {
                    break;
                };
                match line.trim() {
                    "q" => break,
                    "s" => status::run(writer, tracker, false)?,
                    _ => {
                        writeln!(writer)?;
                        timer::tap(writer, tracker)?;
                    }
                }
            },
        }
    }

    if tracker.state() == ContractionState::Contracting {
        writeln!(writer)?;
        writeln!(writer, "Timer still running; it resumes on the next run.")?;
    }
    tracing::debug!("watch loop finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use lc_core::{ManualClock, MemoryStorage};

    // 2025-03-14T10:00:00Z
    const MORNING: i64 = 1_741_946_400_000;

    async fn watch(tracker: &mut Tracker<ManualClock, MemoryStorage>, input: &str) -> String {
        let mut output = Vec::new();
        run(Cursor::new(input.to_string()), &mut output, tracker)
            .await
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[tokio::test]
    async fn lines_are_taps_and_q_quits() {
        let clock = ManualClock::new(MORNING);
        let mut tracker = Tracker::open(clock, MemoryStorage::new());

        let output = watch(&mut tracker, "\n\nq\nignored after quit\n").await;
        assert!(output.contains("Contraction started at 10:00:00."));
        assert!(output.contains("Ignored: tapped again too quickly."));
        assert!(output.ends_with("Timer still running; it resumes on the next run.\n"));
        assert_eq!(tracker.state(), ContractionState::Contracting);
    }

    #[tokio::test]
    async fn overdue_contraction_is_auto_stopped_on_first_tick() {
        let clock = ManualClock::new(MORNING);
        let mut tracker = Tracker::open(clock.clone(), MemoryStorage::new());
        tracker.start();
        clock.advance_secs(200);

        let output = watch(&mut tracker, "").await;
        assert!(output.contains("auto-stopped at the maximum length and logged: 03:00"));
        assert_eq!(tracker.state(), ContractionState::Idle);
        assert_eq!(tracker.current_session().len(), 1);
    }

    #[tokio::test]
    async fn new_day_is_picked_up() {
        let clock = ManualClock::new(MORNING);
        let mut tracker = Tracker::open(clock.clone(), MemoryStorage::new());
        clock.advance_secs(86_400);

        let output = watch(&mut tracker, "s\n").await;
        assert!(output.contains("New day: logging to 2025-03-15."));
        assert!(output.contains("Session 2025-03-15 (Sat, Mar 15)"));
        assert_eq!(tracker.current_session_id().as_str(), "2025-03-15");
    }
}
