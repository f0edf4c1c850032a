//! The contraction timer and everything that mutates the session store.
//!
//! [`Tracker`] owns the store, the timer and the edit draft. It has no timers
//! of its own: the host calls [`Tracker::tick`] once a second while
//! contracting and [`Tracker::check_rollover`] at least once a minute. Every
//! mutation commits a whole new [`Store`] and mirrors it to the gateway.
//! Write failures are logged and kept in [`Tracker::last_persist_error`];
//! they never interrupt the operation that caused them. An operation that
//! writes both the store and the timer reports the first failure of either.

use serde::{Deserialize, Serialize};

use crate::display::{DisplayEntry, Stats, derive_display, recent, summarize};
use crate::editor::{EditError, EditField, EditingDraft};
use crate::model::{ContractionLogEntry, Session, Store};
use crate::persist::{Gateway, KeyValueStore, PersistError, TIMER_KEY};
use crate::time::{Clock, clamped_duration_seconds, format_duration};
use crate::types::{EntryId, SessionId};

/// Manual stops before this many seconds are rejected.
pub const MIN_DURATION_SEC: u64 = 5;
/// Contractions are capped, and auto-stopped, at this many seconds.
pub const MAX_DURATION_SEC: u64 = 180;
/// Toggles closer together than this are ignored.
pub const TAP_DEBOUNCE_MS: i64 = 1000;
/// How often the host should tick while contracting.
pub const TICK_INTERVAL_MS: u64 = 1000;
/// How often the host should check for a new calendar day.
pub const ROLLOVER_CHECK_SECS: u64 = 60;

pub(crate) const MIN_DURATION_MS: i64 = 5_000;

/// Whether a contraction is being timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContractionState {
    #[default]
    Idle,
    Contracting,
}

/// Why a contraction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Manual,
    /// The timer reached [`MAX_DURATION_SEC`].
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyContracting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    Logged {
        entry: ContractionLogEntry,
        reason: StopReason,
    },
    /// A manual stop before [`MIN_DURATION_SEC`]; the timer keeps running.
    TooShort { elapsed_sec: u64 },
    NotContracting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapOutcome {
    /// Within [`TAP_DEBOUNCE_MS`] of the previous accepted tap.
    Debounced,
    Started,
    Stop(StopOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Running { elapsed_sec: u64 },
    AutoStopped(ContractionLogEntry),
}

/// An operation waiting for the user to confirm it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PendingAction {
    UndoLast,
    NewSession,
    SaveEdit,
}

/// What a confirmed [`PendingAction`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Committed {
    Undone(ContractionLogEntry),
    SwitchedTo(SessionId),
    Edited(EntryId),
    /// The action no longer had anything to act on.
    Nothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    Idle,
    Contracting { started_at: i64 },
}

/// The timer as persisted between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimerRecord {
    state: ContractionState,
    #[serde(default)]
    start_timestamp: Option<i64>,
    #[serde(default)]
    last_tap_at: Option<i64>,
}

/// Owns the session store and drives every change to it.
pub struct Tracker<C, K> {
    clock: C,
    gateway: Gateway<K>,
    store: Store,
    timer: Timer,
    elapsed_sec: u64,
    last_tap_at: Option<i64>,
    editing: Option<EditingDraft>,
    pending: Option<PendingAction>,
    storage_warning: bool,
    last_persist_error: Option<PersistError>,
}

impl<C: Clock, K: KeyValueStore> Tracker<C, K> {
    /// Restores the store and any running timer, then catches up on the day.
    ///
    /// A missing or unusable record starts a fresh store for today.
    pub fn open(clock: C, storage: K) -> Self {
        let gateway = Gateway::new(storage);
        let today = clock.today();
        let store = gateway.load(&today).unwrap_or_else(|| Store::fresh(today));
        let record = match gateway.read_json::<TimerRecord>(TIMER_KEY) {
            Ok(record) => record.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable timer state");
                TimerRecord::default()
            }
        };
        let timer = match (record.state, record.start_timestamp) {
            (ContractionState::Contracting, Some(started_at)) => {
                resumable_timer(&store, started_at, clock.now_ms())
            }
            _ => Timer::Idle,
        };
        let dropped_timer = record.state == ContractionState::Contracting && timer == Timer::Idle;

        let mut tracker = Self {
            clock,
            gateway,
            store,
            timer,
            elapsed_sec: 0,
            last_tap_at: record.last_tap_at,
            editing: None,
            pending: None,
            storage_warning: false,
            last_persist_error: None,
        };
        let stored = match tracker.roll_over() {
            Some((_, result)) => result,
            None => tracker.write_store(),
        };
        let cleared = if dropped_timer {
            tracker.write_timer()
        } else {
            Ok(())
        };
        tracker.record_writes([stored, cleared]);
        tracker.tick();
        tracker
    }

    // ----- observable state -----

    pub const fn state(&self) -> ContractionState {
        match self.timer {
            Timer::Idle => ContractionState::Idle,
            Timer::Contracting { .. } => ContractionState::Contracting,
        }
    }

    /// When the running contraction started, if any.
    pub const fn started_at(&self) -> Option<i64> {
        match self.timer {
            Timer::Idle => None,
            Timer::Contracting { started_at } => Some(started_at),
        }
    }

    /// Elapsed time as `MM:SS`, `00:00` while idle. Refreshed by [`Self::tick`].
    pub fn elapsed_display(&self) -> String {
        match self.timer {
            Timer::Idle => format_duration(0),
            Timer::Contracting { .. } => {
                format_duration(i64::try_from(self.elapsed_sec).unwrap_or(i64::MAX))
            }
        }
    }

    pub const fn store(&self) -> &Store {
        &self.store
    }

    pub const fn current_session_id(&self) -> &SessionId {
        self.store.current_session_id()
    }

    pub fn current_session(&self) -> &Session {
        self.store.current_session()
    }

    /// The current session's entries in chronological order.
    pub fn timeline(&self) -> Vec<DisplayEntry> {
        derive_display(self.store.current_session().entries())
    }

    /// The latest entries, newest first.
    pub fn recent_entries(&self) -> Vec<DisplayEntry> {
        recent(&self.timeline())
    }

    pub fn stats(&self) -> Stats {
        summarize(&self.timeline())
    }

    pub const fn storage_warning(&self) -> bool {
        self.storage_warning
    }

    /// The first failed write of the latest operation, cleared once an
    /// operation writes everything successfully.
    pub const fn last_persist_error(&self) -> Option<&PersistError> {
        self.last_persist_error.as_ref()
    }

    pub const fn editing(&self) -> Option<&EditingDraft> {
        self.editing.as_ref()
    }

    pub const fn pending(&self) -> Option<PendingAction> {
        self.pending
    }

    pub const fn clock(&self) -> &C {
        &self.clock
    }

    pub const fn gateway(&self) -> &Gateway<K> {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut Gateway<K> {
        &mut self.gateway
    }

    // ----- timer -----

    /// Starts timing a contraction. Ignored while one is already running.
    pub fn start(&mut self) -> StartOutcome {
        if let Timer::Contracting { .. } = self.timer {
            return StartOutcome::AlreadyContracting;
        }
        let now = self.clock.now_ms();
        self.timer = Timer::Contracting { started_at: now };
        self.elapsed_sec = 0;
        tracing::debug!(started_at = now, "contraction started");
        self.persist_timer();
        StartOutcome::Started
    }

    /// Stops the running contraction on user request.
    ///
    /// Refused, with the timer left running, before [`MIN_DURATION_SEC`].
    pub fn stop(&mut self) -> StopOutcome {
        self.finish(StopReason::Manual)
    }

    /// Starts or stops depending on the current state, ignoring taps that
    /// come within [`TAP_DEBOUNCE_MS`] of the last accepted one.
    pub fn toggle(&mut self) -> TapOutcome {
        let now = self.clock.now_ms();
        if let Some(last) = self.last_tap_at {
            // A clock that went backwards does not lock out taps.
            let since_last_ms = now.saturating_sub(last);
            if (0..TAP_DEBOUNCE_MS).contains(&since_last_ms) {
                tracing::debug!(since_last_ms, "tap debounced");
                return TapOutcome::Debounced;
            }
        }
        self.last_tap_at = Some(now);

        match self.timer {
            Timer::Idle => {
                self.start();
                TapOutcome::Started
            }
            Timer::Contracting { .. } => {
                let outcome = self.stop();
                if matches!(outcome, StopOutcome::TooShort { .. }) {
                    // The tap itself still counts toward the debounce window.
                    self.persist_timer();
                }
                TapOutcome::Stop(outcome)
            }
        }
    }

    /// Refreshes the elapsed time and auto-stops at [`MAX_DURATION_SEC`].
    ///
    /// A timer that started after the current time, because the clock moved
    /// backwards, is dropped.
    pub fn tick(&mut self) -> TickOutcome {
        let Timer::Contracting { started_at } = self.timer else {
            return TickOutcome::Idle;
        };
        if self.drop_timer_from_future(started_at) {
            return TickOutcome::Idle;
        }
        let elapsed_ms = self.clock.now_ms().saturating_sub(started_at);
        let elapsed_sec = clamped_duration_seconds(elapsed_ms);
        if elapsed_sec >= MAX_DURATION_SEC {
            return match self.finish(StopReason::Auto) {
                StopOutcome::Logged { entry, .. } => TickOutcome::AutoStopped(entry),
                _ => TickOutcome::Idle,
            };
        }
        self.elapsed_sec = elapsed_sec;
        TickOutcome::Running { elapsed_sec }
    }

    fn finish(&mut self, reason: StopReason) -> StopOutcome {
        let Timer::Contracting { started_at } = self.timer else {
            return StopOutcome::NotContracting;
        };
        if self.drop_timer_from_future(started_at) {
            return StopOutcome::NotContracting;
        }
        let now = self.clock.now_ms();
        let elapsed_sec = clamped_duration_seconds(now.saturating_sub(started_at));
        if reason == StopReason::Manual && elapsed_sec < MIN_DURATION_SEC {
            tracing::debug!(elapsed_sec, "stop rejected, contraction too short");
            return StopOutcome::TooShort { elapsed_sec };
        }

        let duration_sec = elapsed_sec.min(MAX_DURATION_SEC);
        let duration_ms = i64::try_from(duration_sec * 1000).unwrap_or(i64::MAX);
        let entry = ContractionLogEntry::new(started_at, started_at.saturating_add(duration_ms), now);
        tracing::info!(
            entry = %entry.id,
            session = %self.store.current_session_id(),
            duration_sec,
            auto = reason == StopReason::Auto,
            "contraction logged"
        );

        self.store = self.store.with_entry_appended(entry.clone());
        self.timer = Timer::Idle;
        self.elapsed_sec = 0;
        // The entry lands before the timer is cleared, so a failed timer
        // write can only leave a record that reopening recognises as logged.
        let stored = self.write_store();
        let cleared = self.write_timer();
        self.record_writes([stored, cleared]);
        StopOutcome::Logged { entry, reason }
    }

    /// Drops a running timer whose start is later than now.
    fn drop_timer_from_future(&mut self, started_at: i64) -> bool {
        let now = self.clock.now_ms();
        if started_at <= now {
            return false;
        }
        tracing::warn!(started_at, now, "clock is behind the running timer, dropping it");
        self.timer = Timer::Idle;
        self.elapsed_sec = 0;
        self.persist_timer();
        true
    }

    // ----- sessions -----

    /// Moves to today's session when the calendar day has changed.
    ///
    /// Returns the new session id. Earlier sessions are left untouched.
    pub fn check_rollover(&mut self) -> Option<SessionId> {
        let (today, result) = self.roll_over()?;
        self.record_writes([result]);
        Some(today)
    }

    fn roll_over(&mut self) -> Option<(SessionId, Result<(), PersistError>)> {
        let today = self.clock.today();
        if &today == self.store.current_session_id() {
            return None;
        }
        tracing::debug!(from = %self.store.current_session_id(), to = %today, "day rollover");
        self.store = self.store.switched_to(today.clone());
        Some((today, self.write_store()))
    }

    /// Asks to remove the latest entry. Not armed when the session is empty.
    pub fn request_undo(&mut self) -> bool {
        if self.store.current_session().is_empty() {
            return false;
        }
        self.pending = Some(PendingAction::UndoLast);
        true
    }

    /// Asks to switch to a session for today.
    pub fn request_new_session(&mut self) {
        self.pending = Some(PendingAction::NewSession);
    }

    /// Empties the current session. Returns whether anything was removed.
    pub fn clear_session(&mut self) -> bool {
        let Some(next) = self.store.with_current_cleared() else {
            return false;
        };
        tracing::debug!(session = %self.store.current_session_id(), "session cleared");
        self.commit(next);
        true
    }

    /// Carries out the pending action, if any.
    pub fn confirm_pending(&mut self) -> Option<Committed> {
        let action = self.pending.take()?;
        let committed = match action {
            PendingAction::UndoLast => match self.store.with_latest_removed() {
                Some((next, removed)) => {
                    tracing::debug!(entry = %removed.id, "latest entry undone");
                    self.commit(next);
                    Committed::Undone(removed)
                }
                None => Committed::Nothing,
            },
            PendingAction::NewSession => {
                let today = self.clock.today();
                self.commit(self.store.switched_to(today.clone()));
                Committed::SwitchedTo(today)
            }
            PendingAction::SaveEdit => self.commit_edit(),
        };
        Some(committed)
    }

    /// Abandons the pending action without changing anything.
    pub fn dismiss_pending(&mut self) {
        self.pending = None;
    }

    // ----- editing -----

    /// Opens a draft for one entry. Returns `false`, opening nothing, when
    /// the session or entry does not exist.
    pub fn open_editor(&mut self, session_id: &SessionId, entry_id: &EntryId) -> bool {
        let Some(draft) = EditingDraft::open(&self.store, session_id, entry_id) else {
            return false;
        };
        self.editing = Some(draft);
        self.withdraw_save();
        true
    }

    /// Moves one bound of the draft. A save waiting for confirmation is
    /// withdrawn, since it no longer matches the draft.
    pub fn adjust_edit(&mut self, field: EditField, delta_seconds: i64) {
        if let Some(draft) = self.editing.as_mut() {
            draft.adjust(field, delta_seconds);
            self.withdraw_save();
        }
    }

    pub fn reset_draft(&mut self) {
        if let Some(draft) = self.editing.as_mut() {
            draft.reset();
            self.withdraw_save();
        }
    }

    /// Validates the draft and asks for confirmation to save it.
    ///
    /// A too-short draft is rejected and the editor stays open.
    pub fn save_edit(&mut self) -> Result<(), EditError> {
        let draft = self.editing.as_ref().ok_or(EditError::NoDraft)?;
        draft.validate()?;
        self.pending = Some(PendingAction::SaveEdit);
        Ok(())
    }

    /// Discards the draft.
    pub fn cancel_edit(&mut self) {
        self.editing = None;
        self.withdraw_save();
    }

    fn withdraw_save(&mut self) {
        if self.pending == Some(PendingAction::SaveEdit) {
            self.pending = None;
        }
    }

    fn commit_edit(&mut self) -> Committed {
        let Some(draft) = self.editing.take() else {
            return Committed::Nothing;
        };
        match draft.apply(&self.store) {
            Some(next) => {
                tracing::debug!(entry = %draft.entry_id, "entry edited");
                self.commit(next);
                Committed::Edited(draft.entry_id)
            }
            None => Committed::Nothing,
        }
    }

    // ----- persistence -----

    fn commit(&mut self, next: Store) {
        self.store = next;
        let result = self.write_store();
        self.record_writes([result]);
    }

    fn persist_timer(&mut self) {
        let result = self.write_timer();
        self.record_writes([result]);
    }

    fn write_store(&mut self) -> Result<(), PersistError> {
        let result = self.gateway.save(&self.store);
        self.storage_warning = self.gateway.storage_warning();
        result
    }

    fn write_timer(&mut self) -> Result<(), PersistError> {
        let record = TimerRecord {
            state: self.state(),
            start_timestamp: self.started_at(),
            last_tap_at: self.last_tap_at,
        };
        if record == TimerRecord::default() {
            self.gateway.remove(TIMER_KEY)
        } else {
            self.gateway.write_json(TIMER_KEY, &record)
        }
    }

    /// Records the outcome of one operation's writes. The first failure
    /// wins; only an operation whose writes all succeed clears it.
    fn record_writes<const N: usize>(&mut self, results: [Result<(), PersistError>; N]) {
        let mut first_error = None;
        for err in results.into_iter().filter_map(Result::err) {
            tracing::warn!(error = %err, "failed to persist, continuing in memory");
            if first_error.is_none() {
                first_error = Some(err);
            }
        }
        self.last_persist_error = first_error;
    }
}

/// The timer a persisted `started_at` resumes as.
///
/// A start in the future, or one already logged as an entry, reads as idle.
fn resumable_timer(store: &Store, started_at: i64, now: i64) -> Timer {
    if started_at > now {
        tracing::warn!(started_at, now, "ignoring timer that starts in the future");
        return Timer::Idle;
    }
    let logged = store
        .sessions()
        .values()
        .any(|session| session.entries().iter().any(|entry| entry.start == started_at));
    if logged {
        tracing::warn!(started_at, "ignoring timer whose contraction is already logged");
        return Timer::Idle;
    }
    Timer::Contracting { started_at }
}
