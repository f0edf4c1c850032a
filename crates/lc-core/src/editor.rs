//! Bounded manual adjustment of a logged entry.
//!
//! A draft may drift at most [`EDIT_BOUND_MS`] from each original bound, and
//! never gets shorter than the minimum contraction length.

use serde::Serialize;
use thiserror::Error;

use crate::model::Store;
use crate::time::clamped_duration_seconds;
use crate::tracker::{MIN_DURATION_MS, MIN_DURATION_SEC};
use crate::types::{EntryId, SessionId};

/// How far either bound may move from its original value, in milliseconds.
pub const EDIT_BOUND_MS: i64 = 120_000;

/// Adjustment steps offered to the user, in seconds.
pub const EDIT_ADJUST_OPTIONS: [i64; 4] = [-60, -10, 10, 60];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("no entry is being edited")]
    NoDraft,
    #[error("duration must be at least {min_sec} seconds, got {duration_sec}")]
    TooShort { duration_sec: u64, min_sec: u64 },
}

/// Which bound of the entry to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Start,
    End,
}

/// An in-progress edit of one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditingDraft {
    pub session_id: SessionId,
    pub entry_id: EntryId,
    pub draft_start: i64,
    pub draft_end: i64,
    pub original_start: i64,
    pub original_end: i64,
}

impl EditingDraft {
    /// Starts a draft from the entry's current bounds.
    ///
    /// `None` when the session or the entry does not exist.
    pub fn open(store: &Store, session_id: &SessionId, entry_id: &EntryId) -> Option<Self> {
        let entry = store.session(session_id)?.entry(entry_id)?;
        Some(Self {
            session_id: session_id.clone(),
            entry_id: entry_id.clone(),
            draft_start: entry.start,
            draft_end: entry.end,
            original_start: entry.start,
            original_end: entry.end,
        })
    }

    /// Moves one bound by `delta_seconds`.
    ///
    /// The result stays within [`EDIT_BOUND_MS`] of that bound's original
    /// value and at least the minimum duration away from the other bound.
    pub fn adjust(&mut self, field: EditField, delta_seconds: i64) {
        let delta_ms = delta_seconds.saturating_mul(1000);
        match field {
            EditField::Start => {
                let next = self
                    .draft_start
                    .saturating_add(delta_ms)
                    .clamp(
                        self.original_start.saturating_sub(EDIT_BOUND_MS),
                        self.original_start.saturating_add(EDIT_BOUND_MS),
                    );
                self.draft_start = next.min(self.draft_end.saturating_sub(MIN_DURATION_MS));
            }
            EditField::End => {
                let next = self
                    .draft_end
                    .saturating_add(delta_ms)
                    .clamp(
                        self.original_end.saturating_sub(EDIT_BOUND_MS),
                        self.original_end.saturating_add(EDIT_BOUND_MS),
                    );
                self.draft_end = next.max(self.draft_start.saturating_add(MIN_DURATION_MS));
            }
        }
    }

    /// Reverts both bounds to the entry's original values.
    pub fn reset(&mut self) {
        self.draft_start = self.original_start;
        self.draft_end = self.original_end;
    }

    pub fn duration_sec(&self) -> u64 {
        clamped_duration_seconds(self.draft_end.saturating_sub(self.draft_start))
    }

    /// Signed seconds each bound has moved, as `(start, end)`.
    pub const fn offsets_sec(&self) -> (i64, i64) {
        (
            self.draft_start.saturating_sub(self.original_start) / 1000,
            self.draft_end.saturating_sub(self.original_end) / 1000,
        )
    }

    /// Checks the draft is long enough to be saved.
    pub fn validate(&self) -> Result<(), EditError> {
        let duration_sec = self.duration_sec();
        if duration_sec < MIN_DURATION_SEC {
            return Err(EditError::TooShort {
                duration_sec,
                min_sec: MIN_DURATION_SEC,
            });
        }
        Ok(())
    }

    /// Writes the draft into `store`. `None` when the entry no longer exists.
    pub fn apply(&self, store: &Store) -> Option<Store> {
        store.with_entry_retimed(&self.session_id, &self.entry_id, self.draft_start, self.draft_end)
    }
}
