//! Core domain logic for the labor contraction counter.
//!
//! This crate contains the fundamental types and logic for:
//! - Timing: the idle/contracting state machine with debounce and auto-stop
//! - Sessions: day-bucketed contraction logs and their rollover
//! - Display: per-entry durations and intervals, plus session statistics
//! - Persistence: mirroring the session store to a key-value surface
//! - Editing: bounded adjustment of a logged contraction

mod display;
pub mod editor;
mod model;
pub mod persist;
pub mod time;
pub mod tracker;
mod types;

pub use display::{DisplayEntry, MAX_RECENT_ENTRIES, Stats, derive_display, recent, summarize};
pub use editor::{EDIT_ADJUST_OPTIONS, EditError, EditField, EditingDraft};
pub use model::{ContractionLogEntry, Session, Store, sort_chronologically};
pub use persist::{Gateway, KeyValueStore, MemoryStorage, PersistError, StorageError, StorageEstimate};
pub use time::{Clock, ManualClock, SystemClock};
pub use tracker::{
    Committed, ContractionState, PendingAction, StartOutcome, StopOutcome, StopReason, TapOutcome,
    TickOutcome, Tracker,
};
pub use types::{EntryId, SessionId, ValidationError};
