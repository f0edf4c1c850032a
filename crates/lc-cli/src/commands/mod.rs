//! CLI subcommand implementations.
//!
//! Every command works on an already opened [`lc_core::Tracker`] and writes
//! to a caller-supplied writer, so tests can drive them with a manual clock
//! and in-memory storage.

pub mod edit;
pub mod manage;
pub mod sessions;
pub mod status;
pub mod timeline;
pub mod timer;
pub mod util;
pub mod watch;
