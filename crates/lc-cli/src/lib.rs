//! Labor contraction counter CLI library.
//!
//! This crate provides the command-line interface over the tracker in
//! `lc-core`, persisted through `lc-db`.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
