//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Labor contraction counter.
///
/// Times contractions, keeps a per-day log and reports their average length
/// and spacing.
#[derive(Debug, Parser)]
#[command(name = "lc", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the timer, today's statistics and recent contractions.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start or stop timing, whichever applies.
    Tap,

    /// Start timing a contraction.
    Start,

    /// Stop timing and log the contraction.
    Stop,

    /// Run the timer interactively; each line on stdin is a tap.
    Watch,

    /// Remove the most recent contraction.
    Undo {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Remove every contraction from the current session.
    Clear {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Start logging to a fresh session for today.
    NewSession {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// List every contraction in a session, oldest first.
    Timeline {
        /// Session to show (YYYY-MM-DD). Defaults to the current one.
        #[arg(long)]
        session: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List stored sessions.
    Sessions {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Move the start or end of a logged contraction.
    Edit {
        /// Position in the timeline (1 = oldest) or entry id.
        entry: String,

        /// Session holding the entry (YYYY-MM-DD). Defaults to the current one.
        #[arg(long)]
        session: Option<String>,

        /// Seconds to move the start by; negative moves it earlier.
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        start_delta: i64,

        /// Seconds to move the end by; negative moves it earlier.
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        end_delta: i64,

        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn edit_accepts_negative_deltas() {
        let cli = Cli::try_parse_from(["lc", "edit", "2", "--start-delta", "-60", "--end-delta=10"])
            .unwrap();
        match cli.command {
            Some(Commands::Edit {
                entry,
                start_delta,
                end_delta,
                yes,
                ..
            }) => {
                assert_eq!(entry, "2");
                assert_eq!((start_delta, end_delta), (-60, 10));
                assert!(!yes);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::try_parse_from(["lc", "status", "--verbose", "--json"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Some(Commands::Status { json: true })));
    }
}
