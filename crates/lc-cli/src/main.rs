use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lc_cli::commands::edit::Adjustment;
use lc_cli::commands::{edit, manage, sessions, status, timeline, timer, watch};
use lc_cli::{Cli, Commands, Config};
use lc_core::{SystemClock, Tracker};
use lc_db::SqliteStorage;

type AppTracker = Tracker<SystemClock, SqliteStorage>;

/// Load config and open the tracker, ensuring the storage directory exists.
fn open_tracker(config_path: Option<&Path>) -> Result<AppTracker> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.storage_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create storage directory")?;
    }

    let storage = SqliteStorage::open(&config.storage_path)
        .with_context(|| format!("failed to open {}", config.storage_path.display()))?
        .with_quota(config.storage_quota_bytes);
    Ok(Tracker::open(SystemClock, storage))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let mut tracker = open_tracker(cli.config.as_deref())?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let stdin = io::stdin();
    let mut input = stdin.lock();

    match command {
        Commands::Status { json } => status::run(&mut out, &tracker, *json)?,
        Commands::Tap => timer::tap(&mut out, &mut tracker)?,
        Commands::Start => timer::start(&mut out, &mut tracker)?,
        Commands::Stop => timer::stop(&mut out, &mut tracker)?,
        Commands::Watch => {
            // Release the lock so the runtime's stdin reader can take it.
            drop(input);
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("failed to initialize tokio runtime")?;
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            runtime.block_on(watch::run(stdin, &mut out, &mut tracker))?;
        }
        Commands::Undo { yes } => manage::undo(&mut input, &mut out, &mut tracker, *yes)?,
        Commands::Clear { yes } => manage::clear(&mut input, &mut out, &mut tracker, *yes)?,
        Commands::NewSession { yes } => {
            manage::new_session(&mut input, &mut out, &mut tracker, *yes)?;
        }
        Commands::Timeline { session, json } => {
            timeline::run(&mut out, &tracker, session.as_deref(), *json)?;
        }
        Commands::Sessions { json } => sessions::run(&mut out, &tracker, *json)?,
        Commands::Edit {
            entry,
            session,
            start_delta,
            end_delta,
            yes,
        } => edit::run(
            &mut input,
            &mut out,
            &mut tracker,
            entry,
            session.as_deref(),
            Adjustment {
                start_delta: *start_delta,
                end_delta: *end_delta,
            },
            *yes,
        )?,
    }

    finish(&mut out, &tracker)
}

/// Surfaces a failed save that the command itself did not report.
fn finish<W: Write>(out: &mut W, tracker: &AppTracker) -> Result<()> {
    if let Some(err) = tracker.last_persist_error() {
        tracing::warn!(error = %err, "changes were not saved");
    }
    out.flush()?;
    Ok(())
}
