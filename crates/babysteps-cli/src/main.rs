use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use babysteps_core::ProfileUpdate;
use babysteps_db::Database;
use chrono::{Local, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use babysteps_cli::commands::profile::ProfileAction;
use babysteps_cli::commands::timer::TimerAction;
use babysteps_cli::commands::{
    events, invite, log, outbox, profile, quick, remove, reset, stats, status, timer, transfer,
    util,
};
use babysteps_cli::{Cli, Commands, Config};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = Database::open(&config.database_path).with_context(|| {
        format!(
            "failed to open database {}",
            config.database_path.display()
        )
    })?;
    Ok((db, config))
}

#[expect(
    clippy::too_many_lines,
    reason = "CLI command dispatch is inherently verbose"
)]
fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
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
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut db, config) = open_database(cli.config.as_deref())?;
    let session = util::session(&db, &config)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let now = Utc::now();

    match command {
        Commands::Log { event } => {
            log::run(&mut out, &mut db, &session, event, now)?;
        }
        Commands::Remove { id } => remove::run(&mut out, &mut db, id)?,
        Commands::Undo => remove::undo(&mut out, &mut db, &session, now)?,
        Commands::Timer { action } => match action {
            TimerAction::Start {
                timer_type,
                details,
            } => {
                timer::start(&mut out, &mut db, &session, *timer_type, details, now)?;
            }
            TimerAction::Stop { target, details } => {
                timer::stop(&mut out, &mut db, &session, target, details, now)?;
            }
            TimerAction::Cancel { target } => timer::cancel(&mut out, &mut db, &session, target)?,
            TimerAction::List { json } => timer::list(&mut out, &db, &session, *json, now, &Local)?,
        },
        Commands::Quick => {
            writeln!(
                out,
                "Tap actions, one per line (bottle, food, nursing, pumping, wet, dirty, sleep, misc <text>). Ctrl-D to finish."
            )?;
            out.flush()?;
            quick::run(io::stdin(), &mut out, &mut db, &session)?;
        }
        Commands::Events(args) => events::run(&mut out, &db, &session, args, &Local)?,
        Commands::Stats { json } => stats::run(&mut out, &db, &session, *json, now, &Local)?,
        Commands::Profile { action } => {
            let today = now.with_timezone(&Local).date_naive();
            match action {
                ProfileAction::Show { json } => profile::show(&mut out, &db, *json, today)?,
                ProfileAction::Set {
                    name,
                    birthday,
                    timezone,
                } => {
                    let update = ProfileUpdate {
                        name: name.clone(),
                        birthday: *birthday,
                        timezone: timezone.clone(),
                    };
                    profile::set(&mut out, &mut db, update, today)?;
                }
            }
        }
        Commands::Invite { email, role } => invite::run(&mut out, &mut db, email, *role, now)?,
        Commands::Invites { json } => invite::list(&mut out, &db, *json, &Local)?,
        Commands::Export(args) => transfer::export(&mut out, &db, &session, args, &Local)?,
        Commands::Import { file } => transfer::import(&mut out, &mut db, file)?,
        Commands::Outbox { json } => outbox::run(&mut out, &db, *json, &Local)?,
        Commands::Status => status::run(&mut out, &db, &config, &Local)?,
        Commands::Reset { yes, events_only } => {
            reset::run(&mut out, &mut db, *yes, *events_only)?;
        }
    }

    Ok(())
}
