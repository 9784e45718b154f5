//! Command-line argument definitions.

use std::path::PathBuf;

use babysteps_core::Role;
use clap::{Parser, Subcommand};

use crate::commands::events::EventsArgs;
use crate::commands::log::LogEvent;
use crate::commands::profile::ProfileAction;
use crate::commands::timer::TimerAction;
use crate::commands::transfer::ExportArgs;

/// Local-first baby care logger.
///
/// Records feeds, diapers, sleep and other care events in a local database,
/// with timers, quick taps and daily stats.
#[derive(Debug, Parser)]
#[command(name = "babysteps", version, about, long_about = None)]
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
    /// Log a care event.
    Log {
        #[command(subcommand)]
        event: LogEvent,
    },

    /// Delete an event by id.
    Remove {
        /// Event id.
        id: String,
    },

    /// Undo the event logged in the last few seconds.
    Undo,

    /// Start, stop, cancel or list timers.
    Timer {
        #[command(subcommand)]
        action: TimerAction,
    },

    /// Read quick-tap actions from stdin, one per line.
    ///
    /// Repeated taps of bottle, food, nursing or pumping add up to one event.
    /// wet, dirty, sleep and `misc <text>` are logged immediately.
    Quick,

    /// Show event history grouped by day.
    Events(EventsArgs),

    /// Show aggregated stats.
    Stats {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show or update the baby profile.
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Invite a caregiver (recorded locally as pending).
    Invite {
        email: String,

        /// admin, member or viewer.
        #[arg(long, default_value = "member")]
        role: Role,
    },

    /// List caregiver invites.
    Invites {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Export events as CSV.
    Export(ExportArgs),

    /// Import events from a CSV export.
    Import {
        /// CSV file to read.
        file: PathBuf,
    },

    /// List queued outbox items.
    Outbox {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show database location and record counts.
    Status,

    /// Delete all stored data.
    Reset {
        /// Confirm deletion.
        #[arg(long)]
        yes: bool,

        /// Only delete events and the outbox.
        #[arg(long)]
        events_only: bool,
    },
}
