//! Log command for recording care events.

use std::io::Write;

use anyhow::Result;
use babysteps_core::{
    DiaperType, EventKind, FeedSide, FeedingMethod, LoggedEvent, NewEvent, Session, UNDO_WINDOW,
};
use babysteps_db::Database;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};

use super::util::{describe, parse_datetime_at};

/// Options shared by every event type.
#[derive(Debug, Clone, Default, Args)]
pub struct LogOptions {
    /// When it happened: RFC 3339 or relative (e.g., "20 minutes ago"). Defaults to now.
    #[arg(long)]
    pub at: Option<String>,

    /// Free-text note.
    #[arg(long)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum LogEvent {
    /// Record a feed.
    Feed {
        /// breast, bottle, formula or solid.
        #[arg(long, default_value = "bottle")]
        method: FeedingMethod,
        /// left, right or both.
        #[arg(long)]
        side: Option<FeedSide>,
        #[arg(long)]
        minutes: Option<u32>,
        #[arg(long)]
        oz: Option<f64>,
        /// Teaspoons, for solids.
        #[arg(long)]
        tsp: Option<f64>,
        #[command(flatten)]
        options: LogOptions,
    },
    /// Record a diaper change.
    Diaper {
        /// wet, dirty or mixed.
        diaper_type: DiaperType,
        #[command(flatten)]
        options: LogOptions,
    },
    /// Record a finished sleep.
    Sleep {
        #[arg(long)]
        minutes: u32,
        #[command(flatten)]
        options: LogOptions,
    },
    /// Record a pumping session.
    Pump {
        #[arg(long)]
        minutes: Option<u32>,
        #[arg(long)]
        oz: Option<f64>,
        #[command(flatten)]
        options: LogOptions,
    },
    /// Record a medication dose.
    Med {
        medication: String,
        #[arg(long, default_value = "")]
        dose: String,
        #[command(flatten)]
        options: LogOptions,
    },
    /// Record a note.
    Note {
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        options: LogOptions,
    },
    /// Record anything else.
    Misc {
        description: String,
        #[command(flatten)]
        options: LogOptions,
    },
}

impl LogEvent {
    /// Builds the partial event, resolving `--at` against `now`.
    pub fn to_new_event(&self, now: DateTime<Utc>) -> Result<NewEvent> {
        let (kind, options) = match self {
            Self::Feed {
                method,
                side,
                minutes,
                oz,
                tsp,
                options,
            } => (
                EventKind::Feed {
                    method: *method,
                    side: *side,
                    duration_minutes: *minutes,
                    amount_oz: *oz,
                    amount_tsp: *tsp,
                },
                options,
            ),
            Self::Diaper {
                diaper_type,
                options,
            } => (
                EventKind::Diaper {
                    diaper_type: *diaper_type,
                },
                options,
            ),
            Self::Sleep { minutes, options } => (
                EventKind::Sleep {
                    duration_minutes: *minutes,
                },
                options,
            ),
            Self::Pump {
                minutes,
                oz,
                options,
            } => (
                EventKind::Pump {
                    duration_minutes: *minutes,
                    amount_oz: *oz,
                },
                options,
            ),
            Self::Med {
                medication,
                dose,
                options,
            } => (
                EventKind::Med {
                    medication: medication.trim().to_string(),
                    dose: dose.trim().to_string(),
                },
                options,
            ),
            Self::Note { title, options } => (
                EventKind::Note {
                    title: title.clone(),
                },
                options,
            ),
            Self::Misc {
                description,
                options,
            } => (
                EventKind::Misc {
                    description: description.trim().to_string(),
                },
                options,
            ),
        };

        let mut new = NewEvent::new(kind).with_note(options.note.clone());
        if let Some(at) = options.at.as_deref() {
            new = new.at(parse_datetime_at(at, now)?);
        }
        Ok(new)
    }
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    session: &Session,
    event: &LogEvent,
    now: DateTime<Utc>,
) -> Result<LoggedEvent> {
    let logged = db.log_event_at(session, event.to_new_event(now)?, now)?;
    report_logged(writer, &logged)?;
    Ok(logged)
}

/// Prints the confirmation line for a freshly logged event.
pub fn report_logged<W: Write>(writer: &mut W, logged: &LoggedEvent) -> Result<()> {
    writeln!(writer, "Logged {} [{}]", describe(&logged.event), logged.event.id)?;
    writeln!(
        writer,
        "Undo within {}s with `babysteps undo`",
        UNDO_WINDOW.num_seconds()
    )?;
    Ok(())
}
