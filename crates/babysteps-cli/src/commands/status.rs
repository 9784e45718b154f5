//! Status command: where the data lives and how much of it there is.

use std::io::Write;

use anyhow::Result;
use babysteps_db::Database;
use chrono::TimeZone;

use super::util::format_local;
use crate::Config;

pub fn run<W: Write, Tz: TimeZone>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    tz: &Tz,
) -> Result<()> {
    let profile = db.load_profile()?;
    let counts = db.counts()?;

    writeln!(writer, "Babysteps status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(writer, "Baby: {} [{}]", profile.name, profile.id)?;
    writeln!(writer, "Caregiver: {}", config.caregiver_id)?;
    writeln!(writer, "Events: {}", counts.events)?;
    writeln!(writer, "Running timers: {}", counts.timers)?;
    writeln!(writer, "Outbox: {}", counts.outbox)?;
    writeln!(writer, "Invites: {}", counts.invites)?;

    match db.latest_event_time()? {
        Some(latest) => writeln!(writer, "Last event: {}", format_local(latest, tz))?,
        None => writeln!(writer, "No events recorded.")?,
    }
    Ok(())
}
