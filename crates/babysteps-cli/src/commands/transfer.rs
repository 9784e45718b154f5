//! Export and import commands for CSV files.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use babysteps_core::transfer::{RowError, read_events, write_events};
use babysteps_core::{EventType, Session};
use babysteps_db::Database;
use chrono::{NaiveDate, TimeZone};
use clap::Args;

use super::util::filter_events;

#[derive(Debug, Default, Args)]
pub struct ExportArgs {
    /// Write to this file instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Only export events of this type.
    #[arg(long = "type")]
    pub event_type: Option<EventType>,

    /// Only export events on this local day (YYYY-MM-DD).
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

pub fn export<W: Write, Tz: TimeZone>(
    writer: &mut W,
    db: &Database,
    session: &Session,
    args: &ExportArgs,
    tz: &Tz,
) -> Result<()> {
    let events = filter_events(
        db.query_events(&session.baby_id)?,
        args.event_type,
        args.date,
        tz,
    );

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_events(BufWriter::new(file), &events)
                .with_context(|| format!("failed to write {}", path.display()))?;
            writeln!(
                writer,
                "Exported {} events to {}",
                events.len(),
                path.display()
            )?;
        }
        None => write_events(&mut *writer, &events).context("failed to write CSV")?,
    }
    tracing::info!(count = events.len(), "exported events");
    Ok(())
}

pub fn import<W: Write>(writer: &mut W, db: &mut Database, path: &Path) -> Result<()> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let report = read_events(BufReader::new(file))
        .with_context(|| format!("failed to import {}", path.display()))?;

    let imported = db
        .import_events(&report.events)
        .context("failed to store imported events")?;

    let mut row_errors = report.row_errors;
    row_errors.extend(imported.rejected.into_iter().map(|rejected| RowError {
        row: report.event_rows[rejected.index],
        message: rejected.error.to_string(),
    }));
    row_errors.sort_by_key(|error| error.row);
    for error in &row_errors {
        tracing::warn!(row = error.row, message = %error.message, "skipped row");
    }

    writeln!(writer, "Imported {} events", imported.stored)?;
    if !row_errors.is_empty() {
        writeln!(writer, "{} rows had errors", row_errors.len())?;
    }
    Ok(())
}
