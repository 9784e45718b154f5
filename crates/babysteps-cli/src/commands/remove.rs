//! Remove and undo commands.

use std::io::Write;

use anyhow::{Context, Result};
use babysteps_core::{EventId, Session, UNDO_WINDOW, UndoToken};
use babysteps_db::Database;
use chrono::{DateTime, Utc};

use super::util::describe;

/// Deletes an event by id. A missing id is reported, not treated as an error.
pub fn run<W: Write>(writer: &mut W, db: &mut Database, id: &str) -> Result<()> {
    let id = EventId::new(id).context("event id cannot be empty")?;
    let event = db.get_event(&id)?;
    if db.remove_event(&id)? {
        let label = event.map_or_else(|| "event".to_string(), |e| describe(&e));
        writeln!(writer, "Removed {label} [{id}]")?;
    } else {
        writeln!(writer, "No event with id {id}")?;
    }
    Ok(())
}

/// Undoes the most recently created event if it is still inside the undo window.
pub fn undo<W: Write>(
    writer: &mut W,
    db: &mut Database,
    session: &Session,
    now: DateTime<Utc>,
) -> Result<()> {
    let token = db
        .last_created_event(&session.baby_id)?
        .map(|event| (UndoToken::for_event(&event), event))
        .filter(|(token, _)| token.is_available(now));

    let Some((token, event)) = token else {
        writeln!(
            writer,
            "Nothing to undo (events can be undone for {}s after logging)",
            UNDO_WINDOW.num_seconds()
        )?;
        return Ok(());
    };

    db.undo_at(&token, now)?;
    writeln!(writer, "Undid {} [{}]", describe(&event), event.id)?;
    Ok(())
}
