//! Reset command: delete stored data.

use std::io::Write;

use anyhow::{Result, bail};
use babysteps_db::Database;

/// Clears every collection, or only events and the outbox with `events_only`.
pub fn run<W: Write>(writer: &mut W, db: &mut Database, yes: bool, events_only: bool) -> Result<()> {
    if !yes {
        bail!("refusing to delete data without --yes");
    }
    if events_only {
        let removed = db.clear_events()?;
        writeln!(writer, "Removed {removed} events")?;
    } else {
        db.reset_all()?;
        writeln!(writer, "All data cleared")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use babysteps_core::{
        BabyId, CaregiverId, DiaperType, EventKind, NewEvent, ProfileUpdate, Session, TimerMetadata,
        TimerType,
    };
    use babysteps_db::CollectionCounts;

    fn seeded() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        let session = Session::new(
            BabyId::new("baby-1").unwrap(),
            CaregiverId::new("local-user").unwrap(),
        );
        db.log_event(
            &session,
            NewEvent::new(EventKind::Diaper {
                diaper_type: DiaperType::Dirty,
            }),
        )
        .unwrap();
        db.start_timer(&session, TimerType::Feed, TimerMetadata::new())
            .unwrap();
        db.update_profile(ProfileUpdate {
            name: Some("Ada".to_string()),
            ..ProfileUpdate::default()
        })
        .unwrap();
        db
    }

    #[test]
    fn requires_confirmation() {
        let mut db = seeded();
        let err = run(&mut Vec::new(), &mut db, false, false).unwrap_err();
        assert_eq!(err.to_string(), "refusing to delete data without --yes");
        assert_eq!(db.counts().unwrap().events, 1);
    }

    #[test]
    fn reset_empties_everything() {
        let mut db = seeded();
        let mut output = Vec::new();
        run(&mut output, &mut db, true, false).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "All data cleared\n");
        assert_eq!(db.counts().unwrap(), CollectionCounts::default());
        assert_eq!(db.load_profile().unwrap().name, "Baby");
    }

    #[test]
    fn events_only_keeps_timers_and_profile() {
        let mut db = seeded();
        let mut output = Vec::new();
        run(&mut output, &mut db, true, true).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "Removed 1 events\n");
        let counts = db.counts().unwrap();
        assert_eq!((counts.events, counts.outbox, counts.timers), (0, 0, 1));
        assert_eq!(db.load_profile().unwrap().name, "Ada");
    }
}
