//! Outbox command: list queued event snapshots.

use std::io::Write;

use anyhow::Result;
use babysteps_db::Database;
use chrono::TimeZone;

use super::util::{describe, format_local};

pub fn run<W: Write, Tz: TimeZone>(
    writer: &mut W,
    db: &Database,
    json: bool,
    tz: &Tz,
) -> Result<()> {
    let items = db.list_outbox()?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&items)?)?;
        return Ok(());
    }
    if items.is_empty() {
        writeln!(writer, "Outbox is empty.")?;
        return Ok(());
    }

    writeln!(writer, "{} pending:", items.len())?;
    for item in items {
        writeln!(
            writer,
            "- {}  {} [event {}]",
            format_local(item.created_at, tz),
            describe(&item.payload),
            item.event_id
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use babysteps_core::{BabyId, CaregiverId, DiaperType, EventKind, NewEvent, Session};
    use chrono::{DateTime, Utc};
    use insta::assert_snapshot;

    fn session() -> Session {
        Session::new(
            BabyId::new("baby-1").unwrap(),
            CaregiverId::new("local-user").unwrap(),
        )
    }

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn lists_logged_events_in_queue_order() {
        let mut db = Database::open_in_memory().unwrap();
        let first = db
            .log_event_at(
                &session(),
                NewEvent::new(EventKind::Diaper {
                    diaper_type: DiaperType::Wet,
                }),
                ts("2025-03-01T08:00:00Z"),
            )
            .unwrap();
        let second = db
            .log_event_at(
                &session(),
                NewEvent::new(EventKind::Misc {
                    description: "bath".to_string(),
                }),
                ts("2025-03-01T08:30:00Z"),
            )
            .unwrap();
        // Imported or overwritten events are not queued.
        let mut edited = first.event.clone();
        edited.note = Some("changed".to_string());
        db.put_event(&edited).unwrap();

        let mut output = Vec::new();
        run(&mut output, &db, false, &Utc).unwrap();
        let output = String::from_utf8(output)
            .unwrap()
            .replace(first.event.id.as_str(), "ID0")
            .replace(second.event.id.as_str(), "ID1");
        assert_snapshot!(output, @r"
        2 pending:
        - 2025-03-01 08:00  Wet diaper [event ID0]
        - 2025-03-01 08:30  Misc: bath [event ID1]
        ");
    }

    #[test]
    fn json_items_embed_the_snapshot() {
        let mut db = Database::open_in_memory().unwrap();
        let logged = db
            .log_event(
                &session(),
                NewEvent::new(EventKind::Sleep {
                    duration_minutes: 30,
                }),
            )
            .unwrap();

        let mut output = Vec::new();
        run(&mut output, &db, true, &Utc).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value[0]["eventId"], logged.event.id.as_str());
        assert_eq!(value[0]["payload"]["type"], "sleep");
        assert_eq!(value[0]["payload"]["durationMinutes"], 30);
    }
}
