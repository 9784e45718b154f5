//! Events command: the history view, grouped by local day.

use std::io::Write;

use anyhow::Result;
use babysteps_core::{EventType, Session};
use babysteps_db::Database;
use chrono::{NaiveDate, TimeZone};
use clap::Args;

use super::util::{describe, filter_events, format_clock, local_date};

#[derive(Debug, Default, Args)]
pub struct EventsArgs {
    /// Only show events of this type.
    #[arg(long = "type")]
    pub event_type: Option<EventType>,

    /// Only show events on this local day (YYYY-MM-DD).
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write, Tz: TimeZone>(
    writer: &mut W,
    db: &Database,
    session: &Session,
    args: &EventsArgs,
    tz: &Tz,
) -> Result<()> {
    let events = filter_events(
        db.query_events(&session.baby_id)?,
        args.event_type,
        args.date,
        tz,
    );

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&events)?)?;
        return Ok(());
    }
    if events.is_empty() {
        writeln!(writer, "No events recorded.")?;
        return Ok(());
    }

    let mut current_day = None;
    for event in &events {
        let day = local_date(event.timestamp, tz);
        if current_day != Some(day) {
            writeln!(writer, "{}", day.format("%A, %B %-d %Y"))?;
            current_day = Some(day);
        }
        write!(
            writer,
            "  {}  {}",
            format_clock(event.timestamp, tz),
            describe(event)
        )?;
        if let Some(note) = &event.note {
            write!(writer, " ({note})")?;
        }
        writeln!(writer, " [{}]", event.id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use babysteps_core::{BabyId, CaregiverId, DiaperType, Event, EventKind, FeedingMethod, NewEvent};
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

    fn seed(db: &mut Database) -> Vec<Event> {
        let now = ts("2025-03-02T09:00:00Z");
        let feed = NewEvent::new(EventKind::feed_amount(FeedingMethod::Formula, Some(4.0), None))
        .at(ts("2025-03-02T07:15:00Z"));
        let diaper = NewEvent::new(EventKind::Diaper {
            diaper_type: DiaperType::Mixed,
        })
        .at(ts("2025-03-01T22:40:00Z"))
        .with_note(Some("rash cream".to_string()));
        let sleep = NewEvent::new(EventKind::Sleep {
            duration_minutes: 130,
        })
        .at(ts("2025-03-01T21:00:00Z"));

        [feed, diaper, sleep]
            .into_iter()
            .map(|new| db.log_event_at(&session(), new, now).unwrap().event)
            .collect()
    }

    fn redact(output: Vec<u8>, events: &[Event]) -> String {
        let mut output = String::from_utf8(output).unwrap();
        for (index, event) in events.iter().enumerate() {
            output = output.replace(event.id.as_str(), &format!("ID{index}"));
        }
        output
    }

    #[test]
    fn groups_events_by_day() {
        let mut db = Database::open_in_memory().unwrap();
        let events = seed(&mut db);

        let mut output = Vec::new();
        run(&mut output, &db, &session(), &EventsArgs::default(), &Utc).unwrap();
        assert_snapshot!(redact(output, &events), @r"
        Sunday, March 2 2025
          07:15  Feed: formula • 4 oz [ID0]
        Saturday, March 1 2025
          22:40  Mixed diaper (rash cream) [ID1]
          21:00  Sleep: 130 min [ID2]
        ");
    }

    #[test]
    fn filters_by_type_and_day() {
        let mut db = Database::open_in_memory().unwrap();
        let events = seed(&mut db);

        let args = EventsArgs {
            event_type: Some(EventType::Sleep),
            date: NaiveDate::from_ymd_opt(2025, 3, 1),
            json: false,
        };
        let mut output = Vec::new();
        run(&mut output, &db, &session(), &args, &Utc).unwrap();
        assert_snapshot!(redact(output, &events), @r"
        Saturday, March 1 2025
          21:00  Sleep: 130 min [ID2]
        ");

        let args = EventsArgs {
            date: NaiveDate::from_ymd_opt(2025, 2, 1),
            ..EventsArgs::default()
        };
        let mut output = Vec::new();
        run(&mut output, &db, &session(), &args, &Utc).unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @"No events recorded.");
    }
}
