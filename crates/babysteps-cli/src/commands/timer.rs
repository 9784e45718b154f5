//! Timer commands: start, stop, cancel and list in-progress activities.

use std::io::Write;

use anyhow::{Context, Result, bail};
use babysteps_core::{
    ActiveTimer, FeedSide, FeedingMethod, Session, TimerId, TimerMetadata, TimerType,
    format_duration_minutes,
};
use babysteps_db::Database;
use chrono::{DateTime, TimeZone, Utc};
use clap::{Args, Subcommand};
use serde_json::Value;

use super::log::report_logged;
use super::util::format_local;

#[derive(Debug, Subcommand)]
pub enum TimerAction {
    /// Start a feed or sleep timer.
    Start {
        /// feed or sleep.
        timer_type: TimerType,
        #[command(flatten)]
        details: TimerDetails,
    },
    /// Stop a timer and log the event it produces.
    Stop {
        #[command(flatten)]
        target: TimerTarget,
        #[command(flatten)]
        details: TimerDetails,
    },
    /// Discard a timer without logging anything.
    Cancel {
        #[command(flatten)]
        target: TimerTarget,
    },
    /// List running timers.
    List {
        #[arg(long)]
        json: bool,
    },
}

/// Which timer to act on: an explicit id or the running timer of a type.
#[derive(Debug, Args)]
pub struct TimerTarget {
    /// Timer id.
    #[arg(required_unless_present = "timer_type")]
    pub id: Option<String>,

    /// Act on the running timer of this type instead.
    #[arg(long = "type", conflicts_with = "id")]
    pub timer_type: Option<TimerType>,
}

/// Metadata recorded on a timer; at stop time these override start values.
#[derive(Debug, Default, Args)]
pub struct TimerDetails {
    /// Feeding method for feed timers (defaults to breast).
    #[arg(long)]
    pub method: Option<FeedingMethod>,

    /// Breast side for feed timers.
    #[arg(long)]
    pub side: Option<FeedSide>,

    /// Planned duration in minutes.
    #[arg(long)]
    pub planned: Option<u32>,

    #[arg(long)]
    pub note: Option<String>,
}

impl TimerDetails {
    pub fn to_metadata(&self) -> TimerMetadata {
        let mut metadata = TimerMetadata::new();
        if let Some(method) = self.method {
            metadata.insert("method".to_string(), Value::from(method.as_str()));
        }
        if let Some(side) = self.side {
            metadata.insert("side".to_string(), Value::from(side.as_str()));
        }
        if let Some(planned) = self.planned {
            metadata.insert("plannedDuration".to_string(), Value::from(planned));
        }
        if let Some(note) = &self.note {
            metadata.insert("note".to_string(), Value::from(note.as_str()));
        }
        metadata
    }
}

pub fn start<W: Write>(
    writer: &mut W,
    db: &mut Database,
    session: &Session,
    timer_type: TimerType,
    details: &TimerDetails,
    now: DateTime<Utc>,
) -> Result<ActiveTimer> {
    let timer = db
        .start_timer_at(session, timer_type, details.to_metadata(), now)
        .with_context(|| format!("failed to start {timer_type} timer"))?;
    writeln!(writer, "Started {timer_type} timer [{}]", timer.id)?;
    Ok(timer)
}

pub fn stop<W: Write>(
    writer: &mut W,
    db: &mut Database,
    session: &Session,
    target: &TimerTarget,
    details: &TimerDetails,
    now: DateTime<Utc>,
) -> Result<()> {
    let Some(id) = resolve(writer, db, session, target)? else {
        return Ok(());
    };
    match db.stop_timer_at(&id, &details.to_metadata(), now)? {
        Some(logged) => report_logged(writer, &logged)?,
        None => writeln!(writer, "No timer with id {id}")?,
    }
    Ok(())
}

pub fn cancel<W: Write>(
    writer: &mut W,
    db: &mut Database,
    session: &Session,
    target: &TimerTarget,
) -> Result<()> {
    let Some(id) = resolve(writer, db, session, target)? else {
        return Ok(());
    };
    if db.cancel_timer(&id)? {
        writeln!(writer, "Canceled timer [{id}]")?;
    } else {
        writeln!(writer, "No timer with id {id}")?;
    }
    Ok(())
}

pub fn list<W: Write, Tz: TimeZone>(
    writer: &mut W,
    db: &Database,
    session: &Session,
    json: bool,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Result<()> {
    let timers = db.query_timers(&session.baby_id)?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&timers)?)?;
        return Ok(());
    }
    if timers.is_empty() {
        writeln!(writer, "No running timers.")?;
        return Ok(());
    }
    for timer in timers {
        writeln!(
            writer,
            "- {} since {} ({}) [{}]",
            timer.timer_type,
            format_local(timer.started_at, tz),
            format_duration_minutes(i64::from(timer.elapsed_minutes(now))),
            timer.id
        )?;
    }
    Ok(())
}

fn resolve<W: Write>(
    writer: &mut W,
    db: &Database,
    session: &Session,
    target: &TimerTarget,
) -> Result<Option<TimerId>> {
    match (&target.id, target.timer_type) {
        (Some(id), _) => Ok(Some(TimerId::new(id.clone())?)),
        (None, Some(timer_type)) => {
            let running = db.running_timer(&session.baby_id, timer_type)?;
            if running.is_none() {
                writeln!(writer, "No running {timer_type} timer")?;
            }
            Ok(running.map(|timer| timer.id))
        }
        (None, None) => bail!("pass a timer id or --type"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use babysteps_core::{BabyId, CaregiverId, EventKind};
    use chrono::Duration;
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

    fn by_type(timer_type: TimerType) -> TimerTarget {
        TimerTarget {
            id: None,
            timer_type: Some(timer_type),
        }
    }

    #[test]
    fn start_list_and_stop_by_type() {
        let mut db = Database::open_in_memory().unwrap();
        let start_at = ts("2025-03-01T20:00:00Z");
        let timer = start(
            &mut Vec::new(),
            &mut db,
            &session(),
            TimerType::Sleep,
            &TimerDetails::default(),
            start_at,
        )
        .unwrap();

        let mut output = Vec::new();
        list(
            &mut output,
            &db,
            &session(),
            false,
            start_at + Duration::minutes(75),
            &Utc,
        )
        .unwrap();
        let output = String::from_utf8(output)
            .unwrap()
            .replace(timer.id.as_str(), "[ID]");
        assert_snapshot!(output, @"- sleep since 2025-03-01 20:00 (1hr 15mins) [[ID]]");

        let mut output = Vec::new();
        stop(
            &mut output,
            &mut db,
            &session(),
            &by_type(TimerType::Sleep),
            &TimerDetails::default(),
            start_at + Duration::minutes(75),
        )
        .unwrap();
        assert!(
            String::from_utf8(output)
                .unwrap()
                .starts_with("Logged Sleep: 75 min")
        );

        let events = db.query_events(&session().baby_id).unwrap();
        assert_eq!(
            events[0].kind,
            EventKind::Sleep {
                duration_minutes: 75
            }
        );
    }

    #[test]
    fn stop_without_running_timer_is_informational() {
        let mut db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        stop(
            &mut output,
            &mut db,
            &session(),
            &by_type(TimerType::Feed),
            &TimerDetails::default(),
            Utc::now(),
        )
        .unwrap();
        cancel(
            &mut output,
            &mut db,
            &session(),
            &TimerTarget {
                id: Some("missing".to_string()),
                timer_type: None,
            },
        )
        .unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        No running feed timer
        No timer with id missing
        ");
    }

    #[test]
    fn second_start_fails() {
        let mut db = Database::open_in_memory().unwrap();
        let details = TimerDetails {
            side: Some(FeedSide::Left),
            ..TimerDetails::default()
        };
        start(
            &mut Vec::new(),
            &mut db,
            &session(),
            TimerType::Feed,
            &details,
            Utc::now(),
        )
        .unwrap();
        let err = start(
            &mut Vec::new(),
            &mut db,
            &session(),
            TimerType::Feed,
            &details,
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "failed to start feed timer");
    }

    #[test]
    fn details_become_metadata() {
        let details = TimerDetails {
            method: Some(FeedingMethod::Bottle),
            side: None,
            planned: Some(20),
            note: Some("fussy".to_string()),
        };
        let metadata = details.to_metadata();
        assert_eq!(metadata["method"], "bottle");
        assert_eq!(metadata["plannedDuration"], 20);
        assert_eq!(metadata["note"], "fussy");
        assert!(!metadata.contains_key("side"));
    }
}
