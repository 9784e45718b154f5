//! Stats command: time since the last feed plus windowed and daily totals.

use std::io::Write;

use anyhow::Result;
use babysteps_core::{Session, Stats, compute_stats, format_duration_minutes};
use babysteps_db::Database;
use chrono::{DateTime, TimeZone, Utc};

pub fn run<W: Write, Tz: TimeZone>(
    writer: &mut W,
    db: &Database,
    session: &Session,
    json: bool,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Result<()> {
    let events = db.query_events(&session.baby_id)?;
    let stats = compute_stats(&events, now, tz);
    tracing::debug!(events = events.len(), "computed stats");

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&stats)?)?;
        return Ok(());
    }
    write_stats(writer, &stats)
}

fn write_stats<W: Write>(writer: &mut W, stats: &Stats) -> Result<()> {
    match &stats.last_feed {
        Some(last) => {
            write!(
                writer,
                "Time since feed: {} ago",
                format_duration_minutes(last.minutes_ago)
            )?;
            if let Some(details) = &last.details {
                write!(writer, " ({details})")?;
            }
            writeln!(writer)?;
        }
        None => writeln!(writer, "Time since feed: no feeds yet")?,
    }
    writeln!(
        writer,
        "Feeds / 24h: {} ({} in 7d)",
        stats.feed_count_24h, stats.feed_count_7d
    )?;
    writeln!(
        writer,
        "Sleep / 24h: {} min ({} min in 7d)",
        stats.sleep_minutes_24h, stats.sleep_minutes_7d
    )?;
    writeln!(writer, "24h summary: {}", stats.summary_24h())?;
    writeln!(writer, "7d summary: {}", stats.summary_7d())?;

    writeln!(writer, "Daily:")?;
    for day in &stats.daily {
        writeln!(
            writer,
            "  {}  {} feeds  {} diapers  {} sleep",
            day.date.format("%m/%d"),
            day.feeds,
            day.diapers,
            format_duration_minutes(i64::from(day.sleep_minutes))
        )?;
    }
    Ok(())
}
