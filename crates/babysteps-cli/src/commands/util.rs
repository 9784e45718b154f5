//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::Context;
use babysteps_core::{CaregiverId, Event, EventType, Session};
use babysteps_db::Database;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use regex::Regex;

use crate::Config;

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s+(minute|min|hour|hr|day|week)s?\s+ago$")
        .unwrap_or_else(|e| unreachable!("relative time pattern is valid: {e}"))
});

/// Conservative bounds for relative time parsing (~1000 years in minutes).
const MAX_RELATIVE_MINUTES: i64 = 1000 * 365 * 24 * 60;

/// Parse a datetime string as either RFC 3339 or relative time.
///
/// Supports:
/// - RFC 3339: "2026-01-15T10:30:00Z"
/// - Relative: "2 hours ago", "30 minutes ago", "1 day ago", "1 week ago"
pub fn parse_datetime(s: &str) -> anyhow::Result<DateTime<Utc>> {
    parse_datetime_at(s, Utc::now())
}

/// Like [`parse_datetime`], resolving relative times against `now`.
pub fn parse_datetime_at(s: &str, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        anyhow::bail!(
            "Invalid datetime: {s}. Use RFC 3339 (e.g., 2026-01-15T10:30:00Z) or relative (e.g., '2 hours ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let (max_for_unit, minutes_per_unit) = match &caps[2] {
        "minute" | "min" => (MAX_RELATIVE_MINUTES, 1),
        "hour" | "hr" => (MAX_RELATIVE_MINUTES / 60, 60),
        "day" => (MAX_RELATIVE_MINUTES / (60 * 24), 60 * 24),
        "week" => (MAX_RELATIVE_MINUTES / (60 * 24 * 7), 60 * 24 * 7),
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    if n > max_for_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    Ok(now - Duration::minutes(n * minutes_per_unit))
}

/// Builds the session for the stored profile and configured caregiver.
pub fn session(db: &Database, config: &Config) -> anyhow::Result<Session> {
    let profile = db.load_profile().context("failed to load profile")?;
    let caregiver_id =
        CaregiverId::new(config.caregiver_id.clone()).context("invalid caregiver_id in config")?;
    Ok(Session::for_profile(&profile, caregiver_id))
}

/// Keeps events matching an optional type and local calendar day.
pub fn filter_events<Tz: TimeZone>(
    events: Vec<Event>,
    event_type: Option<EventType>,
    date: Option<NaiveDate>,
    tz: &Tz,
) -> Vec<Event> {
    events
        .into_iter()
        .filter(|e| event_type.is_none_or(|t| e.event_type() == t))
        .filter(|e| date.is_none_or(|d| local_date(e.timestamp, tz) == d))
        .collect()
}

pub fn local_date<Tz: TimeZone>(timestamp: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    timestamp.with_timezone(tz).date_naive()
}

/// Local wall-clock time, e.g. "08:05".
pub fn format_clock<Tz: TimeZone>(timestamp: DateTime<Utc>, tz: &Tz) -> String {
    timestamp
        .with_timezone(tz)
        .naive_local()
        .format("%H:%M")
        .to_string()
}

/// Local date and time, e.g. "2025-03-01 08:05".
pub fn format_local<Tz: TimeZone>(timestamp: DateTime<Utc>, tz: &Tz) -> String {
    timestamp
        .with_timezone(tz)
        .naive_local()
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// "Wet diaper" or "Feed: bottle • 3 oz".
pub fn describe(event: &Event) -> String {
    match event.details() {
        Some(details) if event.event_type() != EventType::Diaper => {
            format!("{}: {details}", event.label())
        }
        _ => event.label(),
    }
}
