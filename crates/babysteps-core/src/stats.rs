//! Read-only aggregates over a baby's event history.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};
use serde::Serialize;

use crate::event::{Event, EventKind};
use crate::event_type::EventType;
use crate::types::EventId;

/// Number of calendar days in the daily breakdown.
pub const DAILY_DAYS: i64 = 7;

/// Aggregated view used by the stats screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub last_feed: Option<LastFeed>,
    pub feed_count_24h: usize,
    pub feed_count_7d: usize,
    pub diaper_count_24h: usize,
    pub diaper_count_7d: usize,
    pub sleep_minutes_24h: u32,
    pub sleep_minutes_7d: u32,
    pub events_24h: usize,
    pub events_7d: usize,
    /// Oldest day first, ending today.
    pub daily: Vec<DailyStats>,
}

impl Stats {
    /// The "N feeds • M diapers" line for the last 24 hours.
    pub fn summary_24h(&self) -> String {
        summary_label(self.events_24h, self.feed_count_24h, self.diaper_count_24h)
    }

    pub fn summary_7d(&self) -> String {
        summary_label(self.events_7d, self.feed_count_7d, self.diaper_count_7d)
    }
}

fn summary_label(events: usize, feeds: usize, diapers: usize) -> String {
    if events == 0 {
        "No activity".to_string()
    } else {
        format!("{feeds} feeds • {diapers} diapers")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastFeed {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub minutes_ago: i64,
    pub details: Option<String>,
}

/// Totals for one calendar day in the caller's zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub date: NaiveDate,
    pub feeds: usize,
    pub diapers: usize,
    pub sleep_minutes: u32,
    pub timeline: Vec<TimelinePoint>,
}

/// One event placed on the 24-hour timeline chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Local hour with minutes as a fraction, in `0.0..24.0`.
    pub hour: f64,
    /// Local clock time, e.g. "3:05 PM".
    pub time: String,
    pub details: Option<String>,
}

/// Computes stats for `events` as seen at `now` in zone `tz`.
///
/// Window counts include events strictly after `now - window`. Day buckets
/// use each event's calendar day in `tz`.
pub fn compute_stats<Tz: TimeZone>(events: &[Event], now: DateTime<Utc>, tz: &Tz) -> Stats {
    let since_24h = now - Duration::hours(24);
    let since_7d = now - Duration::days(7);
    let in_24h: Vec<&Event> = events.iter().filter(|e| e.timestamp > since_24h).collect();
    let in_7d: Vec<&Event> = events.iter().filter(|e| e.timestamp > since_7d).collect();

    let last_feed = events
        .iter()
        .filter(|e| e.event_type() == EventType::Feed)
        .max_by_key(|e| (e.timestamp, e.created_at))
        .map(|e| LastFeed {
            event_id: e.id.clone(),
            timestamp: e.timestamp,
            minutes_ago: now.signed_duration_since(e.timestamp).num_minutes().max(0),
            details: e.details(),
        });

    Stats {
        last_feed,
        feed_count_24h: count_type(&in_24h, EventType::Feed),
        feed_count_7d: count_type(&in_7d, EventType::Feed),
        diaper_count_24h: count_type(&in_24h, EventType::Diaper),
        diaper_count_7d: count_type(&in_7d, EventType::Diaper),
        sleep_minutes_24h: sleep_minutes(&in_24h),
        sleep_minutes_7d: sleep_minutes(&in_7d),
        events_24h: in_24h.len(),
        events_7d: in_7d.len(),
        daily: daily_stats(events, now, tz),
    }
}

fn count_type(events: &[&Event], event_type: EventType) -> usize {
    events
        .iter()
        .filter(|e| e.event_type() == event_type)
        .count()
}

fn sleep_minutes(events: &[&Event]) -> u32 {
    events
        .iter()
        .map(|e| match e.kind {
            EventKind::Sleep { duration_minutes } => duration_minutes,
            _ => 0,
        })
        .sum()
}

fn daily_stats<Tz: TimeZone>(events: &[Event], now: DateTime<Utc>, tz: &Tz) -> Vec<DailyStats> {
    let today = now.with_timezone(tz).date_naive();

    (0..DAILY_DAYS)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let mut day_events: Vec<&Event> = events
                .iter()
                .filter(|e| e.timestamp.with_timezone(tz).date_naive() == date)
                .collect();
            day_events.sort_by_key(|e| e.timestamp);

            let timeline = day_events
                .iter()
                .map(|e| {
                    let local = e.timestamp.with_timezone(tz).naive_local();
                    TimelinePoint {
                        event_type: e.event_type(),
                        hour: f64::from(local.hour()) + f64::from(local.minute()) / 60.0,
                        time: local.format("%-I:%M %p").to_string(),
                        details: e.details(),
                    }
                })
                .collect();

            DailyStats {
                date,
                feeds: count_type(&day_events, EventType::Feed),
                diapers: count_type(&day_events, EventType::Diaper),
                sleep_minutes: sleep_minutes(&day_events),
                timeline,
            }
        })
        .collect()
}

/// Formats minutes as "45mins", "1hr" or "2hrs 5mins".
pub fn format_duration_minutes(minutes: i64) -> String {
    fn unit(value: i64, singular: &str) -> String {
        if value == 1 {
            format!("{value}{singular}")
        } else {
            format!("{value}{singular}s")
        }
    }

    let minutes = minutes.max(0);
    if minutes < 60 {
        return unit(minutes, "min");
    }
    let hours = unit(minutes / 60, "hr");
    match minutes % 60 {
        0 => hours,
        rest => format!("{hours} {}", unit(rest, "min")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::FixedOffset;

    use crate::event::{DiaperType, FeedingMethod, NewEvent};
    use crate::session::Session;
    use crate::types::{BabyId, CaregiverId};

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn event(kind: EventKind, at: &str) -> Event {
        let session = Session::new(
            BabyId::new("baby-1").unwrap(),
            CaregiverId::new("local-user").unwrap(),
        );
        NewEvent::new(kind).at(ts(at)).into_event(&session, ts(at))
    }

    fn bottle(oz: f64, at: &str) -> Event {
        event(
            EventKind::feed_amount(FeedingMethod::Bottle, Some(oz), None),
            at,
        )
    }

    #[test]
    fn format_duration() {
        assert_eq!(format_duration_minutes(1), "1min");
        assert_eq!(format_duration_minutes(45), "45mins");
        assert_eq!(format_duration_minutes(60), "1hr");
        assert_eq!(format_duration_minutes(90), "1hr 30mins");
        assert_eq!(format_duration_minutes(125), "2hrs 5mins");
        assert_eq!(format_duration_minutes(61), "1hr 1min");
    }

    #[test]
    fn windows_use_strictly_after_boundary() {
        let now = ts("2025-03-08T12:00:00Z");
        let events = vec![
            bottle(3.0, "2025-03-08T11:00:00Z"),
            bottle(2.0, "2025-03-07T12:00:00Z"),
            bottle(4.0, "2025-03-03T12:00:00Z"),
            bottle(4.0, "2025-03-01T12:00:00Z"),
            event(EventKind::Sleep { duration_minutes: 45 }, "2025-03-08T02:00:00Z"),
            event(EventKind::Sleep { duration_minutes: 30 }, "2025-03-05T02:00:00Z"),
            event(
                EventKind::Diaper {
                    diaper_type: DiaperType::Wet,
                },
                "2025-03-08T09:00:00Z",
            ),
        ];

        let stats = compute_stats(&events, now, &Utc);
        assert_eq!(stats.feed_count_24h, 1);
        assert_eq!(stats.feed_count_7d, 3);
        assert_eq!(stats.sleep_minutes_24h, 45);
        assert_eq!(stats.sleep_minutes_7d, 75);
        assert_eq!(stats.diaper_count_24h, 1);
        assert_eq!(stats.summary_24h(), "1 feeds • 1 diapers");
    }

    #[test]
    fn last_feed_is_most_recent_by_timestamp() {
        let now = ts("2025-03-08T12:00:00Z");
        let events = vec![
            bottle(2.0, "2025-03-08T08:00:00Z"),
            bottle(3.0, "2025-03-08T10:30:00Z"),
        ];
        let last = compute_stats(&events, now, &Utc).last_feed.unwrap();
        assert_eq!(last.minutes_ago, 90);
        assert_eq!(last.details.as_deref(), Some("bottle • 3 oz"));
    }

    #[test]
    fn empty_history() {
        let stats = compute_stats(&[], ts("2025-03-08T12:00:00Z"), &Utc);
        assert_eq!(stats.last_feed, None);
        assert_eq!(stats.summary_7d(), "No activity");
        assert_eq!(stats.daily.len(), 7);
        assert!(stats.daily.iter().all(|day| day.timeline.is_empty()));
    }

    #[test]
    fn daily_buckets_follow_the_given_zone() {
        // 02:30 UTC on the 8th is still the evening of the 7th in UTC-5.
        let now = ts("2025-03-08T12:00:00Z");
        let events = vec![bottle(3.0, "2025-03-08T02:30:00Z")];
        let zone = FixedOffset::west_opt(5 * 3600).unwrap();

        let daily = compute_stats(&events, now, &zone).daily;
        assert_eq!(daily[0].date, NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
        assert_eq!(daily[6].date, NaiveDate::from_ymd_opt(2025, 3, 8).unwrap());
        assert_eq!(daily[5].feeds, 1);
        assert_eq!(daily[6].feeds, 0);

        let point = &daily[5].timeline[0];
        assert_eq!(point.event_type, EventType::Feed);
        assert!((point.hour - 21.5).abs() < f64::EPSILON);
        assert_eq!(point.time, "9:30 PM");

        let utc_daily = compute_stats(&events, now, &Utc).daily;
        assert_eq!(utc_daily[6].feeds, 1);
    }
}
