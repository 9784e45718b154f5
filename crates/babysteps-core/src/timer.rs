//! In-progress activities that become events when stopped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{EventKind, FeedSide, FeedingMethod, NewEvent};
use crate::event_type::EventType;
use crate::session::Session;
use crate::types::{BabyId, CaregiverId, TimerId, define_str_enum};

define_str_enum!(
    /// Activities that can be timed.
    TimerType, "timer type" {
        Feed => "feed",
        Sleep => "sleep",
    }
);

impl TimerType {
    pub const fn event_type(self) -> EventType {
        match self {
            Self::Feed => EventType::Feed,
            Self::Sleep => EventType::Sleep,
        }
    }
}

/// Opaque key/value bag attached to a timer (method, side, note, planned duration).
pub type TimerMetadata = serde_json::Map<String, Value>;

/// A running activity that has not been turned into an event yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTimer {
    pub id: TimerId,
    pub baby_id: BabyId,
    pub caregiver_id: CaregiverId,
    #[serde(rename = "type")]
    pub timer_type: TimerType,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: TimerMetadata,
}

impl ActiveTimer {
    /// Creates a running timer for the session, started at `now`.
    pub fn start(
        session: &Session,
        timer_type: TimerType,
        metadata: TimerMetadata,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TimerId::generate(),
            baby_id: session.baby_id.clone(),
            caregiver_id: session.caregiver_id.clone(),
            timer_type,
            started_at: now,
            metadata,
        }
    }

    /// Whole minutes the timer would record if stopped at `now`.
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> u32 {
        timer_duration_minutes(self.started_at, now)
    }

    /// Converts the timer into the event it represents.
    ///
    /// `extra` is merged over the timer's own metadata; keys given at stop
    /// time win. The event is timestamped at `ended_at`.
    pub fn finish(&self, extra: &TimerMetadata, ended_at: DateTime<Utc>) -> NewEvent {
        let mut metadata = self.metadata.clone();
        for (key, value) in extra {
            metadata.insert(key.clone(), value.clone());
        }

        let duration_minutes = self.elapsed_minutes(ended_at);
        let kind = match self.timer_type {
            TimerType::Feed => EventKind::Feed {
                method: metadata_enum(&metadata, "method").unwrap_or(FeedingMethod::Breast),
                side: metadata_enum::<FeedSide>(&metadata, "side"),
                duration_minutes: Some(duration_minutes),
                amount_oz: None,
                amount_tsp: None,
            },
            TimerType::Sleep => EventKind::Sleep { duration_minutes },
        };
        let note = metadata
            .get("note")
            .and_then(Value::as_str)
            .filter(|note| !note.is_empty())
            .map(str::to_string);

        NewEvent::new(kind).at(ended_at).with_note(note)
    }
}

fn metadata_enum<T: std::str::FromStr>(metadata: &TimerMetadata, key: &str) -> Option<T> {
    metadata
        .get(key)
        .and_then(Value::as_str)
        .and_then(|value| value.parse().ok())
}

/// Duration recorded for a timer: elapsed minutes rounded half-up, never below 1.
pub fn timer_duration_minutes(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> u32 {
    let elapsed_ms = ended_at
        .signed_duration_since(started_at)
        .num_milliseconds()
        .max(0);
    let minutes = (elapsed_ms + 30_000) / 60_000;
    u32::try_from(minutes).unwrap_or(u32::MAX).max(1)
}
