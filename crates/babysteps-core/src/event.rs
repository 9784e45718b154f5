//! Care events: the shared base record and its per-type payloads.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::event_type::EventType;
use crate::session::Session;
use crate::types::{BabyId, CaregiverId, EventId, EventSource, ValidationError, define_str_enum};

/// How long a freshly logged event can be undone.
pub const UNDO_WINDOW: Duration = Duration::seconds(10);

define_str_enum!(
    /// How a feed was given.
    FeedingMethod, "feeding method" {
        Breast => "breast",
        Bottle => "bottle",
        Formula => "formula",
        Solid => "solid",
    }
);

define_str_enum!(
    /// Breast side for nursing feeds.
    FeedSide, "feeding side" {
        Left => "left",
        Right => "right",
        Both => "both",
    }
);

define_str_enum!(
    /// Diaper contents.
    DiaperType, "diaper type" {
        Wet => "wet",
        Dirty => "dirty",
        Mixed => "mixed",
    }
);

/// A single recorded care activity.
///
/// Serializes as one flat camelCase object tagged by `type`; this snapshot
/// is what the outbox stores and what the CSV `metadata` column carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    #[serde(flatten)]
    pub kind: EventKind,
    pub baby_id: BabyId,
    pub caregiver_id: CaregiverId,
    /// When the activity happened. May be earlier than `created_at`.
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub source: EventSource,
}

/// Type-specific payload of an [`Event`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum EventKind {
    Feed {
        method: FeedingMethod,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        side: Option<FeedSide>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_minutes: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount_oz: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount_tsp: Option<f64>,
    },
    Diaper {
        diaper_type: DiaperType,
    },
    Sleep {
        duration_minutes: u32,
    },
    Pump {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_minutes: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount_oz: Option<f64>,
    },
    Med {
        medication: String,
        dose: String,
    },
    Note {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Misc {
        description: String,
    },
}

impl EventKind {
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::Feed { .. } => EventType::Feed,
            Self::Diaper { .. } => EventType::Diaper,
            Self::Sleep { .. } => EventType::Sleep,
            Self::Pump { .. } => EventType::Pump,
            Self::Med { .. } => EventType::Med,
            Self::Note { .. } => EventType::Note,
            Self::Misc { .. } => EventType::Misc,
        }
    }

    /// A feed with only a method set.
    pub const fn feed(method: FeedingMethod) -> Self {
        Self::Feed {
            method,
            side: None,
            duration_minutes: None,
            amount_oz: None,
            amount_tsp: None,
        }
    }

    /// A feed measured in ounces or teaspoons.
    pub const fn feed_amount(
        method: FeedingMethod,
        amount_oz: Option<f64>,
        amount_tsp: Option<f64>,
    ) -> Self {
        Self::Feed {
            method,
            side: None,
            duration_minutes: None,
            amount_oz,
            amount_tsp,
        }
    }

    /// Checks that required text fields are present.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Med { medication, .. } if medication.trim().is_empty() => {
                Err(ValidationError::Empty { field: "medication" })
            }
            Self::Misc { description } if description.trim().is_empty() => {
                Err(ValidationError::Empty {
                    field: "description",
                })
            }
            _ => Ok(()),
        }
    }
}

impl Event {
    pub const fn event_type(&self) -> EventType {
        self.kind.event_type()
    }

    /// Label shown in confirmations, e.g. "Wet diaper" or "Medication".
    pub fn label(&self) -> String {
        match &self.kind {
            EventKind::Diaper { diaper_type } => match diaper_type {
                DiaperType::Wet => "Wet diaper".to_string(),
                DiaperType::Dirty => "Dirty diaper".to_string(),
                DiaperType::Mixed => "Mixed diaper".to_string(),
            },
            kind => kind.event_type().label().to_string(),
        }
    }

    /// Short payload summary, e.g. "bottle • 3 oz" or "45 min".
    pub fn details(&self) -> Option<String> {
        let parts: Vec<String> = match &self.kind {
            EventKind::Feed {
                method,
                side,
                duration_minutes,
                amount_oz,
                amount_tsp,
            } => {
                let mut parts = vec![method.as_str().to_string()];
                if let Some(side) = side {
                    parts.push(capitalize(side.as_str()));
                }
                match (method, amount_tsp, amount_oz) {
                    (FeedingMethod::Solid, Some(tsp), _) => parts.push(format!("{tsp} tsp")),
                    (_, _, Some(oz)) => parts.push(format!("{oz} oz")),
                    _ => {}
                }
                if let Some(minutes) = duration_minutes {
                    parts.push(format!("{minutes} min"));
                }
                parts
            }
            EventKind::Diaper { diaper_type } => vec![diaper_type.as_str().to_string()],
            EventKind::Sleep { duration_minutes } => vec![format!("{duration_minutes} min")],
            EventKind::Pump {
                duration_minutes,
                amount_oz,
            } => {
                let mut parts = Vec::new();
                if let Some(oz) = amount_oz {
                    parts.push(format!("{oz} oz"));
                }
                if let Some(minutes) = duration_minutes {
                    parts.push(format!("{minutes} min"));
                }
                parts
            }
            EventKind::Med { medication, dose } => {
                vec![format!("{medication} {dose}").trim().to_string()]
            }
            EventKind::Note { title } => title.iter().cloned().collect(),
            EventKind::Misc { description } => vec![description.clone()],
        };
        let parts: Vec<String> = parts.into_iter().filter(|p| !p.is_empty()).collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" • "))
        }
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// A partial event as supplied by a caller, before ids and ownership are stamped.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub kind: EventKind,
    /// Occurrence time; `None` means "now".
    pub timestamp: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

impl NewEvent {
    pub const fn new(kind: EventKind) -> Self {
        Self {
            kind,
            timestamp: None,
            note: None,
        }
    }

    #[must_use]
    pub const fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }

    /// Stamps a fresh id, the session's owner fields and creation times.
    pub fn into_event(self, session: &Session, now: DateTime<Utc>) -> Event {
        Event {
            id: EventId::generate(),
            kind: self.kind,
            baby_id: session.baby_id.clone(),
            caregiver_id: session.caregiver_id.clone(),
            timestamp: self.timestamp.unwrap_or(now),
            note: self.note,
            created_at: now,
            updated_at: now,
            source: EventSource::Local,
        }
    }
}

/// Grants a short window in which a freshly logged event can be taken back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoToken {
    pub event_id: EventId,
    pub expires_at: DateTime<Utc>,
}

impl UndoToken {
    /// Token for an event, expiring [`UNDO_WINDOW`] after its creation.
    pub fn for_event(event: &Event) -> Self {
        Self {
            event_id: event.id.clone(),
            expires_at: event.created_at + UNDO_WINDOW,
        }
    }

    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Result of a successful logging operation.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedEvent {
    pub event: Event,
    pub undo: UndoToken,
}

impl LoggedEvent {
    pub fn new(event: Event) -> Self {
        let undo = UndoToken::for_event(&event);
        Self { event, undo }
    }
}
