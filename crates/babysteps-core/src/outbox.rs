//! Staging records for events awaiting external delivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::types::{EventId, OutboxId};

/// One queued snapshot of a newly logged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxItem {
    pub id: OutboxId,
    /// Back-reference to the logged event.
    pub event_id: EventId,
    /// The event exactly as it was when enqueued.
    pub payload: Event,
    pub created_at: DateTime<Utc>,
}

impl OutboxItem {
    pub fn for_event(event: &Event, now: DateTime<Utc>) -> Self {
        Self {
            id: OutboxId::generate(),
            event_id: event.id.clone(),
            payload: event.clone(),
            created_at: now,
        }
    }
}
