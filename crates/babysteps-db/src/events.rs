//! Event store and outbox operations.

use babysteps_core::{
    BabyId, Event, EventId, LoggedEvent, NewEvent, OutboxId, OutboxItem, Session, UndoToken,
    ValidationError,
};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::{Change, Collection, Database, DbError, decode, format_timestamp, parse_timestamp};

impl Database {
    /// Inserts or fully replaces an event by id. Never touches the outbox.
    pub fn put_event(&mut self, event: &Event) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        write_event(&tx, event)?;
        tx.commit()?;
        self.notify(&[Change::new(Collection::Events, Some(event.baby_id.clone()))]);
        Ok(())
    }

    /// Inserts or replaces a batch of events in one transaction.
    ///
    /// Later duplicates in the batch overwrite earlier ones. Any failure
    /// rolls back the whole batch. Returns the number of distinct ids written.
    pub fn put_events(&mut self, events: &[Event]) -> Result<usize, DbError> {
        if events.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        for event in events {
            write_event(&tx, event)?;
        }
        tx.commit()?;

        self.notify_batch(events.iter());
        let stored = distinct_ids(events.iter());
        tracing::debug!(count = stored, "stored event batch");
        Ok(stored)
    }

    /// Stores a batch of imported events, skipping the ones that cannot be
    /// stored.
    ///
    /// Events that fail validation or would change the type of an existing
    /// id, including one written earlier in the same batch, are returned in
    /// [`ImportedEvents::rejected`]. Storage failures still abort the batch.
    pub fn import_events(&mut self, events: &[Event]) -> Result<ImportedEvents, DbError> {
        let mut stored = Vec::new();
        let mut rejected = Vec::new();
        let tx = self.conn.transaction()?;
        for (index, event) in events.iter().enumerate() {
            match write_event(&tx, event) {
                Ok(()) => stored.push(event),
                Err(error @ (DbError::Validation(_) | DbError::EventTypeChanged { .. })) => {
                    tracing::debug!(event_id = %event.id, %error, "rejected imported event");
                    rejected.push(RejectedEvent { index, error });
                }
                Err(error) => return Err(error),
            }
        }
        tx.commit()?;

        self.notify_batch(stored.iter().copied());
        let imported = ImportedEvents {
            stored: distinct_ids(stored.iter().copied()),
            rejected,
        };
        tracing::debug!(
            stored = imported.stored,
            rejected = imported.rejected.len(),
            "imported event batch"
        );
        Ok(imported)
    }

    fn notify_batch<'a>(&mut self, events: impl Iterator<Item = &'a Event>) {
        let mut babies: Vec<BabyId> = events.map(|e| e.baby_id.clone()).collect();
        babies.sort();
        babies.dedup();
        let changes: Vec<Change> = babies
            .into_iter()
            .map(|baby_id| Change::new(Collection::Events, Some(baby_id)))
            .collect();
        self.notify(&changes);
    }

    /// Logs a new event for the session, stamped at the current time.
    pub fn log_event(&mut self, session: &Session, new: NewEvent) -> Result<LoggedEvent, DbError> {
        self.log_event_at(session, new, Utc::now())
    }

    /// Logs a new event and its outbox snapshot in one transaction.
    pub fn log_event_at(
        &mut self,
        session: &Session,
        new: NewEvent,
        now: DateTime<Utc>,
    ) -> Result<LoggedEvent, DbError> {
        let event = new.into_event(session, now);

        let tx = self.conn.transaction()?;
        write_event(&tx, &event)?;
        enqueue(&tx, &OutboxItem::for_event(&event, now))?;
        tx.commit()?;

        tracing::info!(event_id = %event.id, event_type = %event.event_type(), "logged event");
        self.notify(&logged_changes(&event));
        Ok(LoggedEvent::new(event))
    }

    /// Deletes an event and its outbox item. Returns whether anything was removed.
    pub fn remove_event(&mut self, id: &EventId) -> Result<bool, DbError> {
        let tx = self.conn.transaction()?;
        let baby_id: Option<String> = tx
            .query_row(
                "SELECT baby_id FROM events WHERE id = ?",
                [id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        tx.execute("DELETE FROM outbox WHERE event_id = ?", [id.as_str()])?;
        let removed = tx.execute("DELETE FROM events WHERE id = ?", [id.as_str()])? > 0;
        tx.commit()?;

        if removed {
            tracing::info!(event_id = %id, "removed event");
            let baby_id = baby_id.and_then(|b| BabyId::new(b).ok());
            self.notify(&[
                Change::new(Collection::Events, baby_id.clone()),
                Change::new(Collection::Outbox, baby_id),
            ]);
        } else {
            tracing::debug!(event_id = %id, "event not found, nothing to remove");
        }
        Ok(removed)
    }

    /// Takes back a freshly logged event while its undo window is open.
    pub fn undo(&mut self, token: &UndoToken) -> Result<bool, DbError> {
        self.undo_at(token, Utc::now())
    }

    pub fn undo_at(&mut self, token: &UndoToken, now: DateTime<Utc>) -> Result<bool, DbError> {
        if !token.is_available(now) {
            return Err(DbError::UndoExpired {
                event_id: token.event_id.clone(),
            });
        }
        self.remove_event(&token.event_id)
    }

    pub fn get_event(&self, id: &EventId) -> Result<Option<Event>, DbError> {
        let data: Option<String> = self
            .conn
            .query_row("SELECT data FROM events WHERE id = ?", [id.as_str()], |row| {
                row.get(0)
            })
            .optional()?;
        data.map(|data| decode(id.as_str(), &data)).transpose()
    }

    /// Lists the baby's events, most recent occurrence first.
    pub fn query_events(&self, baby_id: &BabyId) -> Result<Vec<Event>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, data
            FROM events
            WHERE baby_id = ?
            ORDER BY timestamp DESC, created_at DESC, id ASC
            ",
        )?;
        let rows = stmt.query_map([baby_id.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut events = Vec::new();
        for row in rows {
            let (id, data) = row?;
            events.push(decode(&id, &data)?);
        }
        Ok(events)
    }

    /// The most recently created local event for the baby.
    pub fn last_created_event(&self, baby_id: &BabyId) -> Result<Option<Event>, DbError> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "
                SELECT id, data
                FROM events
                WHERE baby_id = ? AND source = 'local'
                ORDER BY created_at DESC, id ASC
                LIMIT 1
                ",
                [baby_id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        row.map(|(id, data)| decode(&id, &data)).transpose()
    }

    /// Occurrence time of the latest event across all babies.
    pub fn latest_event_time(&self) -> Result<Option<DateTime<Utc>>, DbError> {
        let latest: Option<String> =
            self.conn
                .query_row("SELECT MAX(timestamp) FROM events", [], |row| row.get(0))?;
        latest
            .map(|timestamp| parse_timestamp(&timestamp, "events"))
            .transpose()
    }

    /// Removes every event and outbox item. Returns the number of events removed.
    pub fn clear_events(&mut self) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM outbox", [])?;
        let removed = tx.execute("DELETE FROM events", [])?;
        tx.commit()?;
        tracing::info!(removed, "cleared events");
        self.notify(&[
            Change::new(Collection::Events, None),
            Change::new(Collection::Outbox, None),
        ]);
        Ok(removed)
    }

    /// Empties every collection and removes the profile register.
    pub fn reset_all(&mut self) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "
            DELETE FROM outbox;
            DELETE FROM events;
            DELETE FROM timers;
            DELETE FROM invites;
            DELETE FROM registers;
            ",
        )?;
        tx.commit()?;
        tracing::info!("reset all data");
        self.notify(&[
            Change::new(Collection::Events, None),
            Change::new(Collection::Timers, None),
            Change::new(Collection::Outbox, None),
            Change::new(Collection::Invites, None),
            Change::new(Collection::Profile, None),
        ]);
        Ok(())
    }

    /// Lists outbox items in the order they were queued.
    pub fn list_outbox(&self) -> Result<Vec<OutboxItem>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, event_id, payload, created_at
            FROM outbox
            ORDER BY created_at ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(OutboxRow {
                id: row.get(0)?,
                event_id: row.get(1)?,
                payload: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?.into_item()?);
        }
        Ok(items)
    }

    pub fn outbox_for_event(&self, event_id: &EventId) -> Result<Option<OutboxItem>, DbError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, event_id, payload, created_at FROM outbox WHERE event_id = ?",
                [event_id.as_str()],
                |row| {
                    Ok(OutboxRow {
                        id: row.get(0)?,
                        event_id: row.get(1)?,
                        payload: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        row.map(OutboxRow::into_item).transpose()
    }
}

/// Outcome of [`Database::import_events`].
#[derive(Debug)]
pub struct ImportedEvents {
    /// Distinct ids written.
    pub stored: usize,
    pub rejected: Vec<RejectedEvent>,
}

/// An event left out of an import batch.
#[derive(Debug)]
pub struct RejectedEvent {
    /// Position in the batch.
    pub index: usize,
    pub error: DbError,
}

fn distinct_ids<'a>(events: impl Iterator<Item = &'a Event>) -> usize {
    let mut ids: Vec<&str> = events.map(|e| e.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    ids.len()
}

pub(crate) fn logged_changes(event: &Event) -> [Change; 2] {
    [
        Change::new(Collection::Events, Some(event.baby_id.clone())),
        Change::new(Collection::Outbox, Some(event.baby_id.clone())),
    ]
}

/// Upserts an event row, refusing to change the type of an existing id.
pub(crate) fn write_event(conn: &Connection, event: &Event) -> Result<(), DbError> {
    event.kind.validate()?;
    let requested = event.event_type().as_str();
    let existing: Option<String> = conn
        .query_row(
            "SELECT type FROM events WHERE id = ?",
            [event.id.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(existing) = existing.filter(|existing| existing != requested) {
        return Err(DbError::EventTypeChanged {
            event_id: event.id.clone(),
            existing,
            requested: requested.to_string(),
        });
    }

    let data = serde_json::to_string(event)?;
    conn.execute(
        "
        INSERT INTO events
        (id, timestamp, type, baby_id, caregiver_id, source, created_at, updated_at, data)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            timestamp = excluded.timestamp,
            baby_id = excluded.baby_id,
            caregiver_id = excluded.caregiver_id,
            source = excluded.source,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at,
            data = excluded.data
        ",
        params![
            event.id.as_str(),
            format_timestamp(event.timestamp),
            requested,
            event.baby_id.as_str(),
            event.caregiver_id.as_str(),
            event.source.as_str(),
            format_timestamp(event.created_at),
            format_timestamp(event.updated_at),
            data,
        ],
    )?;
    Ok(())
}

pub(crate) fn enqueue(conn: &Connection, item: &OutboxItem) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO outbox (id, event_id, payload, created_at) VALUES (?, ?, ?, ?)",
        params![
            item.id.as_str(),
            item.event_id.as_str(),
            serde_json::to_string(&item.payload)?,
            format_timestamp(item.created_at),
        ],
    )?;
    Ok(())
}

struct OutboxRow {
    id: String,
    event_id: String,
    payload: String,
    created_at: String,
}

impl OutboxRow {
    fn into_item(self) -> Result<OutboxItem, DbError> {
        let invalid = |e: ValidationError| DbError::InvalidRecord {
            id: self.id.clone(),
            message: e.to_string(),
        };
        Ok(OutboxItem {
            id: OutboxId::new(self.id.clone()).map_err(invalid)?,
            event_id: EventId::new(self.event_id.clone()).map_err(invalid)?,
            payload: decode(&self.id, &self.payload)?,
            created_at: parse_timestamp(&self.created_at, &self.id)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use babysteps_core::{DiaperType, EventKind, EventSource, FeedingMethod, UNDO_WINDOW};
    use chrono::Duration;

    use crate::test_support::{session, ts};

    fn bottle(oz: f64) -> NewEvent {
        NewEvent::new(EventKind::feed_amount(FeedingMethod::Bottle, Some(oz), None))
    }

    fn wet() -> NewEvent {
        NewEvent::new(EventKind::Diaper {
            diaper_type: DiaperType::Wet,
        })
    }

    #[test]
    fn logged_event_is_queryable_with_one_outbox_item() {
        let mut db = Database::open_in_memory().unwrap();
        let now = ts("2025-03-01T08:00:00Z");
        let logged = db.log_event_at(&session(), bottle(3.0), now).unwrap();

        let events = db.query_events(&session().baby_id).unwrap();
        assert_eq!(events, vec![logged.event.clone()]);
        assert_eq!(logged.event.source, EventSource::Local);
        assert_eq!(logged.undo.expires_at, now + UNDO_WINDOW);

        let outbox = db.list_outbox().unwrap();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].event_id, logged.event.id);
        assert_eq!(outbox[0].payload, logged.event);
        assert_eq!(
            db.outbox_for_event(&logged.event.id).unwrap().unwrap(),
            outbox[0]
        );
    }

    #[test]
    fn remove_event_drops_outbox_item() {
        let mut db = Database::open_in_memory().unwrap();
        let logged = db.log_event(&session(), wet()).unwrap();

        assert!(db.remove_event(&logged.event.id).unwrap());
        assert!(db.get_event(&logged.event.id).unwrap().is_none());
        assert!(db.outbox_for_event(&logged.event.id).unwrap().is_none());
        assert!(!db.remove_event(&logged.event.id).unwrap());
    }

    #[test]
    fn undo_inside_window_removes_event() {
        let mut db = Database::open_in_memory().unwrap();
        let now = ts("2025-03-01T08:00:00Z");
        let logged = db.log_event_at(&session(), wet(), now).unwrap();

        let removed = db
            .undo_at(&logged.undo, now + Duration::seconds(9))
            .unwrap();
        assert!(removed);
        assert_eq!(db.counts().unwrap().outbox, 0);
    }

    #[test]
    fn undo_after_window_fails() {
        let mut db = Database::open_in_memory().unwrap();
        let now = ts("2025-03-01T08:00:00Z");
        let logged = db.log_event_at(&session(), wet(), now).unwrap();

        let err = db
            .undo_at(&logged.undo, now + Duration::seconds(10))
            .unwrap_err();
        assert!(matches!(err, DbError::UndoExpired { .. }));
        assert!(db.get_event(&logged.event.id).unwrap().is_some());
    }

    #[test]
    fn query_orders_by_timestamp_then_created_at() {
        let mut db = Database::open_in_memory().unwrap();
        let now = ts("2025-03-01T12:00:00Z");
        let early = ts("2025-03-01T06:00:00Z");

        let backdated = db.log_event_at(&session(), wet().at(early), now).unwrap();
        let same_time_later = db
            .log_event_at(&session(), bottle(2.0).at(early), now + Duration::seconds(1))
            .unwrap();
        let latest = db.log_event_at(&session(), bottle(4.0), now).unwrap();

        let ids: Vec<EventId> = db
            .query_events(&session().baby_id)
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(
            ids,
            vec![latest.event.id, same_time_later.event.id, backdated.event.id]
        );
    }

    #[test]
    fn query_is_scoped_to_baby() {
        let mut db = Database::open_in_memory().unwrap();
        db.log_event(&session(), wet()).unwrap();
        let other = BabyId::new("baby-2").unwrap();
        assert!(db.query_events(&other).unwrap().is_empty());
    }

    #[test]
    fn put_overwrites_without_enqueueing() {
        let mut db = Database::open_in_memory().unwrap();
        let mut event = bottle(2.0).into_event(&session(), ts("2025-03-01T08:00:00Z"));
        db.put_event(&event).unwrap();

        event.note = Some("spit up".to_string());
        assert_eq!(db.put_events(&[event.clone(), event.clone()]).unwrap(), 1);

        let events = db.query_events(&session().baby_id).unwrap();
        assert_eq!(events, vec![event]);
        assert!(db.list_outbox().unwrap().is_empty());
    }

    #[test]
    fn put_refuses_type_change() {
        let mut db = Database::open_in_memory().unwrap();
        let event = bottle(2.0).into_event(&session(), ts("2025-03-01T08:00:00Z"));
        db.put_event(&event).unwrap();

        let mut changed = event.clone();
        changed.kind = EventKind::Sleep {
            duration_minutes: 30,
        };
        let err = db.put_event(&changed).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "event {} is a feed event and cannot become sleep",
                event.id
            )
        );
        assert_eq!(db.get_event(&event.id).unwrap(), Some(event));
    }

    #[test]
    fn import_skips_type_conflicts_and_keeps_the_rest() {
        let mut db = Database::open_in_memory().unwrap();
        let now = ts("2025-03-01T08:00:00Z");
        let stored = bottle(2.0).into_event(&session(), now);
        db.put_event(&stored).unwrap();

        let mut against_store = stored.clone();
        against_store.kind = EventKind::Sleep {
            duration_minutes: 30,
        };
        let diaper = wet().into_event(&session(), now);
        let mut against_batch = diaper.clone();
        against_batch.kind = EventKind::Sleep {
            duration_minutes: 10,
        };
        let fresh = bottle(3.0).into_event(&session(), now);

        let imported = db
            .import_events(&[
                against_store,
                diaper.clone(),
                against_batch,
                fresh.clone(),
                fresh.clone(),
            ])
            .unwrap();
        assert_eq!(imported.stored, 2);
        let rejected: Vec<usize> = imported.rejected.iter().map(|r| r.index).collect();
        assert_eq!(rejected, vec![0, 2]);
        assert!(matches!(
            imported.rejected[0].error,
            DbError::EventTypeChanged { .. }
        ));

        assert_eq!(db.get_event(&stored.id).unwrap(), Some(stored));
        assert_eq!(db.get_event(&diaper.id).unwrap(), Some(diaper));
        assert_eq!(db.get_event(&fresh.id).unwrap(), Some(fresh));
        assert_eq!(db.counts().unwrap().events, 3);
        assert!(db.list_outbox().unwrap().is_empty());
    }

    #[test]
    fn import_rejects_invalid_events() {
        let mut db = Database::open_in_memory().unwrap();
        let mut blank = NewEvent::new(EventKind::Misc {
            description: "tummy time".to_string(),
        })
        .into_event(&session(), ts("2025-03-01T08:00:00Z"));
        blank.kind = EventKind::Misc {
            description: " ".to_string(),
        };

        let imported = db.import_events(&[blank]).unwrap();
        assert_eq!(imported.stored, 0);
        assert!(matches!(imported.rejected[0].error, DbError::Validation(_)));
        assert_eq!(db.counts().unwrap().events, 0);
    }

    #[test]
    fn log_rejects_blank_misc_description() {
        let mut db = Database::open_in_memory().unwrap();
        let err = db
            .log_event(
                &session(),
                NewEvent::new(EventKind::Misc {
                    description: "  ".to_string(),
                }),
            )
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert_eq!(db.counts().unwrap().events, 0);
    }

    #[test]
    fn second_outbox_item_for_same_event_is_rejected() {
        let mut db = Database::open_in_memory().unwrap();
        let logged = db.log_event(&session(), wet()).unwrap();
        let duplicate = OutboxItem::for_event(&logged.event, Utc::now());
        assert!(enqueue(&db.conn, &duplicate).is_err());
        assert_eq!(db.list_outbox().unwrap().len(), 1);
    }

    #[test]
    fn last_created_event_ignores_timestamp() {
        let mut db = Database::open_in_memory().unwrap();
        let now = ts("2025-03-01T12:00:00Z");
        db.log_event_at(&session(), bottle(2.0), now).unwrap();
        let backdated = db
            .log_event_at(
                &session(),
                wet().at(ts("2025-02-28T12:00:00Z")),
                now + Duration::seconds(5),
            )
            .unwrap();

        let last = db.last_created_event(&session().baby_id).unwrap().unwrap();
        assert_eq!(last.id, backdated.event.id);
        assert_eq!(db.latest_event_time().unwrap(), Some(now));
    }

    #[test]
    fn clear_events_empties_events_and_outbox() {
        let mut db = Database::open_in_memory().unwrap();
        db.log_event(&session(), wet()).unwrap();
        db.log_event(&session(), bottle(1.0)).unwrap();

        assert_eq!(db.clear_events().unwrap(), 2);
        let counts = db.counts().unwrap();
        assert_eq!(counts.events, 0);
        assert_eq!(counts.outbox, 0);
    }

    #[test]
    fn subscribers_hear_about_logged_events() {
        let mut db = Database::open_in_memory().unwrap();
        let changes = db.subscribe();
        db.log_event(&session(), wet()).unwrap();

        let received: Vec<Change> = changes.try_iter().collect();
        assert_eq!(
            received,
            vec![
                Change::new(Collection::Events, Some(session().baby_id)),
                Change::new(Collection::Outbox, Some(session().baby_id)),
            ]
        );
    }
}
