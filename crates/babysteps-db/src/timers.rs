//! Active timer lifecycle.

use babysteps_core::{
    ActiveTimer, BabyId, CaregiverId, LoggedEvent, OutboxItem, Session, TimerId, TimerMetadata,
    TimerType, ValidationError,
};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};

use crate::events::{enqueue, logged_changes, write_event};
use crate::{Change, Collection, Database, DbError, decode, format_timestamp, parse_timestamp};

const TIMER_COLUMNS: &str = "id, baby_id, caregiver_id, type, started_at, metadata";

impl Database {
    /// Starts a timer for the session at the current time.
    pub fn start_timer(
        &mut self,
        session: &Session,
        timer_type: TimerType,
        metadata: TimerMetadata,
    ) -> Result<ActiveTimer, DbError> {
        self.start_timer_at(session, timer_type, metadata, Utc::now())
    }

    /// Starts a timer, failing if one of the same type is already running
    /// for the session's baby.
    ///
    /// The slot check and the insert run under one write lock, so two
    /// connections cannot both claim the slot.
    pub fn start_timer_at(
        &mut self,
        session: &Session,
        timer_type: TimerType,
        metadata: TimerMetadata,
        now: DateTime<Utc>,
    ) -> Result<ActiveTimer, DbError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if let Some(running) = load_running_timer(&tx, &session.baby_id, timer_type)? {
            return Err(DbError::TimerAlreadyRunning {
                timer_type,
                timer_id: running.id.to_string(),
            });
        }
        let timer = ActiveTimer::start(session, timer_type, metadata, now);
        store_timer(&tx, &timer)?;
        tx.commit()?;

        tracing::info!(timer_id = %timer.id, timer_type = %timer_type, "started timer");
        self.notify(&[Change::new(Collection::Timers, Some(timer.baby_id.clone()))]);
        Ok(timer)
    }

    /// Stores a timer row as given, replacing any row with the same id.
    pub fn insert_timer(&mut self, timer: &ActiveTimer) -> Result<(), DbError> {
        store_timer(&self.conn, timer)?;
        self.notify(&[Change::new(Collection::Timers, Some(timer.baby_id.clone()))]);
        Ok(())
    }

    pub fn get_timer(&self, id: &TimerId) -> Result<Option<ActiveTimer>, DbError> {
        load_timer(&self.conn, id)
    }

    /// Lists the baby's running timers, oldest first.
    pub fn query_timers(&self, baby_id: &BabyId) -> Result<Vec<ActiveTimer>, DbError> {
        load_timers(&self.conn, baby_id)
    }

    /// The running timer of `timer_type` for the baby, if any.
    pub fn running_timer(
        &self,
        baby_id: &BabyId,
        timer_type: TimerType,
    ) -> Result<Option<ActiveTimer>, DbError> {
        load_running_timer(&self.conn, baby_id, timer_type)
    }

    /// Stops a timer at the current time and logs the event it produces.
    pub fn stop_timer(
        &mut self,
        id: &TimerId,
        extra: &TimerMetadata,
    ) -> Result<Option<LoggedEvent>, DbError> {
        self.stop_timer_at(id, extra, Utc::now())
    }

    /// Converts a timer into an event.
    ///
    /// The timer lookup, delete, event write and outbox write share one
    /// immediate transaction. An unknown id, or a timer another connection
    /// already stopped, is a no-op returning `None`.
    pub fn stop_timer_at(
        &mut self,
        id: &TimerId,
        extra: &TimerMetadata,
        now: DateTime<Utc>,
    ) -> Result<Option<LoggedEvent>, DbError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(timer) = load_timer(&tx, id)? else {
            tracing::debug!(timer_id = %id, "timer not found, nothing to stop");
            return Ok(None);
        };
        if tx.execute("DELETE FROM timers WHERE id = ?", [id.as_str()])? == 0 {
            tracing::debug!(timer_id = %id, "timer already removed, nothing to stop");
            return Ok(None);
        }
        let session = Session::new(timer.baby_id.clone(), timer.caregiver_id.clone());
        let event = timer.finish(extra, now).into_event(&session, now);
        write_event(&tx, &event)?;
        enqueue(&tx, &OutboxItem::for_event(&event, now))?;
        tx.commit()?;

        tracing::info!(
            timer_id = %id,
            event_id = %event.id,
            duration_minutes = timer.elapsed_minutes(now),
            "stopped timer"
        );
        let [events, outbox] = logged_changes(&event);
        self.notify(&[
            Change::new(Collection::Timers, Some(timer.baby_id)),
            events,
            outbox,
        ]);
        Ok(Some(LoggedEvent::new(event)))
    }

    /// Discards a timer without producing an event.
    pub fn cancel_timer(&mut self, id: &TimerId) -> Result<bool, DbError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(timer) = load_timer(&tx, id)? else {
            tracing::debug!(timer_id = %id, "timer not found, nothing to cancel");
            return Ok(false);
        };
        if tx.execute("DELETE FROM timers WHERE id = ?", [id.as_str()])? == 0 {
            return Ok(false);
        }
        tx.commit()?;

        tracing::info!(timer_id = %id, "canceled timer");
        self.notify(&[Change::new(Collection::Timers, Some(timer.baby_id))]);
        Ok(true)
    }
}

fn store_timer(conn: &Connection, timer: &ActiveTimer) -> Result<(), DbError> {
    conn.execute(
        "
        INSERT OR REPLACE INTO timers (id, baby_id, caregiver_id, type, started_at, metadata)
        VALUES (?, ?, ?, ?, ?, ?)
        ",
        params![
            timer.id.as_str(),
            timer.baby_id.as_str(),
            timer.caregiver_id.as_str(),
            timer.timer_type.as_str(),
            format_timestamp(timer.started_at),
            serde_json::to_string(&timer.metadata)?,
        ],
    )?;
    Ok(())
}

fn load_timer(conn: &Connection, id: &TimerId) -> Result<Option<ActiveTimer>, DbError> {
    let row = conn
        .query_row(
            &format!("SELECT {TIMER_COLUMNS} FROM timers WHERE id = ?"),
            [id.as_str()],
            TimerRow::from_row,
        )
        .optional()?;
    row.map(TimerRow::into_timer).transpose()
}

fn load_timers(conn: &Connection, baby_id: &BabyId) -> Result<Vec<ActiveTimer>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TIMER_COLUMNS} FROM timers WHERE baby_id = ? ORDER BY started_at ASC, id ASC"
    ))?;
    let rows = stmt.query_map([baby_id.as_str()], TimerRow::from_row)?;
    let mut timers = Vec::new();
    for row in rows {
        timers.push(row?.into_timer()?);
    }
    Ok(timers)
}

fn load_running_timer(
    conn: &Connection,
    baby_id: &BabyId,
    timer_type: TimerType,
) -> Result<Option<ActiveTimer>, DbError> {
    Ok(load_timers(conn, baby_id)?
        .into_iter()
        .find(|timer| timer.timer_type == timer_type))
}

struct TimerRow {
    id: String,
    baby_id: String,
    caregiver_id: String,
    timer_type: String,
    started_at: String,
    metadata: String,
}

impl TimerRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            baby_id: row.get(1)?,
            caregiver_id: row.get(2)?,
            timer_type: row.get(3)?,
            started_at: row.get(4)?,
            metadata: row.get(5)?,
        })
    }

    fn into_timer(self) -> Result<ActiveTimer, DbError> {
        let invalid = |e: ValidationError| DbError::InvalidRecord {
            id: self.id.clone(),
            message: e.to_string(),
        };
        Ok(ActiveTimer {
            id: TimerId::new(self.id.clone()).map_err(invalid)?,
            baby_id: BabyId::new(self.baby_id.clone()).map_err(invalid)?,
            caregiver_id: CaregiverId::new(self.caregiver_id.clone()).map_err(invalid)?,
            timer_type: self.timer_type.parse().map_err(invalid)?,
            started_at: parse_timestamp(&self.started_at, &self.id)?,
            metadata: decode(&self.id, &self.metadata)?,
        })
    }
}
