//! Storage layer for babysteps.
//!
//! Provides persistence for events, timers, the outbox, invites and the
//! profile register using `rusqlite`.
//!
//! # Thread Safety
//!
//! [`Database`] wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A single caregiver device drives one `Database`; other processes may open
//! their own connection to the same file. File databases run in WAL mode so
//! those readers never observe a half-applied write.
//!
//! # Schema
//!
//! Timestamps are stored as TEXT in RFC 3339 UTC with nanosecond precision
//! (e.g. `2025-01-15T10:30:00.000000000Z`), so lexicographic order matches
//! chronological order. Every table keeps the full JSON snapshot of its
//! record in a data column; the other columns exist for filtering and
//! ordering.
//!
//! # Change notifications
//!
//! [`Database::subscribe`] hands out a channel that receives a [`Change`]
//! after every committed write. Subscribers re-query the collection they
//! care about.

mod events;
mod registers;
mod timers;

use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use babysteps_core::{BabyId, EventId, TimerType, ValidationError};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use thiserror::Error;

pub use events::{ImportedEvents, RejectedEvent};
pub use registers::host_timezone;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A record could not be encoded as JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored record could not be decoded.
    #[error("invalid stored record {id}: {message}")]
    InvalidRecord { id: String, message: String },

    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for {id}: {timestamp}")]
    TimestampParse {
        id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },

    /// A timer of this type is already running for the baby.
    #[error("a {timer_type} timer is already running ({timer_id})")]
    TimerAlreadyRunning {
        timer_type: TimerType,
        timer_id: String,
    },

    /// The undo window for an event has passed.
    #[error("undo window for event {event_id} has expired")]
    UndoExpired { event_id: EventId },

    /// An overwrite tried to change the type of an existing event.
    #[error("event {event_id} is a {existing} event and cannot become {requested}")]
    EventTypeChanged {
        event_id: EventId,
        existing: String,
        requested: String,
    },

    /// Input failed domain validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// A collection touched by a committed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Events,
    Timers,
    Outbox,
    Invites,
    Profile,
}

/// Notification sent to subscribers after a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub collection: Collection,
    /// The baby whose records changed, when the write was scoped to one.
    pub baby_id: Option<BabyId>,
}

impl Change {
    pub const fn new(collection: Collection, baby_id: Option<BabyId>) -> Self {
        Self {
            collection,
            baby_id,
        }
    }
}

/// Receiving end of a change subscription.
pub type Subscription = mpsc::Receiver<Change>;

/// Record counts per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionCounts {
    pub events: usize,
    pub timers: usize,
    pub outbox: usize,
    pub invites: usize,
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety and notifications.
pub struct Database {
    conn: Connection,
    subscribers: Vec<mpsc::Sender<Change>>,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is initialized on first open and the journal switched to WAL.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!(path = %path.display(), journal_mode = %mode, "opened database");
        let db = Self::from_connection(conn);
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let db = Self::from_connection(Connection::open_in_memory()?);
        db.init()?;
        Ok(db)
    }

    const fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            subscribers: Vec::new(),
        }
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Events: immutable-once-created care records
            -- data: full JSON snapshot of the event
            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                timestamp TEXT NOT NULL,
                type TEXT NOT NULL,
                baby_id TEXT NOT NULL,
                caregiver_id TEXT NOT NULL,
                source TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);
            CREATE INDEX IF NOT EXISTS idx_events_type ON events(type);
            CREATE INDEX IF NOT EXISTS idx_events_baby ON events(baby_id);

            -- Timers: in-progress activities; metadata is a JSON object
            CREATE TABLE IF NOT EXISTS timers (
                id TEXT PRIMARY KEY,
                baby_id TEXT NOT NULL,
                caregiver_id TEXT NOT NULL,
                type TEXT NOT NULL,
                started_at TEXT NOT NULL,
                metadata TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_timers_baby ON timers(baby_id);
            CREATE INDEX IF NOT EXISTS idx_timers_caregiver ON timers(caregiver_id);

            -- Outbox: one snapshot per locally logged event
            CREATE TABLE IF NOT EXISTS outbox (
                id TEXT PRIMARY KEY,
                event_id TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_outbox_event ON outbox(event_id);

            CREATE TABLE IF NOT EXISTS invites (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                role TEXT NOT NULL,
                created_at TEXT NOT NULL,
                status TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_invites_email ON invites(email);
            CREATE INDEX IF NOT EXISTS idx_invites_status ON invites(status);
            CREATE INDEX IF NOT EXISTS idx_invites_created ON invites(created_at);

            -- Registers: small keyed JSON values (the baby profile)
            CREATE TABLE IF NOT EXISTS registers (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Returns a channel that receives a [`Change`] after every committed write.
    pub fn subscribe(&mut self) -> Subscription {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Sends `changes` to every live subscriber, dropping disconnected ones.
    fn notify(&mut self, changes: &[Change]) {
        if changes.is_empty() {
            return;
        }
        self.subscribers
            .retain(|tx| changes.iter().all(|change| tx.send(change.clone()).is_ok()));
    }

    /// Counts the records in each collection.
    pub fn counts(&self) -> Result<CollectionCounts, DbError> {
        Ok(CollectionCounts {
            events: self.count_rows("events")?,
            timers: self.count_rows("timers")?,
            outbox: self.count_rows("outbox")?,
            invites: self.count_rows("invites")?,
        })
    }

    fn count_rows(&self, table: &str) -> Result<usize, DbError> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(timestamp: &str, id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            id: id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn decode<T: serde::de::DeserializeOwned>(id: &str, data: &str) -> Result<T, DbError> {
    serde_json::from_str(data).map_err(|e| DbError::InvalidRecord {
        id: id.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use babysteps_core::{BabyId, CaregiverId, Session};
    use chrono::{DateTime, Utc};

    pub fn session() -> Session {
        Session::new(
            BabyId::new("baby-1").unwrap(),
            CaregiverId::new("local-user").unwrap(),
        )
    }

    pub fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }
}
