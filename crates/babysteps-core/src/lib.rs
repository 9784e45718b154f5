//! Core domain logic for babysteps.
//!
//! This crate contains the types and pure logic for:
//! - Events: the care event record and its per-type payloads
//! - Timers: in-progress activities and their conversion into events
//! - Quick taps: merging bursts of repeated taps into one event
//! - Stats: windowed and per-day aggregates
//! - Transfer: the CSV export format
//!
//! Nothing here performs IO beyond the readers and writers callers pass in.

pub mod accumulator;
pub mod event;
pub mod event_type;
pub mod invite;
pub mod outbox;
pub mod profile;
pub mod session;
pub mod stats;
pub mod timer;
pub mod transfer;
pub mod types;

pub use accumulator::{QUICK_WINDOW, SessionToken, TapOutcome, VolumeAccumulator, VolumeAction};
pub use event::{
    DiaperType, Event, EventKind, FeedSide, FeedingMethod, LoggedEvent, NewEvent, UNDO_WINDOW,
    UndoToken,
};
pub use event_type::{EventType, UnknownEventType};
pub use invite::{InviteRequest, InviteStatus, Role};
pub use outbox::OutboxItem;
pub use profile::{BabyProfile, PROFILE_KEY, ProfileUpdate};
pub use session::Session;
pub use stats::{DailyStats, LastFeed, Stats, TimelinePoint, compute_stats, format_duration_minutes};
pub use timer::{ActiveTimer, TimerMetadata, TimerType, timer_duration_minutes};
pub use transfer::{ImportReport, RowError, TransferError};
pub use types::{
    BabyId, CaregiverId, EventId, EventSource, InviteId, OutboxId, TimerId, ValidationError,
};
