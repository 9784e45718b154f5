//! Quick-tap aggregation: a burst of identical taps becomes one event.
//!
//! The accumulator is a pure state machine. Callers pass `now` explicitly and
//! schedule the countdown themselves, using the [`SessionToken`] returned by
//! each tap to tell a live deadline from a stale one.

use chrono::{DateTime, Duration, Utc};

use crate::event::{EventKind, FeedingMethod, NewEvent};
use crate::types::define_str_enum;

/// Quiet time after the last tap before a session is committed.
pub const QUICK_WINDOW: Duration = Duration::seconds(10);

define_str_enum!(
    /// Tap actions whose repeats add up to a volume.
    VolumeAction, "quick action" {
        Bottle => "bottle",
        Food => "food",
        Nursing => "nursing",
        Pumping => "pumping",
    }
);

impl VolumeAction {
    /// Unit each tap adds one of.
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Food => "tsp",
            Self::Bottle | Self::Nursing | Self::Pumping => "oz",
        }
    }

    fn into_new_event(self, amount: u32) -> NewEvent {
        let amount = f64::from(amount);
        let kind = match self {
            Self::Bottle => EventKind::feed_amount(FeedingMethod::Bottle, Some(amount), None),
            Self::Nursing => EventKind::feed_amount(FeedingMethod::Breast, Some(amount), None),
            Self::Food => EventKind::feed_amount(FeedingMethod::Solid, None, Some(amount)),
            Self::Pumping => EventKind::Pump {
                duration_minutes: None,
                amount_oz: Some(amount),
            },
        };
        NewEvent::new(kind)
    }
}

/// Identifies one scheduled countdown. Each tap issues a new token and makes
/// the previous one stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(u64);

#[derive(Debug, Clone)]
struct LiveSession {
    action: VolumeAction,
    amount: u32,
    started_at: DateTime<Utc>,
    deadline: DateTime<Utc>,
    token: SessionToken,
}

/// What a tap did to the accumulator.
#[derive(Debug, Clone, PartialEq)]
pub struct TapOutcome {
    /// A previous session committed by this tap, ready to be logged.
    pub finalized: Option<NewEvent>,
    pub action: VolumeAction,
    /// Running total of the live session after this tap.
    pub amount: u32,
    pub token: SessionToken,
    pub deadline: DateTime<Utc>,
}

/// Holds at most one in-flight quick-tap session.
#[derive(Debug)]
pub struct VolumeAccumulator {
    live: Option<LiveSession>,
    generation: u64,
    window: Duration,
}

impl Default for VolumeAccumulator {
    fn default() -> Self {
        Self::with_window(QUICK_WINDOW)
    }
}

impl VolumeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// An accumulator whose sessions commit after `window` without a tap.
    pub const fn with_window(window: Duration) -> Self {
        Self {
            live: None,
            generation: 0,
            window,
        }
    }

    pub const fn window(&self) -> Duration {
        self.window
    }

    fn next_token(&mut self) -> SessionToken {
        self.generation += 1;
        SessionToken(self.generation)
    }

    /// Registers one tap of `action` at `now`.
    ///
    /// A tap of the live action before its deadline increments the amount and
    /// pushes the deadline out. Any other tap commits the live session first
    /// and starts a new one at 1.
    pub fn tap(&mut self, action: VolumeAction, now: DateTime<Utc>) -> TapOutcome {
        let token = self.next_token();
        let deadline = now + self.window;

        if let Some(live) = self
            .live
            .as_mut()
            .filter(|live| live.action == action && now < live.deadline)
        {
            live.amount += 1;
            live.deadline = deadline;
            live.token = token;
            return TapOutcome {
                finalized: None,
                action,
                amount: live.amount,
                token,
                deadline,
            };
        }

        let finalized = self.finalize();
        self.live = Some(LiveSession {
            action,
            amount: 1,
            started_at: now,
            deadline,
            token,
        });
        TapOutcome {
            finalized,
            action,
            amount: 1,
            token,
            deadline,
        }
    }

    /// Commits the live session if `token` is still current and its deadline
    /// has passed. Stale tokens return `None`.
    pub fn expire(&mut self, token: SessionToken, now: DateTime<Utc>) -> Option<NewEvent> {
        let due = self
            .live
            .as_ref()
            .is_some_and(|live| live.token == token && now >= live.deadline);
        if due { self.finalize() } else { None }
    }

    /// Commits the live session, if any.
    pub fn finalize(&mut self) -> Option<NewEvent> {
        self.live
            .take()
            .map(|live| live.action.into_new_event(live.amount))
    }

    /// Token and deadline of the countdown that should currently be scheduled.
    pub fn pending(&self) -> Option<(SessionToken, DateTime<Utc>)> {
        self.live.as_ref().map(|live| (live.token, live.deadline))
    }

    /// When the live session began.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.live.as_ref().map(|live| live.started_at)
    }
}
