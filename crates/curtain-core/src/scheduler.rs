//! Simulated clock and named timers.
//!
//! The page never sleeps. Time moves only when the host calls
//! [`Scheduler::pop_due`] with a horizon (the wall clock in a live host, an
//! arbitrary instant in tests), and timers fire in due order, ties broken by
//! scheduling order. An interval timer is rescheduled from its own due time,
//! not from when it was popped.
//!
//! A due time past the end of the calendar saturates, so such a timer stays
//! pending and never fires. A non-positive period cannot repeat and is
//! scheduled as a one-shot.

use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Shared handle to the simulated "now".
///
/// Cloned into anything that needs to read time between timer callbacks
/// (the simulated audio element derives its playback position from it).
#[derive(Debug, Clone)]
pub struct SimClock(Rc<Cell<DateTime<Utc>>>);

impl SimClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self(Rc::new(Cell::new(start)))
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.0.get()
    }

    /// Moves the clock forward. Moving backwards is ignored.
    fn advance_to(&self, instant: DateTime<Utc>) {
        if instant > self.0.get() {
            self.0.set(instant);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(u64);

/// What a timer is for. Each kind maps to one page handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    CountdownTick,
    Snapshot,
    SnippetTimeout,
    SoundPrompt,
}

#[derive(Debug, Clone)]
struct Entry {
    id: TimerId,
    kind: TimerKind,
    due: DateTime<Utc>,
    period: Option<Duration>,
}

#[derive(Debug)]
pub struct Scheduler {
    clock: SimClock,
    next_id: u64,
    entries: Vec<Entry>,
}

impl Scheduler {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            clock: SimClock::new(start),
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub fn clock(&self) -> SimClock {
        self.clock.clone()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Fires once, `delay` from now.
    pub fn schedule_timeout(&mut self, kind: TimerKind, delay: Duration) -> TimerId {
        self.insert(kind, delay, None)
    }

    /// Fires every `period`, first at now + `period`.
    pub fn schedule_interval(&mut self, kind: TimerKind, period: Duration) -> TimerId {
        self.insert(kind, period, Some(period))
    }

    fn insert(&mut self, kind: TimerKind, delay: Duration, period: Option<Duration>) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let period = match period {
            Some(p) if p <= Duration::zero() => {
                warn!(?kind, period_ms = p.num_milliseconds(), "non-positive period, firing once");
                None
            }
            other => other,
        };
        self.entries.push(Entry {
            id,
            kind,
            due: self
                .now()
                .checked_add_signed(delay)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            period,
        });
        id
    }

    /// Cancels a timer. Returns false if it already fired (timeouts) or was
    /// already cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    /// Pops the earliest timer due at or before `horizon`, moving the clock to
    /// its due time. Returns `None` (and moves the clock to `horizon`) when
    /// nothing else is due.
    pub fn pop_due(&mut self, horizon: DateTime<Utc>) -> Option<(TimerId, TimerKind)> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= horizon)
            .min_by_key(|(_, e)| (e.due, e.id))
            .map(|(i, _)| i);

        let Some(idx) = idx else {
            self.clock.advance_to(horizon);
            return None;
        };

        let Entry {
            id,
            kind,
            due,
            period,
        } = self.entries[idx].clone();
        self.clock.advance_to(due);
        match period.and_then(|p| due.checked_add_signed(p)) {
            Some(next) => self.entries[idx].due = next,
            None => {
                self.entries.remove(idx);
            }
        }
        Some((id, kind))
    }
}
