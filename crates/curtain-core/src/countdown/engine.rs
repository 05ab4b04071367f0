//! Countdown engine implementation.
//!
//! Like the rest of the page it owns no timer of its own: whoever holds the
//! tick timer calls [`CountdownEngine::tick`] with the current instant, and
//! the remaining time is re-derived from that instant every time.
//!
//! ## Units
//!
//! ```text
//! days    = floor(diff / 86_400_000)   unpadded, "--" and hidden when 0
//! hours   = floor(rest / 3_600_000)    "00".."23"
//! minutes = floor(rest / 60_000)       "00".."59"
//! seconds = floor(rest / 1000)         "00".."59"
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MS_PER_SECOND: u64 = 1000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// Placeholder shown in the days slot while it is hidden.
pub const HIDDEN_DAYS: &str = "--";

/// Whole units in a remaining duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Breakdown {
    pub fn from_millis(diff_ms: u64) -> Self {
        let days = diff_ms / MS_PER_DAY;
        let rest = diff_ms % MS_PER_DAY;
        let hours = rest / MS_PER_HOUR;
        let rest = rest % MS_PER_HOUR;
        let minutes = rest / MS_PER_MINUTE;
        let rest = rest % MS_PER_MINUTE;
        let seconds = rest / MS_PER_SECOND;
        Self {
            days,
            hours,
            minutes,
            seconds,
        }
    }
}

/// One formatted unit and whether it differs from the previous tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitReading {
    pub value: String,
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayedUnits {
    pub days: UnitReading,
    /// The days container is hidden when there are no whole days left.
    pub days_visible: bool,
    pub hours: UnitReading,
    pub minutes: UnitReading,
    pub seconds: UnitReading,
}

impl DisplayedUnits {
    /// Units whose `changed` flag is set, by name.
    pub fn changed_units(&self) -> Vec<&'static str> {
        [
            ("days", &self.days),
            ("hours", &self.hours),
            ("minutes", &self.minutes),
            ("seconds", &self.seconds),
        ]
        .into_iter()
        .filter(|(_, unit)| unit.changed)
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownState {
    pub target: DateTime<Utc>,
    pub remaining_ms: u64,
    pub units: DisplayedUnits,
    pub at: DateTime<Utc>,
}

/// Result of one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountdownTick {
    Running(CountdownState),
    /// Target reached. Reported exactly once; the engine stops.
    Expired { at: DateTime<Utc> },
    /// Engine already stopped.
    Stopped,
}

#[derive(Debug, Clone)]
pub struct CountdownEngine {
    target: DateTime<Utc>,
    running: bool,
    /// Formatted days/hours/minutes/seconds from the previous tick.
    previous: Option<[String; 4]>,
}

impl CountdownEngine {
    pub fn new(target: DateTime<Utc>) -> Self {
        Self {
            target,
            running: true,
            previous: None,
        }
    }

    pub fn target(&self) -> DateTime<Utc> {
        self.target
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Milliseconds until the target, negative once it has passed.
    pub fn remaining_ms(&self, now: DateTime<Utc>) -> i64 {
        (self.target - now).num_milliseconds()
    }

    /// Stops without reporting expiry (used when the gate opens another way).
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> CountdownTick {
        if !self.running {
            return CountdownTick::Stopped;
        }

        let diff = self.remaining_ms(now);
        if diff <= 0 {
            self.running = false;
            return CountdownTick::Expired { at: now };
        }

        let remaining_ms = diff as u64;
        let b = Breakdown::from_millis(remaining_ms);
        let formatted = [
            if b.days > 0 {
                b.days.to_string()
            } else {
                HIDDEN_DAYS.to_string()
            },
            pad(b.hours),
            pad(b.minutes),
            pad(b.seconds),
        ];

        let changed: [bool; 4] = match &self.previous {
            Some(prev) => std::array::from_fn(|i| prev[i] != formatted[i]),
            None => [true; 4],
        };

        let [days, hours, minutes, seconds] = formatted.clone();
        let reading = |value: String, i: usize| UnitReading {
            value,
            changed: changed[i],
        };
        let units = DisplayedUnits {
            days: reading(days, 0),
            days_visible: b.days > 0,
            hours: reading(hours, 1),
            minutes: reading(minutes, 2),
            seconds: reading(seconds, 3),
        };
        self.previous = Some(formatted);

        CountdownTick::Running(CountdownState {
            target: self.target,
            remaining_ms,
            units,
            at: now,
        })
    }
}

fn pad(n: u64) -> String {
    format!("{n:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn target() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 12, 23, 40, 0).unwrap()
    }

    fn running(tick: CountdownTick) -> CountdownState {
        match tick {
            CountdownTick::Running(state) => state,
            other => panic!("Expected Running, got {other:?}"),
        }
    }

    #[test]
    fn breakdown_floors_each_unit() {
        let ms = 3 * MS_PER_DAY + 4 * MS_PER_HOUR + 5 * MS_PER_MINUTE + 6 * MS_PER_SECOND + 999;
        assert_eq!(
            Breakdown::from_millis(ms),
            Breakdown {
                days: 3,
                hours: 4,
                minutes: 5,
                seconds: 6
            }
        );
    }

    #[test]
    fn two_seconds_before_target() {
        let mut engine = CountdownEngine::new(target());
        let now = target() - Duration::milliseconds(2000);
        let state = running(engine.tick(now));
        assert_eq!(state.remaining_ms, 2000);
        assert!(!state.units.days_visible);
        assert_eq!(state.units.days.value, "--");
        assert_eq!(state.units.hours.value, "00");
        assert_eq!(state.units.minutes.value, "00");
        assert_eq!(state.units.seconds.value, "02");
    }

    #[test]
    fn days_are_unpadded_and_visible() {
        let mut engine = CountdownEngine::new(target());
        let now = target() - Duration::days(12) - Duration::hours(3);
        let state = running(engine.tick(now));
        assert!(state.units.days_visible);
        assert_eq!(state.units.days.value, "12");
        assert_eq!(state.units.hours.value, "03");
    }

    #[test]
    fn first_tick_marks_every_unit_changed() {
        let mut engine = CountdownEngine::new(target());
        let state = running(engine.tick(target() - Duration::hours(30)));
        assert_eq!(
            state.units.changed_units(),
            vec!["days", "hours", "minutes", "seconds"]
        );
    }

    #[test]
    fn only_transitioned_units_change() {
        let mut engine = CountdownEngine::new(target());
        running(engine.tick(target() - Duration::milliseconds(61_000)));
        let state = running(engine.tick(target() - Duration::milliseconds(60_000)));
        assert_eq!(state.units.seconds.value, "00");
        assert_eq!(state.units.minutes.value, "01");
        assert_eq!(state.units.changed_units(), vec!["seconds"]);
    }

    #[test]
    fn same_second_reports_nothing_changed() {
        let mut engine = CountdownEngine::new(target());
        running(engine.tick(target() - Duration::milliseconds(5_900)));
        let state = running(engine.tick(target() - Duration::milliseconds(5_100)));
        assert!(state.units.changed_units().is_empty());
    }

    #[test]
    fn expiry_is_reported_once() {
        let mut engine = CountdownEngine::new(target());
        assert_eq!(engine.tick(target()), CountdownTick::Expired { at: target() });
        assert!(!engine.is_running());
        assert_eq!(
            engine.tick(target() + Duration::seconds(1)),
            CountdownTick::Stopped
        );
    }

    #[test]
    fn stopped_engine_never_expires() {
        let mut engine = CountdownEngine::new(target());
        engine.stop();
        assert_eq!(engine.tick(target() + Duration::hours(1)), CountdownTick::Stopped);
    }
}
