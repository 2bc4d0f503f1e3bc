//! Candidate departure times on a fixed interval grid.
//!
//! A [`TimeWindow`] like `06:00-10:00` sampled every 15 minutes yields the
//! slots 06:00, 06:15, ... 10:00. Both ends are included when the end falls
//! on the grid.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// A time-of-day on the sampling grid, ordered ascending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSlot {
    minutes: u16,
}

impl TimeSlot {
    /// Build a slot from hour and minute. Returns `None` outside 00:00-23:59.
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        if hour >= 24 || minute >= 60 {
            return None;
        }
        Some(Self {
            minutes: (hour * 60 + minute) as u16,
        })
    }

    fn from_minutes(minutes: u32) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Self {
            minutes: minutes as u16,
        })
    }

    pub fn hour(&self) -> u32 {
        self.minutes as u32 / 60
    }

    pub fn minute(&self) -> u32 {
        self.minutes as u32 % 60
    }

    /// Minutes since midnight.
    pub fn minutes_since_midnight(&self) -> u32 {
        self.minutes as u32
    }

    pub fn to_naive_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour(), self.minute(), 0).unwrap_or(NaiveTime::MIN)
    }
}

impl From<NaiveTime> for TimeSlot {
    fn from(time: NaiveTime) -> Self {
        Self {
            minutes: (time.hour() * 60 + time.minute()) as u16,
        }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeSlot {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(TimeSlot::from)
            .map_err(|e| {
                crate::error::ConfigError::InvalidValue {
                    key: "time".to_string(),
                    message: format!("'{s}' is not a HH:MM time ({e})"),
                }
                .into()
            })
    }
}

impl TryFrom<String> for TimeSlot {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TimeSlot> for String {
    fn from(slot: TimeSlot) -> Self {
        slot.to_string()
    }
}

/// An inclusive time-of-day range to sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: TimeSlot,
    pub end: TimeSlot,
}

impl TimeWindow {
    pub fn new(start: TimeSlot, end: TimeSlot) -> Self {
        Self { start, end }
    }

    /// Parse `"HH:MM"` bounds.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Ok(Self::new(start.parse()?, end.parse()?))
    }

    /// Slots on an `interval_minutes` grid anchored at `start`.
    pub fn slots(&self, interval_minutes: u32) -> Result<Vec<TimeSlot>> {
        generate(self.start, self.end, interval_minutes)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Emit a slot every `interval_minutes` from `start`, stopping once the
/// running time passes `end`.
///
/// # Errors
/// `InvalidWindow` when `end < start`, `InvalidInterval` when the interval is 0.
pub fn generate(start: TimeSlot, end: TimeSlot, interval_minutes: u32) -> Result<Vec<TimeSlot>> {
    if end < start {
        return Err(CoreError::InvalidWindow {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    if interval_minutes == 0 {
        return Err(CoreError::InvalidInterval(interval_minutes));
    }

    let last = end.minutes_since_midnight();
    let mut slots = Vec::new();
    let mut current = start.minutes_since_midnight();
    while current <= last {
        // current <= last < MINUTES_PER_DAY
        if let Some(slot) = TimeSlot::from_minutes(current) {
            slots.push(slot);
        }
        current += interval_minutes;
    }
    Ok(slots)
}
