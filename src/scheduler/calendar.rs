//! Calendar model
//!
//! Pure data describing when a provider or staff member works: wall-clock
//! times, working intervals keyed by weekday, service durations and the
//! step/buffer settings every slot computation uses.
//!
//! All times are provider-local. No timezone conversion happens anywhere in
//! the scheduling core.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::{SchedulerError, SchedulerResult};

/// Default distance between two candidate slot starts
pub const DEFAULT_STEP_MINUTES: u32 = 15;

/// Default gap kept free after every reservation
pub const DEFAULT_BUFFER_MINUTES: u32 = 15;

/// Minutes in one calendar day
pub const MINUTES_PER_DAY: u32 = 24 * 60;

// ============================================================================
// Calendar Settings
// ============================================================================

/// Step and buffer used when discretizing a working window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// Minutes between consecutive candidate starts
    pub step_minutes: u32,

    /// Minutes appended after each reservation before the next may start
    pub buffer_minutes: u32,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            step_minutes: DEFAULT_STEP_MINUTES,
            buffer_minutes: DEFAULT_BUFFER_MINUTES,
        }
    }
}

impl CalendarSettings {
    /// Validate the settings
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.step_minutes == 0 || self.step_minutes > MINUTES_PER_DAY {
            return Err(SchedulerError::validation(
                "step_minutes",
                format!("must be between 1 and {MINUTES_PER_DAY}"),
            ));
        }
        if self.buffer_minutes >= MINUTES_PER_DAY {
            return Err(SchedulerError::validation(
                "buffer_minutes",
                "must be shorter than a day",
            ));
        }
        Ok(())
    }

    /// Round a minute-of-day up to the next step boundary
    ///
    /// A value already on a boundary is returned unchanged.
    pub fn round_up_to_step(&self, minute: u32) -> u32 {
        minute.div_ceil(self.step_minutes) * self.step_minutes
    }

    /// Check if a minute-of-day lies on a step boundary
    pub fn is_on_step(&self, minute: u32) -> bool {
        minute % self.step_minutes == 0
    }
}

// ============================================================================
// Time of Day
// ============================================================================

/// Wall-clock time with minute precision, serialized as `HH:MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    /// 00:00
    pub const MIDNIGHT: Self = Self(0);

    /// 23:59, the end sentinel of whole-day reservations
    pub const END_OF_DAY: Self = Self(23 * 60 + 59);

    /// Create from hour and minute
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self((hour * 60 + minute) as u16))
        } else {
            None
        }
    }

    /// Create from minutes since midnight
    pub fn from_minutes(minutes: u32) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Self(minutes as u16))
    }

    /// Minutes since midnight
    pub fn minutes(self) -> u32 {
        u32::from(self.0)
    }

    /// Time of day of a `NaiveTime`, seconds dropped
    pub fn from_naive(time: NaiveTime) -> Self {
        Self((time.hour() * 60 + time.minute()) as u16)
    }
}

impl FromStr for TimeOfDay {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(Self::from_naive)
            .map_err(|_| SchedulerError::validation("time", format!("'{s}' is not HH:MM")))
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = SchedulerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

// ============================================================================
// Time Range
// ============================================================================

/// A `[start, end)` interval within one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeRange {
    /// Create a new range
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    /// Length in minutes (zero for empty or inverted ranges)
    pub fn minutes(&self) -> u32 {
        self.end.minutes().saturating_sub(self.start.minutes())
    }

    /// Check if the range covers no time
    pub fn is_empty(&self) -> bool {
        self.minutes() == 0
    }
}

// ============================================================================
// Weekly Hours
// ============================================================================

/// Weekday index of a date, 0 = Sunday through 6 = Saturday
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Working intervals per weekday
///
/// A weekday without intervals is a day off. Intervals are kept sorted by
/// start time. Serialized as a map from weekday number to interval list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<u8, Vec<TimeRange>>",
    into = "BTreeMap<u8, Vec<TimeRange>>"
)]
pub struct WeeklyHours {
    days: [Vec<TimeRange>; 7],
}

impl WeeklyHours {
    /// Create an empty schedule (no working days)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the intervals of one weekday
    pub fn with_day(mut self, weekday: u8, ranges: Vec<TimeRange>) -> SchedulerResult<Self> {
        self.set_day(weekday, ranges)?;
        Ok(self)
    }

    /// Replace the intervals of one weekday
    pub fn set_day(&mut self, weekday: u8, mut ranges: Vec<TimeRange>) -> SchedulerResult<()> {
        if weekday > 6 {
            return Err(SchedulerError::validation(
                "workingHours",
                format!("weekday {weekday} is outside 0-6"),
            ));
        }
        if let Some(bad) = ranges.iter().find(|r| r.start > r.end) {
            return Err(SchedulerError::validation(
                "workingHours",
                format!("interval {}-{} ends before it starts", bad.start, bad.end),
            ));
        }
        ranges.sort();
        self.days[usize::from(weekday)] = ranges;
        Ok(())
    }

    /// The same interval on every listed weekday
    pub fn uniform(weekdays: &[u8], range: TimeRange) -> SchedulerResult<Self> {
        let mut hours = Self::new();
        for &day in weekdays {
            hours.set_day(day, vec![range])?;
        }
        Ok(hours)
    }

    /// Intervals for a weekday (empty slice if not working)
    pub fn for_weekday(&self, weekday: u8) -> &[TimeRange] {
        self.days
            .get(usize::from(weekday))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Intervals for the weekday of a date
    pub fn for_date(&self, date: NaiveDate) -> &[TimeRange] {
        self.for_weekday(weekday_index(date))
    }

    /// Check if no weekday has any interval
    pub fn is_empty(&self) -> bool {
        self.days.iter().all(Vec::is_empty)
    }
}

impl TryFrom<BTreeMap<u8, Vec<TimeRange>>> for WeeklyHours {
    type Error = SchedulerError;

    fn try_from(map: BTreeMap<u8, Vec<TimeRange>>) -> Result<Self, Self::Error> {
        let mut hours = Self::new();
        for (day, ranges) in map {
            hours.set_day(day, ranges)?;
        }
        Ok(hours)
    }
}

impl From<WeeklyHours> for BTreeMap<u8, Vec<TimeRange>> {
    fn from(hours: WeeklyHours) -> Self {
        hours
            .days
            .into_iter()
            .enumerate()
            .filter(|(_, ranges)| !ranges.is_empty())
            .map(|(day, ranges)| (day as u8, ranges))
            .collect()
    }
}

// ============================================================================
// Service Duration
// ============================================================================

/// Unit of a service duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Minutes,
    Hours,
    Days,
}

/// Duration of a service as entered by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceDuration {
    pub value: u32,
    pub unit: DurationUnit,
}

impl ServiceDuration {
    /// Duration given in minutes
    pub fn minutes(value: u32) -> Self {
        Self {
            value,
            unit: DurationUnit::Minutes,
        }
    }

    /// Duration given in hours
    pub fn hours(value: u32) -> Self {
        Self {
            value,
            unit: DurationUnit::Hours,
        }
    }

    /// Normalized length in minutes
    pub fn as_minutes(&self) -> u32 {
        match self.unit {
            DurationUnit::Minutes => self.value,
            DurationUnit::Hours => self.value.saturating_mul(60),
            DurationUnit::Days => self.value.saturating_mul(MINUTES_PER_DAY),
        }
    }

    /// Check that the duration is positive and fits in one day
    pub fn validate(&self, field: &str) -> SchedulerResult<()> {
        let minutes = self.as_minutes();
        if minutes == 0 || minutes > MINUTES_PER_DAY {
            return Err(SchedulerError::validation(
                field,
                format!("must be between 1 and {MINUTES_PER_DAY} minutes, got {minutes}"),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
