//! Overlap and conflict resolution
//!
//! A candidate interval conflicts with a reservation when the two intersect
//! once the buffer is appended after the end of each. When capacity is
//! exhausted the conflicts decide how the slot is labelled:
//!
//! | conflicting reservations                   | status     |
//! |--------------------------------------------|------------|
//! | an accepted one starts inside the slot     | `reserved` |
//! | else a pending one starts inside the slot  | `pending`  |
//! | else (buffer or spillover only)            | `disabled` |

use serde::{Deserialize, Serialize};

use crate::models::{Reservation, ReservationStatus};

use super::calendar::TimeRange;

// ============================================================================
// Interval
// ============================================================================

/// A `[start, end)` interval in minutes since midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    pub start: u32,
    pub end: u32,
}

impl Interval {
    /// Create a new interval
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Interval of a time range
    pub fn from_range(range: TimeRange) -> Self {
        Self::new(range.start.minutes(), range.end.minutes())
    }

    /// Interval booked by a reservation
    pub fn of(reservation: &Reservation) -> Self {
        Self::from_range(reservation.range())
    }

    /// Length in minutes
    pub fn minutes(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Buffered intersection test
    ///
    /// `self.start < other.end + buffer && self.end + buffer > other.start`
    pub fn conflicts_with(&self, other: &Interval, buffer: u32) -> bool {
        self.start < other.end + buffer && self.end + buffer > other.start
    }

    /// Check if `other` begins within `[self.start, self.end)`
    pub fn contains_start_of(&self, other: &Interval) -> bool {
        self.start <= other.start && other.start < self.end
    }
}

// ============================================================================
// Slot Status
// ============================================================================

/// Status of a derived slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    /// Bookable
    Free,

    /// An accepted reservation starts inside the slot
    Reserved,

    /// A pending reservation starts inside the slot
    Pending,

    /// Soft block: past start, or capacity eaten by buffer spillover
    Disabled,
}

impl SlotStatus {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Reserved => "reserved",
            Self::Pending => "pending",
            Self::Disabled => "disabled",
        }
    }

    /// Check if a booking may be placed on the slot
    pub fn is_bookable(&self) -> bool {
        matches!(self, Self::Free)
    }
}

// ============================================================================
// Overlap Resolver
// ============================================================================

/// Conflict detection with a trailing buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapResolver {
    buffer_minutes: u32,
}

impl OverlapResolver {
    /// Create a resolver with the given buffer
    pub fn new(buffer_minutes: u32) -> Self {
        Self { buffer_minutes }
    }

    /// Buffer appended after every reservation
    pub fn buffer_minutes(&self) -> u32 {
        self.buffer_minutes
    }

    /// Check if a live reservation conflicts with the candidate
    pub fn conflicts(&self, candidate: &Interval, reservation: &Reservation) -> bool {
        reservation.status.is_live()
            && candidate.conflicts_with(&Interval::of(reservation), self.buffer_minutes)
    }

    /// Live reservations conflicting with the candidate
    pub fn conflicting<'a, I>(&self, candidate: &Interval, reservations: I) -> Vec<&'a Reservation>
    where
        I: IntoIterator<Item = &'a Reservation>,
    {
        reservations
            .into_iter()
            .filter(|r| self.conflicts(candidate, r))
            .collect()
    }

    /// Label a slot whose capacity is exhausted by `conflicting`
    pub fn classify_exhausted(&self, candidate: &Interval, conflicting: &[&Reservation]) -> SlotStatus {
        let starts_inside = |status: ReservationStatus| {
            conflicting
                .iter()
                .any(|r| r.status == status && candidate.contains_start_of(&Interval::of(r)))
        };

        if starts_inside(ReservationStatus::Accepted) {
            SlotStatus::Reserved
        } else if starts_inside(ReservationStatus::Pending) {
            SlotStatus::Pending
        } else {
            SlotStatus::Disabled
        }
    }

    /// Classify a candidate against reservations at capacity one
    pub fn classify<'a, I>(&self, candidate: &Interval, reservations: I) -> SlotStatus
    where
        I: IntoIterator<Item = &'a Reservation>,
    {
        let conflicting = self.conflicting(candidate, reservations);
        if conflicting.is_empty() {
            SlotStatus::Free
        } else {
            self.classify_exhausted(candidate, &conflicting)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
