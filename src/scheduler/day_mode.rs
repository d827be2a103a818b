//! Whole-day booking for `request-blocking` profiles
//!
//! No time-of-day logic: a day is either taken or not.

use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::models::{Profile, Reservation, ReservationStatus};

use super::error::{ConflictReason, SchedulerError, SchedulerResult};

/// Date-level blocking and duplicate-request guard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayModeAllocator;

impl DayModeAllocator {
    /// Create an allocator
    pub fn new() -> Self {
        Self
    }

    /// Blocked days plus days held by an accepted whole-day reservation,
    /// sorted and de-duplicated
    pub fn unavailable_days(
        &self,
        profile: &Profile,
        reservations: &[Reservation],
    ) -> BTreeSet<NaiveDate> {
        profile
            .blocked_days
            .iter()
            .copied()
            .chain(
                reservations
                    .iter()
                    .filter(|r| r.profile_id == profile.id && r.is_accepted_whole_day())
                    .map(|r| r.date),
            )
            .collect()
    }

    /// Check a whole-day request against the reservations of `date`
    pub fn check_request(
        &self,
        profile: &Profile,
        client_id: &str,
        date: NaiveDate,
        existing: &[Reservation],
    ) -> SchedulerResult<()> {
        if profile.is_blocked(date) {
            return Err(SchedulerError::conflict(
                ConflictReason::BlockedDay,
                format!("{date} is blocked by the provider"),
            ));
        }

        let on_day = existing
            .iter()
            .filter(|r| r.profile_id == profile.id && r.date == date && r.date_only);

        for reservation in on_day {
            if reservation.status == ReservationStatus::Accepted {
                return Err(SchedulerError::conflict(
                    ConflictReason::DayTaken,
                    format!("{date} is already booked"),
                ));
            }
            if reservation.status == ReservationStatus::Pending && reservation.client_id == client_id {
                return Err(SchedulerError::conflict(
                    ConflictReason::DuplicateRequest,
                    format!("a request for {date} is already waiting for an answer"),
                ));
            }
        }
        Ok(())
    }
}
