//! Slot generation
//!
//! Discretizes the working window of a date into fixed-step candidates per
//! bookable resource and tags each one with its status. Slots are derived
//! on every query from calendar rules plus live reservation rows; nothing
//! here is persisted.
//!
//! Ordering: resource by resource (staff pool order), interval by interval,
//! ascending start time within a resource. Slots of different staff at the
//! same start are all kept.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{BookingMode, Profile, Reservation, Service, StaffMember};

use super::calendar::{CalendarSettings, TimeOfDay, TimeRange, MINUTES_PER_DAY};
use super::capacity::{CapacityAggregator, CapacityMode, PoolMember};
use super::error::SchedulerResult;
use super::overlap::{Interval, OverlapResolver, SlotStatus};

// ============================================================================
// Types
// ============================================================================

/// A derived, bookable (or not) time slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    /// Staff member the slot belongs to; `None` on a profile without a team
    pub staff_id: Option<String>,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub status: SlotStatus,
}

impl Slot {
    /// Length in minutes
    pub fn minutes(&self) -> u32 {
        TimeRange::new(self.start, self.end).minutes()
    }
}

/// Everything a slot computation reads
#[derive(Debug, Clone, Copy)]
pub struct SlotQuery<'a> {
    pub profile: &'a Profile,
    pub service: &'a Service,
    pub date: NaiveDate,

    /// Staff directory of the profile; eligibility is filtered here
    pub staff: &'a [StaffMember],

    /// Reservations of the profile on `date`
    pub reservations: &'a [Reservation],

    /// Restrict the output to one staff member
    pub staff_id: Option<&'a str>,

    /// Provider-local current time
    pub now: NaiveDateTime,
}

/// A bookable resource with its candidates for the queried date
#[derive(Debug, Clone)]
pub struct Resource<'a> {
    pub staff: Option<&'a StaffMember>,

    /// Effective service duration in minutes
    pub duration: u32,

    pub candidates: Vec<Interval>,
}

impl<'a> Resource<'a> {
    /// Staff id, if any
    pub fn staff_id(&self) -> Option<&'a str> {
        self.staff.map(|s| s.id.as_str())
    }

    /// Candidate starting at `start`
    pub fn candidate_at(&self, start: u32) -> Option<Interval> {
        self.candidates.iter().copied().find(|c| c.start == start)
    }

    fn member(&self, interval: Interval) -> PoolMember<'a> {
        PoolMember {
            staff: self.staff,
            interval,
        }
    }
}

// ============================================================================
// Slot Generator
// ============================================================================

/// The single authority on which slots exist and what state they are in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotGenerator {
    settings: CalendarSettings,
    resolver: OverlapResolver,
}

impl Default for SlotGenerator {
    fn default() -> Self {
        Self::new(CalendarSettings::default())
    }
}

impl SlotGenerator {
    /// Create a generator with the given step and buffer
    pub fn new(settings: CalendarSettings) -> Self {
        Self {
            settings,
            resolver: OverlapResolver::new(settings.buffer_minutes),
        }
    }

    /// Step and buffer in use
    pub fn settings(&self) -> &CalendarSettings {
        &self.settings
    }

    /// Conflict resolver sharing this generator's buffer
    pub fn resolver(&self) -> &OverlapResolver {
        &self.resolver
    }

    /// Walk working intervals in steps
    ///
    /// A start is valid when `start + duration + buffer` still fits the
    /// interval and the buffered candidate does not touch a break. Starts
    /// are aligned to the step grid.
    pub fn candidates(
        &self,
        hours: &[TimeRange],
        duration: u32,
        breaks: &[TimeRange],
    ) -> Vec<Interval> {
        let buffer = self.settings.buffer_minutes;
        let step = self.settings.step_minutes.max(1);
        let mut out = Vec::new();

        // Nothing longer than a day fits a working window
        let Some(span) = duration
            .checked_add(buffer)
            .filter(|span| duration > 0 && *span <= MINUTES_PER_DAY)
        else {
            return out;
        };

        for window in hours.iter().map(|h| Interval::from_range(*h)) {
            let mut start = self.settings.round_up_to_step(window.start);
            while start.checked_add(span).is_some_and(|end| end <= window.end) {
                let candidate = Interval::new(start, start + duration);
                let on_break = breaks.iter().any(|b| {
                    let b = Interval::from_range(*b);
                    candidate.start < b.end && candidate.end + buffer > b.start
                });
                if !on_break {
                    out.push(candidate);
                }
                start = start.saturating_add(step);
            }
        }
        out
    }

    /// Bookable resources of a query, in pool order
    ///
    /// Without a team the profile is the only resource and its working
    /// hours apply. With a team, staff who are inactive, off that day, or
    /// not performing the service are left out.
    pub fn resources<'a>(&self, query: &SlotQuery<'a>) -> SchedulerResult<Vec<Resource<'a>>> {
        if !query.profile.has_team() {
            let hours = query.profile.calendar_hours()?;
            let duration = query.service.duration.as_minutes();
            return Ok(vec![Resource {
                staff: None,
                duration,
                candidates: self.candidates(hours.for_date(query.date), duration, &[]),
            }]);
        }

        let resources = query
            .staff
            .iter()
            .filter(|s| s.profile_id == query.profile.id)
            .filter(|s| s.is_eligible(&query.service.id, query.date))
            .map(|staff| {
                let duration = staff.effective_duration(query.service).as_minutes();
                Resource {
                    staff: Some(staff),
                    duration,
                    candidates: self.candidates(
                        staff.working_hours.for_date(query.date),
                        duration,
                        &staff.breaks_on(query.date),
                    ),
                }
            })
            .collect();
        Ok(resources)
    }

    /// Pool competing for a start, given the resources of the query
    ///
    /// Pooled regimes collect every resource that has a candidate at
    /// `start`; otherwise the pool is the resource itself.
    pub fn pool_at<'a>(
        mode: CapacityMode,
        resources: &[Resource<'a>],
        owner: &Resource<'a>,
        candidate: Interval,
    ) -> Vec<PoolMember<'a>> {
        if !mode.is_pooled() {
            return vec![owner.member(candidate)];
        }
        resources
            .iter()
            .filter_map(|r| r.candidate_at(candidate.start).map(|c| r.member(c)))
            .collect()
    }

    /// First minute of `date` that may still be booked at `now`
    ///
    /// `None` when the whole day is open, `Some(MINUTES_PER_DAY)` for a
    /// past day.
    pub fn booking_cutoff(&self, date: NaiveDate, now: NaiveDateTime) -> Option<u32> {
        let today = now.date();
        if date > today {
            return None;
        }
        if date < today {
            return Some(MINUTES_PER_DAY);
        }
        let time = now.time();
        let mut minute = time.hour() * 60 + time.minute();
        if time.second() > 0 || time.nanosecond() > 0 {
            minute += 1;
        }
        Some(self.settings.round_up_to_step(minute))
    }

    /// Generate tagged slots for a query
    ///
    /// Returns an empty list unless the profile books by calendar, and for
    /// blocked days.
    pub fn generate(&self, query: &SlotQuery<'_>) -> SchedulerResult<Vec<Slot>> {
        if query.profile.booking_mode != BookingMode::Calendar
            || query.profile.is_blocked(query.date)
        {
            return Ok(Vec::new());
        }

        let resources = self.resources(query)?;
        let aggregator = CapacityAggregator::for_profile(query.profile);
        let cutoff = self.booking_cutoff(query.date, query.now);

        // Pooled statuses are shared by every slot at the same start
        let mut pools: HashMap<u32, Vec<PoolMember<'_>>> = HashMap::new();

        let mut slots = Vec::new();
        for resource in &resources {
            if let (Some(filter), Some(id)) = (query.staff_id, resource.staff_id()) {
                if filter != id {
                    continue;
                }
            }

            for &candidate in &resource.candidates {
                let status = if cutoff.is_some_and(|c| candidate.start < c) {
                    SlotStatus::Disabled
                } else if aggregator.mode().is_pooled() {
                    let pool = pools.entry(candidate.start).or_insert_with(|| {
                        Self::pool_at(aggregator.mode(), &resources, resource, candidate)
                    });
                    let occupancy = aggregator.occupancy(pool, query.reservations, &self.resolver);
                    aggregator.status(&candidate, &occupancy, &self.resolver)
                } else {
                    let pool = [resource.member(candidate)];
                    let occupancy = aggregator.occupancy(&pool, query.reservations, &self.resolver);
                    aggregator.status(&candidate, &occupancy, &self.resolver)
                };

                if let Some(slot) = Self::slot(resource.staff_id(), candidate, status) {
                    slots.push(slot);
                }
            }
        }

        tracing::debug!(
            profile_id = %query.profile.id,
            service_id = %query.service.id,
            date = %query.date,
            resources = resources.len(),
            slots = slots.len(),
            "Generated slots"
        );
        Ok(slots)
    }

    fn slot(staff_id: Option<&str>, interval: Interval, status: SlotStatus) -> Option<Slot> {
        Some(Slot {
            staff_id: staff_id.map(str::to_string),
            start: TimeOfDay::from_minutes(interval.start)?,
            end: TimeOfDay::from_minutes(interval.end)?,
            status,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
