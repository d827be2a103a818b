//! Reservation lifecycle
//!
//! ```text
//!                 ┌──► zaakceptowana  (owner)
//!                 ├──► odrzucona      (owner)
//!   oczekująca ───┼──► anulowana      (client)
//!                 └──► wygasła        (system)
//! ```
//!
//! Every non-pending status is terminal. New reservations are always
//! pending, and a calendar booking is only admitted when the requested
//! interval is `free` in a slot computation run against the same rows the
//! insert will be checked against.

use serde::{Deserialize, Serialize};

use crate::models::{BookingMode, Profile, Reservation, ReservationStatus};

use super::calendar::TimeOfDay;
use super::capacity::{CapacityAggregator, CapacityMode, PoolMember};
use super::error::{ConflictReason, SchedulerError, SchedulerResult};
use super::overlap::SlotStatus;
use super::slots::{SlotGenerator, SlotQuery};

// ============================================================================
// Actors and Policies
// ============================================================================

/// Who requests a status change
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Actor {
    /// An authenticated marketplace user
    User(String),

    /// Background jobs such as the expiry sweep
    System,
}

impl Actor {
    /// Create a user actor
    pub fn user(id: impl Into<String>) -> Self {
        Self::User(id.into())
    }

    /// Check if the actor is the given user
    pub fn is_user(&self, id: &str) -> bool {
        matches!(self, Self::User(user) if user == id)
    }
}

/// What to do when a terminal transition is requested again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatTransitionPolicy {
    /// Return the reservation unchanged
    #[default]
    Ignore,

    /// Fail with a conflict like any other transition out of a terminal status
    Reject,
}

/// Result of a permitted transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The status changes from `from` to `to`
    Applied {
        from: ReservationStatus,
        to: ReservationStatus,
    },

    /// Repeat of the current terminal status, nothing to write
    Unchanged,
}

/// A calendar booking that passed the commit-time check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub staff_id: Option<String>,
    pub from_time: TimeOfDay,
    pub to_time: TimeOfDay,
}

// ============================================================================
// Reservation Lifecycle
// ============================================================================

/// State machine and admission rules for reservations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReservationLifecycle {
    policy: RepeatTransitionPolicy,
}

impl ReservationLifecycle {
    /// Create a lifecycle with a repeat-transition policy
    pub fn new(policy: RepeatTransitionPolicy) -> Self {
        Self { policy }
    }

    /// Active repeat-transition policy
    pub fn policy(&self) -> RepeatTransitionPolicy {
        self.policy
    }

    /// Check that the actor may move the reservation to `target`
    ///
    /// The profile owner accepts and rejects, the requesting client cancels
    /// and only the system expires.
    pub fn authorize(
        &self,
        actor: &Actor,
        reservation: &Reservation,
        profile: &Profile,
        target: ReservationStatus,
    ) -> SchedulerResult<()> {
        let allowed = match target {
            ReservationStatus::Pending => {
                return Err(SchedulerError::validation(
                    "status",
                    "a reservation cannot be moved back to pending",
                ));
            }
            ReservationStatus::Accepted | ReservationStatus::Rejected => {
                actor.is_user(&profile.owner_id)
            }
            ReservationStatus::Cancelled => actor.is_user(&reservation.client_id),
            ReservationStatus::Expired => matches!(actor, Actor::System),
        };

        if allowed {
            Ok(())
        } else {
            Err(SchedulerError::permission(format!(
                "actor may not mark reservation {} as {}",
                reservation.id,
                target.label()
            )))
        }
    }

    /// Validate a status change against the state machine
    pub fn transition(
        &self,
        reservation: &Reservation,
        target: ReservationStatus,
    ) -> SchedulerResult<TransitionOutcome> {
        let current = reservation.status;
        if current == ReservationStatus::Pending && target != ReservationStatus::Pending {
            return Ok(TransitionOutcome::Applied {
                from: current,
                to: target,
            });
        }
        if current == target && self.policy == RepeatTransitionPolicy::Ignore {
            return Ok(TransitionOutcome::Unchanged);
        }
        Err(SchedulerError::conflict(
            ConflictReason::InvalidTransition,
            format!(
                "reservation {} is {} and cannot become {}",
                reservation.id,
                current.label(),
                target.label()
            ),
        ))
    }

    /// Authorize, then validate the transition
    pub fn apply(
        &self,
        actor: &Actor,
        reservation: &Reservation,
        profile: &Profile,
        target: ReservationStatus,
    ) -> SchedulerResult<TransitionOutcome> {
        self.authorize(actor, reservation, profile, target)?;
        self.transition(reservation, target)
    }

    /// Admit a calendar booking against the rows in `query`
    ///
    /// `to_time` is optional but must match the effective duration when
    /// given. In user-pick mode `staff_id` is required; in auto-assign mode
    /// it narrows the pool and the least loaded staff member with own
    /// capacity left is chosen.
    pub fn admit(
        &self,
        generator: &SlotGenerator,
        query: &SlotQuery<'_>,
        from_time: TimeOfDay,
        to_time: Option<TimeOfDay>,
    ) -> SchedulerResult<Admission> {
        let profile = query.profile;
        if profile.booking_mode != BookingMode::Calendar {
            return Err(SchedulerError::validation(
                "bookingMode",
                format!("profile {} books by {}", profile.id, profile.booking_mode.as_str()),
            ));
        }
        if profile.is_blocked(query.date) {
            return Err(SchedulerError::conflict(
                ConflictReason::BlockedDay,
                format!("{} is blocked", query.date),
            ));
        }
        if !generator.settings().is_on_step(from_time.minutes()) {
            return Err(SchedulerError::validation(
                "fromTime",
                format!(
                    "{from_time} is not on the {} minute grid",
                    generator.settings().step_minutes
                ),
            ));
        }

        let mode = CapacityMode::for_profile(profile);
        match (mode, query.staff_id) {
            (CapacityMode::Solo, Some(_)) => {
                return Err(SchedulerError::validation(
                    "staffId",
                    "profile has no team",
                ));
            }
            (CapacityMode::UserPick, None) => {
                return Err(SchedulerError::validation(
                    "staffId",
                    "required when clients pick staff",
                ));
            }
            _ => {}
        }

        let start = from_time.minutes();
        let slots = generator.generate(query)?;
        let at_start: Vec<_> = slots.iter().filter(|s| s.start == from_time).collect();
        if at_start.is_empty() {
            return Err(SchedulerError::conflict(
                ConflictReason::SlotUnavailable,
                format!("no slot starts at {from_time} on {}", query.date),
            ));
        }

        let matching: Vec<_> = match to_time {
            Some(to) => at_start.iter().copied().filter(|s| s.end == to).collect(),
            None => at_start.clone(),
        };
        let Some(slot) = matching.first() else {
            let expected = at_start[0].end;
            return Err(SchedulerError::validation(
                "toTime",
                format!("expected {expected} for a booking starting at {from_time}"),
            ));
        };
        if slot.status != SlotStatus::Free {
            return Err(SchedulerError::conflict(
                ConflictReason::SlotUnavailable,
                format!("slot {from_time}-{} is {}", slot.end, slot.status.as_str()),
            ));
        }

        if !mode.is_pooled() {
            return Ok(Admission {
                staff_id: slot.staff_id.clone(),
                from_time: slot.start,
                to_time: slot.end,
            });
        }

        // Auto assign: choose among the pool members offering this interval
        let resources = generator.resources(query)?;
        let offered: Vec<_> = matching
            .iter()
            .filter_map(|s| s.staff_id.as_deref())
            .collect();
        let pool: Vec<_> = resources
            .iter()
            .filter(|r| r.staff_id().is_some_and(|id| offered.contains(&id)))
            .filter_map(|r| r.candidate_at(start).map(|c| (r, c)))
            .map(|(r, c)| PoolMember {
                staff: r.staff,
                interval: c,
            })
            .collect();

        let chosen = CapacityAggregator::least_loaded(&pool, query.reservations, generator.resolver())
            .ok_or_else(|| {
                SchedulerError::conflict(
                    ConflictReason::SlotUnavailable,
                    format!("no staff member has capacity at {from_time}"),
                )
            })?;
        let end = TimeOfDay::from_minutes(chosen.interval.end).ok_or_else(|| {
            SchedulerError::validation("toTime", "booking would end after midnight")
        })?;

        Ok(Admission {
            staff_id: chosen.staff_id().map(str::to_string),
            from_time,
            to_time: end,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
