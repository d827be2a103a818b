//! Booking service
//!
//! Ties the scheduling engine to storage. Every operation reads the durable
//! rows it needs, runs the pure scheduling code against them and writes
//! through the repository's atomic units.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      BookingService                         │
//! │  availability · create · transition · expire · directory    │
//! └─────────────────────────────────────────────────────────────┘
//!          │                     │                      │
//!          ▼                     ▼                      ▼
//! ┌─────────────────┐  ┌──────────────────┐  ┌──────────────────┐
//! │  SlotGenerator  │  │ ReservationLife- │  │ DayModeAllocator │
//! │  (scheduler)    │  │ cycle (scheduler)│  │   (scheduler)    │
//! └─────────────────┘  └──────────────────┘  └──────────────────┘
//!          │                     │                      │
//!          └─────────────────────┼──────────────────────┘
//!                                ▼
//!                     ┌──────────────────────┐
//!                     │     BookingStore     │
//!                     └──────────────────────┘
//! ```
//!
//! Pending reservations older than the configured TTL are expired lazily
//! before every read of reservation rows and by the [`ExpirySweeper`].

pub mod clock;
pub mod expiry;
pub mod inquiry;
pub mod requests;

pub use clock::{Clock, FixedClock, SystemClock};
pub use expiry::ExpirySweeper;
pub use inquiry::{Inquiry, InquirySink, LoggingInquirySink};
pub use requests::{BookingOutcome, CreateDayReservation, CreateReservation, UpdateStatus};

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use crate::config::{Config, ReservationSettings};
use crate::error::{Error, Result};
use crate::metrics;
use crate::models::{
    BookingMode, NewReservation, Profile, Reservation, ReservationStatus, StaffMember,
};
use crate::scheduler::{
    Actor, DayModeAllocator, ReservationLifecycle, SchedulerError, SchedulerResult, Slot,
    SlotGenerator, SlotQuery, TransitionOutcome,
};
use crate::storage::{BookingStore, StatusChange};

use requests::required;

/// Booking operations over a [`BookingStore`]
pub struct BookingService {
    store: Arc<dyn BookingStore>,
    generator: SlotGenerator,
    lifecycle: ReservationLifecycle,
    day_mode: DayModeAllocator,
    settings: ReservationSettings,
    clock: Arc<dyn Clock>,
    inquiries: Arc<dyn InquirySink>,
}

impl BookingService {
    /// Create a service using the system clock and the logging inquiry sink
    pub fn new(store: Arc<dyn BookingStore>, config: &Config) -> Self {
        Self {
            store,
            generator: SlotGenerator::new(config.calendar),
            lifecycle: ReservationLifecycle::new(config.reservations.repeat_transition),
            day_mode: DayModeAllocator::new(),
            settings: config.reservations,
            clock: Arc::new(SystemClock),
            inquiries: Arc::new(LoggingInquirySink),
        }
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the inquiry sink
    pub fn with_inquiry_sink(mut self, sink: Arc<dyn InquirySink>) -> Self {
        self.inquiries = sink;
        self
    }

    /// Current time according to the service clock
    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Tagged slots of a service on a date
    ///
    /// Empty unless the profile books by calendar. `staff_id` restricts the
    /// listing to one staff member and is rejected on a profile without a
    /// team, as it is when booking.
    pub fn availability(
        &self,
        profile_id: &str,
        service_id: &str,
        date: NaiveDate,
        staff_id: Option<&str>,
    ) -> Result<Vec<Slot>> {
        self.expire_stale()?;
        let profile = self.load_profile(profile_id)?;
        metrics::record_availability_query(profile.booking_mode.as_str());

        if profile.booking_mode != BookingMode::Calendar {
            return Ok(Vec::new());
        }

        let service = profile
            .service(service_id)
            .ok_or_else(|| SchedulerError::not_found("service", service_id))?;
        let staff = self.store.staff_for_profile(&profile.id)?;
        if let Some(id) = staff_id {
            ensure_team_member(&profile, &staff, id)?;
        }
        let reservations = self.store.reservations_on(&profile.id, date)?;

        let _timer = metrics::start_slot_timer();
        let query = SlotQuery {
            profile: &profile,
            service,
            date,
            staff: &staff,
            reservations: &reservations,
            staff_id,
            now: self.clock.now(),
        };
        Ok(self.generator.generate(&query)?)
    }

    /// Blocked days plus days held by accepted whole-day reservations
    pub fn unavailable_days(&self, profile_id: &str) -> Result<Vec<NaiveDate>> {
        self.expire_stale()?;
        let profile = self.load_profile(profile_id)?;
        let accepted = self.store.accepted_whole_days(&profile.id)?;
        Ok(self
            .day_mode
            .unavailable_days(&profile, &accepted)
            .into_iter()
            .collect())
    }

    /// A reservation, visible to its client, the profile owner and the system
    pub fn reservation(&self, actor: &Actor, id: &str) -> Result<Reservation> {
        self.expire_stale()?;
        let reservation = self
            .store
            .get_reservation(id)?
            .ok_or_else(|| SchedulerError::not_found("reservation", id))?;

        let visible = match actor {
            Actor::System => true,
            Actor::User(user) => {
                *user == reservation.client_id
                    || self
                        .store
                        .get_profile(&reservation.profile_id)?
                        .is_some_and(|p| p.owner_id == *user)
            }
        };
        if !visible {
            return Err(
                SchedulerError::permission(format!("reservation {id} belongs to someone else"))
                    .into(),
            );
        }
        Ok(reservation)
    }

    // ========================================================================
    // Reservations
    // ========================================================================

    /// Book a calendar slot, or forward an inquiry for open profiles
    pub fn create_reservation(
        &self,
        client_id: &str,
        request: CreateReservation,
    ) -> Result<BookingOutcome> {
        let result = self.create_reservation_inner(client_id, request);
        record_failure(&result);
        result
    }

    fn create_reservation_inner(
        &self,
        client_id: &str,
        request: CreateReservation,
    ) -> Result<BookingOutcome> {
        self.expire_stale()?;
        let profile = self.load_profile(&request.profile_id)?;

        match profile.booking_mode {
            BookingMode::RequestOpen => {
                let inquiry = Inquiry {
                    profile_id: profile.id.clone(),
                    owner_id: profile.owner_id.clone(),
                    client_id: client_id.to_string(),
                    service_id: request.service_id,
                    date: request.date,
                    message: request.note,
                };
                self.inquiries.forward(&inquiry)?;
                return Ok(BookingOutcome::InquiryForwarded {
                    profile_id: profile.id,
                });
            }
            BookingMode::RequestBlocking => {
                return Err(SchedulerError::validation(
                    "bookingMode",
                    format!("profile {} takes whole-day requests only", profile.id),
                )
                .into());
            }
            BookingMode::Calendar => {}
        }

        let service_id = required(request.service_id.as_deref(), "serviceId")?;
        let date = required(request.date, "date")?;
        let from_time = required(request.from_time, "fromTime")?;
        let service = profile
            .service(service_id)
            .ok_or_else(|| SchedulerError::not_found("service", service_id))?;
        let staff = self.store.staff_for_profile(&profile.id)?;
        if let Some(id) = request.staff_id.as_deref() {
            ensure_team_member(&profile, &staff, id)?;
        }

        let now = self.clock.now();
        let reservation = self.store.insert_checked(&profile.id, date, now, &mut |existing| {
            let query = SlotQuery {
                profile: &profile,
                service,
                date,
                staff: &staff,
                reservations: existing,
                staff_id: request.staff_id.as_deref(),
                now,
            };
            let admission = self
                .lifecycle
                .admit(&self.generator, &query, from_time, request.to_time)?;

            Ok(NewReservation {
                profile_id: profile.id.clone(),
                service_id: Some(service.id.clone()),
                staff_id: admission.staff_id,
                client_id: client_id.to_string(),
                date,
                from_time: admission.from_time,
                to_time: admission.to_time,
                date_only: false,
                note: request.note.clone(),
            })
        })?;

        metrics::record_reservation_created("calendar");
        tracing::info!(
            reservation_id = %reservation.id,
            profile_id = %reservation.profile_id,
            staff_id = ?reservation.staff_id,
            date = %reservation.date,
            from = %reservation.from_time,
            to = %reservation.to_time,
            "Reservation created"
        );
        Ok(BookingOutcome::Reserved { reservation })
    }

    /// Request a whole day from a `request-blocking` profile
    pub fn create_day_reservation(
        &self,
        client_id: &str,
        request: CreateDayReservation,
    ) -> Result<Reservation> {
        let result = self.create_day_reservation_inner(client_id, request);
        record_failure(&result);
        result
    }

    fn create_day_reservation_inner(
        &self,
        client_id: &str,
        request: CreateDayReservation,
    ) -> Result<Reservation> {
        self.expire_stale()?;
        let profile = self.load_profile(&request.profile_id)?;
        if profile.booking_mode != BookingMode::RequestBlocking {
            return Err(SchedulerError::validation(
                "bookingMode",
                format!("profile {} books by {}", profile.id, profile.booking_mode.as_str()),
            )
            .into());
        }
        let date = required(request.date, "date")?;

        let reservation =
            self.store
                .insert_checked(&profile.id, date, self.clock.now(), &mut |existing| {
                    self.day_mode
                        .check_request(&profile, client_id, date, existing)?;
                    Ok(NewReservation::whole_day(
                        profile.id.clone(),
                        client_id,
                        date,
                        request.note.clone(),
                    ))
                })?;

        metrics::record_reservation_created("day");
        tracing::info!(
            reservation_id = %reservation.id,
            profile_id = %reservation.profile_id,
            date = %reservation.date,
            "Day reservation created"
        );
        Ok(reservation)
    }

    /// Move a reservation to `target` on behalf of `actor`
    ///
    /// Accepting also drops the matching entry from the profile's published
    /// available dates in the same transaction.
    pub fn update_status(
        &self,
        actor: &Actor,
        id: &str,
        target: ReservationStatus,
    ) -> Result<Reservation> {
        let result = self.update_status_inner(actor, id, target);
        record_failure(&result);
        result
    }

    fn update_status_inner(
        &self,
        actor: &Actor,
        id: &str,
        target: ReservationStatus,
    ) -> Result<Reservation> {
        self.expire_stale()?;
        let (reservation, change) =
            self.store
                .transition(id, self.clock.now(), &mut |reservation, profile| {
                    match self.lifecycle.apply(actor, reservation, profile, target)? {
                        TransitionOutcome::Applied { to, .. } => Ok(StatusChange::Set {
                            status: to,
                            release_available_date: to == ReservationStatus::Accepted,
                        }),
                        TransitionOutcome::Unchanged => Ok(StatusChange::Keep),
                    }
                })?;

        if let StatusChange::Set { status, .. } = change {
            metrics::record_transition(status.label());
            tracing::info!(
                reservation_id = %reservation.id,
                status = %status,
                "Reservation status changed"
            );
        }
        Ok(reservation)
    }

    /// Expire pending reservations older than the TTL; returns how many
    pub fn expire_stale(&self) -> Result<usize> {
        let now = self.clock.now();
        let cutoff = now
            .checked_sub_signed(self.settings.pending_ttl())
            .unwrap_or(NaiveDateTime::MIN);
        let expired = self.store.expire_pending(cutoff, now)?;

        if expired > 0 {
            metrics::record_expired(expired);
            tracing::info!(expired, cutoff = %cutoff, "Expired pending reservations");
        }
        Ok(expired)
    }

    // ========================================================================
    // Directory
    // ========================================================================

    /// Get a profile
    pub fn profile(&self, profile_id: &str) -> Result<Profile> {
        self.load_profile(profile_id)
    }

    /// Insert or replace a profile
    ///
    /// A new profile may only be created by its future owner; an existing
    /// one only by its owner, who cannot hand it to another user.
    pub fn save_profile(&self, actor: &Actor, profile: &Profile) -> Result<()> {
        if profile.id.trim().is_empty() {
            return Err(SchedulerError::validation("id", "must not be empty").into());
        }
        match self.store.get_profile(&profile.id)? {
            Some(stored) => {
                ensure_owner(actor, &stored)?;
                if stored.owner_id != profile.owner_id {
                    return Err(SchedulerError::validation(
                        "ownerId",
                        "cannot change on an existing profile",
                    )
                    .into());
                }
            }
            None => ensure_owner(actor, profile)?,
        }
        profile.calendar_hours()?;
        for service in &profile.services {
            service.duration.validate("duration")?;
        }

        self.store.save_profile(profile)?;
        tracing::debug!(profile_id = %profile.id, "Profile saved");
        Ok(())
    }

    /// Staff of a profile
    pub fn staff(&self, profile_id: &str) -> Result<Vec<StaffMember>> {
        let profile = self.load_profile(profile_id)?;
        self.store.staff_for_profile(&profile.id)
    }

    /// Insert or replace a staff member of an existing profile
    pub fn save_staff(&self, actor: &Actor, staff: &StaffMember) -> Result<()> {
        if staff.id.trim().is_empty() {
            return Err(SchedulerError::validation("id", "must not be empty").into());
        }
        let profile = self.load_profile(&staff.profile_id)?;
        ensure_owner(actor, &profile)?;
        if staff.capacity == 0 {
            return Err(SchedulerError::validation("capacity", "must be at least 1").into());
        }
        for duration in staff.overrides.iter().filter_map(|o| o.duration) {
            duration.validate("overrides.duration")?;
        }

        self.store.save_staff(staff)?;
        tracing::debug!(staff_id = %staff.id, profile_id = %staff.profile_id, "Staff member saved");
        Ok(())
    }

    /// Remove a staff member; reservations already assigned keep their ID
    pub fn remove_staff(&self, actor: &Actor, profile_id: &str, staff_id: &str) -> Result<()> {
        let profile = self.load_profile(profile_id)?;
        ensure_owner(actor, &profile)?;
        if !self.store.remove_staff(profile_id, staff_id)? {
            return Err(SchedulerError::not_found("staff member", staff_id).into());
        }
        tracing::debug!(staff_id, profile_id, "Staff member removed");
        Ok(())
    }

    fn load_profile(&self, profile_id: &str) -> Result<Profile> {
        self.store
            .get_profile(profile_id)?
            .ok_or_else(|| SchedulerError::not_found("profile", profile_id).into())
    }
}

fn ensure_owner(actor: &Actor, profile: &Profile) -> SchedulerResult<()> {
    if matches!(actor, Actor::System) || actor.is_user(&profile.owner_id) {
        Ok(())
    } else {
        Err(SchedulerError::permission(format!(
            "only the owner may change profile {}",
            profile.id
        )))
    }
}

fn ensure_team_member(
    profile: &Profile,
    staff: &[StaffMember],
    staff_id: &str,
) -> SchedulerResult<()> {
    if !profile.has_team() {
        return Err(SchedulerError::validation("staffId", "profile has no team"));
    }
    if staff.iter().any(|s| s.id == staff_id) {
        Ok(())
    } else {
        Err(SchedulerError::not_found("staff member", staff_id))
    }
}

fn record_failure<T>(result: &Result<T>) {
    if let Err(Error::Scheduler(err)) = result {
        if let Some(reason) = err.conflict_reason() {
            metrics::record_conflict(reason.as_str());
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
