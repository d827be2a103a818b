//! Core data structures for providers, staff and reservations
//!
//! Profiles, services and staff records are owned by external services; the
//! engine only reads them. Reservations are the durable records every
//! availability query is recomputed from.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::scheduler::calendar::{ServiceDuration, TimeOfDay, TimeRange, WeeklyHours};
use crate::scheduler::error::{SchedulerError, SchedulerResult};

// ============================================================================
// Profile
// ============================================================================

/// How clients book a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookingMode {
    /// Time slots computed from working hours
    Calendar,

    /// Whole-day requests the provider accepts or rejects
    RequestBlocking,

    /// Free-form inquiry, no reservation is created
    RequestOpen,
}

impl BookingMode {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calendar => "calendar",
            Self::RequestBlocking => "request-blocking",
            Self::RequestOpen => "request-open",
        }
    }
}

/// How a team profile assigns staff to a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssignmentMode {
    /// The client chooses the staff member
    #[default]
    UserPick,

    /// The engine chooses among eligible staff
    AutoAssign,
}

/// Team settings of a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSettings {
    pub enabled: bool,
    #[serde(default)]
    pub assignment_mode: AssignmentMode,
}

/// Profile-level opening hours used when no team is configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub from: TimeOfDay,
    pub to: TimeOfDay,
}

/// A statically published availability entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableDate {
    pub date: NaiveDate,
    pub from_time: TimeOfDay,
    pub to_time: TimeOfDay,
}

/// A bookable service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub duration: ServiceDuration,
}

/// Provider profile as seen by the scheduling engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,

    /// User who owns the profile and answers requests
    pub owner_id: String,

    pub booking_mode: BookingMode,

    #[serde(default)]
    pub team: TeamSettings,

    /// Weekdays (0 = Sunday) the profile works when no team is configured
    #[serde(default)]
    pub working_days: Vec<u8>,

    #[serde(default)]
    pub working_hours: Option<WorkingHours>,

    #[serde(default)]
    pub services: Vec<Service>,

    #[serde(default)]
    pub blocked_days: BTreeSet<NaiveDate>,

    #[serde(default)]
    pub available_dates: Vec<AvailableDate>,
}

impl Profile {
    /// Find a service of this profile
    pub fn service(&self, service_id: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id == service_id)
    }

    /// Check if the provider blocked a date
    pub fn is_blocked(&self, date: NaiveDate) -> bool {
        self.blocked_days.contains(&date)
    }

    /// Check if staff members carry the calendar instead of the profile
    pub fn has_team(&self) -> bool {
        self.team.enabled
    }

    /// Weekly hours of the profile itself
    pub fn calendar_hours(&self) -> SchedulerResult<WeeklyHours> {
        match self.working_hours {
            Some(hours) => {
                WeeklyHours::uniform(&self.working_days, TimeRange::new(hours.from, hours.to))
            }
            None => Ok(WeeklyHours::new()),
        }
    }

    /// Drop a published availability entry; returns whether one was removed
    pub fn remove_available_date(
        &mut self,
        date: NaiveDate,
        from_time: TimeOfDay,
        to_time: TimeOfDay,
    ) -> bool {
        let before = self.available_dates.len();
        self.available_dates
            .retain(|d| !(d.date == date && d.from_time == from_time && d.to_time == to_time));
        self.available_dates.len() != before
    }
}

// ============================================================================
// Staff
// ============================================================================

/// Per-service override for one staff member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffOverride {
    pub service_id: String,
    #[serde(default)]
    pub duration: Option<ServiceDuration>,
    #[serde(default)]
    pub price: Option<f64>,
}

/// One-off unavailability on a specific date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffBreak {
    pub date: NaiveDate,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl StaffBreak {
    /// The interval of the break
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }
}

fn default_capacity() -> u32 {
    1
}

fn default_active() -> bool {
    true
}

/// A staff member of a team profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffMember {
    pub id: String,
    pub profile_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub service_ids: BTreeSet<String>,
    #[serde(default)]
    pub overrides: Vec<StaffOverride>,
    #[serde(default)]
    pub working_hours: WeeklyHours,
    #[serde(default)]
    pub breaks: Vec<StaffBreak>,
    #[serde(default)]
    pub days_off: BTreeSet<NaiveDate>,

    /// Concurrent bookings this staff member can hold
    #[serde(default = "default_capacity")]
    pub capacity: u32,
}

impl StaffMember {
    /// Create an active staff member with capacity 1 and no hours
    pub fn new(id: impl Into<String>, profile_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            profile_id: profile_id.into(),
            name: String::new(),
            active: true,
            service_ids: BTreeSet::new(),
            overrides: Vec::new(),
            working_hours: WeeklyHours::new(),
            breaks: Vec::new(),
            days_off: BTreeSet::new(),
            capacity: 1,
        }
    }

    /// Check if this staff member performs a service
    pub fn performs(&self, service_id: &str) -> bool {
        self.service_ids.contains(service_id)
    }

    /// Check if a date is a day off
    pub fn is_off(&self, date: NaiveDate) -> bool {
        self.days_off.contains(&date)
    }

    /// Active, working that day, and performing the service
    pub fn is_eligible(&self, service_id: &str, date: NaiveDate) -> bool {
        self.active && !self.is_off(date) && self.performs(service_id)
    }

    /// Duration of a service when performed by this staff member
    pub fn effective_duration(&self, service: &Service) -> ServiceDuration {
        self.overrides
            .iter()
            .find(|o| o.service_id == service.id)
            .and_then(|o| o.duration)
            .unwrap_or(service.duration)
    }

    /// Capacity, never below one
    pub fn capacity(&self) -> u32 {
        self.capacity.max(1)
    }

    /// Breaks falling on a date
    pub fn breaks_on(&self, date: NaiveDate) -> Vec<TimeRange> {
        self.breaks
            .iter()
            .filter(|b| b.date == date)
            .map(StaffBreak::range)
            .collect()
    }
}

// ============================================================================
// Reservation
// ============================================================================

/// Reservation status, serialized with the marketplace's Polish names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationStatus {
    #[serde(rename = "oczekująca")]
    Pending,
    #[serde(rename = "zaakceptowana")]
    Accepted,
    #[serde(rename = "odrzucona")]
    Rejected,
    #[serde(rename = "anulowana")]
    Cancelled,
    #[serde(rename = "wygasła")]
    Expired,
}

impl ReservationStatus {
    /// All statuses
    pub fn all() -> [Self; 5] {
        [
            Self::Pending,
            Self::Accepted,
            Self::Rejected,
            Self::Cancelled,
            Self::Expired,
        ]
    }

    /// Wire and storage name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "oczekująca",
            Self::Accepted => "zaakceptowana",
            Self::Rejected => "odrzucona",
            Self::Cancelled => "anulowana",
            Self::Expired => "wygasła",
        }
    }

    /// English label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    /// No transition leaves a terminal status
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Live reservations occupy capacity
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Pending | Self::Accepted)
    }
}

impl FromStr for ReservationStatus {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|status| status.as_str() == s || status.label() == s)
            .ok_or_else(|| SchedulerError::validation("status", format!("unknown status '{s}'")))
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted reservation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: String,
    pub profile_id: String,
    pub service_id: Option<String>,
    pub staff_id: Option<String>,
    pub client_id: String,
    pub date: NaiveDate,
    pub from_time: TimeOfDay,
    pub to_time: TimeOfDay,
    pub status: ReservationStatus,
    pub date_only: bool,
    pub note: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Reservation {
    /// The booked interval
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.from_time, self.to_time)
    }

    /// Check if this is an accepted whole-day reservation
    pub fn is_accepted_whole_day(&self) -> bool {
        self.date_only && self.status == ReservationStatus::Accepted
    }
}

/// A reservation about to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    pub profile_id: String,
    pub service_id: Option<String>,
    pub staff_id: Option<String>,
    pub client_id: String,
    pub date: NaiveDate,
    pub from_time: TimeOfDay,
    pub to_time: TimeOfDay,
    pub date_only: bool,
    pub note: Option<String>,
}

impl NewReservation {
    /// A whole-day request using the `00:00-23:59` sentinel
    pub fn whole_day(
        profile_id: impl Into<String>,
        client_id: impl Into<String>,
        date: NaiveDate,
        note: Option<String>,
    ) -> Self {
        Self {
            profile_id: profile_id.into(),
            service_id: None,
            staff_id: None,
            client_id: client_id.into(),
            date,
            from_time: TimeOfDay::MIDNIGHT,
            to_time: TimeOfDay::END_OF_DAY,
            date_only: true,
            note,
        }
    }

    /// Check the non-empty interval invariant
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.from_time >= self.to_time {
            return Err(SchedulerError::validation(
                "toTime",
                format!("{} is not after {}", self.to_time, self.from_time),
            ));
        }
        Ok(())
    }

    /// Materialize as a pending reservation
    pub fn into_reservation(self, now: NaiveDateTime) -> Reservation {
        Reservation {
            id: Uuid::new_v4().to_string(),
            profile_id: self.profile_id,
            service_id: self.service_id,
            staff_id: self.staff_id,
            client_id: self.client_id,
            date: self.date,
            from_time: self.from_time,
            to_time: self.to_time,
            status: ReservationStatus::Pending,
            date_only: self.date_only,
            note: self.note,
            created_at: now,
            updated_at: now,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
