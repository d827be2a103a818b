//! Request payloads accepted by the booking service

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Reservation, ReservationStatus};
use crate::scheduler::calendar::TimeOfDay;
use crate::scheduler::error::{SchedulerError, SchedulerResult};

/// Booking request for `calendar` and `request-open` profiles
///
/// Calendar profiles need `serviceId`, `date` and `fromTime`; `toTime` is
/// checked against the effective duration when present. Open profiles
/// forward the request as an inquiry and ignore the time fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservation {
    pub profile_id: String,
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub staff_id: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub from_time: Option<TimeOfDay>,
    #[serde(default)]
    pub to_time: Option<TimeOfDay>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Whole-day request for `request-blocking` profiles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDayReservation {
    pub profile_id: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Status change request; accepts wire names and English labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatus {
    pub status: String,
}

impl UpdateStatus {
    /// Parsed target status
    pub fn target(&self) -> SchedulerResult<ReservationStatus> {
        self.status.parse()
    }
}

/// Result of a booking request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum BookingOutcome {
    /// A pending reservation was created
    Reserved { reservation: Reservation },

    /// The profile takes open inquiries; the provider was notified
    InquiryForwarded { profile_id: String },
}

impl BookingOutcome {
    /// The created reservation, if any
    pub fn reservation(&self) -> Option<&Reservation> {
        match self {
            Self::Reserved { reservation } => Some(reservation),
            Self::InquiryForwarded { .. } => None,
        }
    }
}

/// Unwrap a required request field
pub(crate) fn required<T>(value: Option<T>, field: &str) -> SchedulerResult<T> {
    value.ok_or_else(|| SchedulerError::validation(field, "is required"))
}
