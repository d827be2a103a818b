//! Error types for the scheduling core

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Why a well-formed request could not be honoured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// Capacity exhausted or the slot no longer exists
    SlotUnavailable,

    /// The provider blocked the requested day
    BlockedDay,

    /// An accepted whole-day reservation already holds the day
    DayTaken,

    /// The same client already waits for an answer on that day
    DuplicateRequest,

    /// The reservation is not in a state that allows the transition
    InvalidTransition,
}

impl ConflictReason {
    /// Stable identifier, also used as a metrics label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SlotUnavailable => "slot_unavailable",
            Self::BlockedDay => "blocked_day",
            Self::DayTaken => "day_taken",
            Self::DuplicateRequest => "duplicate_request",
            Self::InvalidTransition => "invalid_transition",
        }
    }
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduler-specific errors
///
/// Every variant is a business outcome the caller can act on. Storage and
/// infrastructure failures live in [`crate::error::Error`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// Missing or malformed input
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Request lost a race or violates a booking rule
    #[error("Conflict ({reason}): {message}")]
    Conflict {
        reason: ConflictReason,
        message: String,
    },

    /// Actor may not perform the operation
    #[error("Permission denied: {0}")]
    Permission(String),
}

impl SchedulerError {
    /// Create a validation error
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(reason: ConflictReason, message: impl Into<String>) -> Self {
        Self::Conflict {
            reason,
            message: message.into(),
        }
    }

    /// Create a permission error
    pub fn permission(message: impl Into<String>) -> Self {
        Self::Permission(message.into())
    }

    /// Conflict reason, if this is a conflict
    pub fn conflict_reason(&self) -> Option<ConflictReason> {
        match self {
            Self::Conflict { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Check if the caller may retry after refreshing its view
    ///
    /// Only conflicts qualify: availability may have changed in between.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
