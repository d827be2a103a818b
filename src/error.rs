//! Unified error handling for the termin crate
//!
//! This module consolidates the scheduling errors and the infrastructure
//! failures around them into a single `Error` enum, while keeping the
//! domain error available to code that only deals with scheduling.
//!
//! # Architecture
//!
//! - [`TerminErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping domain and storage errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use termin::error::{Error, ErrorCategory, TerminErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     match err.category() {
//!         ErrorCategory::Conflict => println!("Refresh and retry: {}", err.localized_desc()),
//!         _ => eprintln!("Request failed: {}", err),
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::scheduler::error::{ConflictReason, SchedulerError};

/// Common trait for all termin error types
pub trait TerminErrorTrait: std::error::Error {
    /// Check if the caller may retry after refreshing its view
    fn is_recoverable(&self) -> bool;

    /// Description shown to marketplace users
    fn localized_desc(&self) -> String;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
///
/// The first four are caller mistakes or business outcomes and are never
/// collapsed into one another; the rest are server-side failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing or malformed input
    Validation,
    /// Profile, service, staff member or reservation missing
    NotFound,
    /// Capacity exhausted, blocked day, duplicate request, invalid transition
    Conflict,
    /// Actor is not the owner or requester
    Permission,
    /// Storage and I/O errors
    Storage,
    /// Configuration errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Stable identifier used in API responses and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Permission => "permission",
            Self::Storage => "storage",
            Self::Config => "config",
            Self::Other => "other",
        }
    }

    /// Get localized description for the category
    pub fn localized_desc(&self) -> &'static str {
        match self {
            Self::Validation => "Nieprawidłowe dane",
            Self::NotFound => "Nie znaleziono",
            Self::Conflict => "Termin jest niedostępny",
            Self::Permission => "Brak uprawnień",
            Self::Storage => "Błąd bazy danych",
            Self::Config => "Błąd konfiguracji",
            Self::Other => "Nieznany błąd",
        }
    }

    /// Check if the category is a server-side failure
    pub fn is_server_side(&self) -> bool {
        matches!(self, Self::Storage | Self::Config | Self::Other)
    }
}

impl TerminErrorTrait for SchedulerError {
    fn is_recoverable(&self) -> bool {
        SchedulerError::is_recoverable(self)
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::Validation { field, .. } => {
                format!("{}: {field}", ErrorCategory::Validation.localized_desc())
            }
            Self::NotFound { entity, id } => {
                format!("{}: {entity} {id}", ErrorCategory::NotFound.localized_desc())
            }
            Self::Conflict { reason, .. } => match reason {
                ConflictReason::SlotUnavailable => "Wybrany termin jest już zajęty".to_string(),
                ConflictReason::BlockedDay => "Usługodawca zablokował ten dzień".to_string(),
                ConflictReason::DayTaken => "Ten dzień jest już zarezerwowany".to_string(),
                ConflictReason::DuplicateRequest => {
                    "Prośba o ten dzień czeka już na odpowiedź".to_string()
                }
                ConflictReason::InvalidTransition => {
                    "Nie można zmienić statusu tej rezerwacji".to_string()
                }
            },
            Self::Permission(_) => ErrorCategory::Permission.localized_desc().to_string(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::Permission(_) => ErrorCategory::Permission,
        }
    }
}

/// Unified error type for the termin crate
#[derive(Error, Debug)]
pub enum Error {
    /// Scheduling outcomes: validation, not found, conflict, permission
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl TerminErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Scheduler(e) => e.is_recoverable(),
            Self::Database(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            Self::Database(_) => false,
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn localized_desc(&self) -> String {
        match self {
            Self::Scheduler(e) => e.localized_desc(),
            Self::Database(_) | Self::Io(_) | Self::Json(_) => {
                ErrorCategory::Storage.localized_desc().to_string()
            }
            Self::Config(msg) => format!("{}: {msg}", ErrorCategory::Config.localized_desc()),
            Self::Other { .. } => ErrorCategory::Other.localized_desc().to_string(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Scheduler(e) => e.category(),
            Self::Database(_) | Self::Io(_) | Self::Json(_) => ErrorCategory::Storage,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Scheduling error, if this is one
    pub fn as_scheduler(&self) -> Option<&SchedulerError> {
        match self {
            Self::Scheduler(e) => Some(e),
            _ => None,
        }
    }

    /// Conflict reason, if this is a conflict
    pub fn conflict_reason(&self) -> Option<ConflictReason> {
        self.as_scheduler().and_then(SchedulerError::conflict_reason)
    }
}

// Conversion from rusqlite::Error
impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err)
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
