//! termin - appointment availability and reservation engine
//!
//! Computes bookable time slots for service providers and their staff, and
//! runs the reservation lifecycle with conflict and capacity checks.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`scheduler`] - Slot generation, capacity, overlap and lifecycle rules
//! - [`models`] - Profiles, staff members and reservations
//! - [`storage`] - SQLite persistence with atomic check-then-insert
//! - [`booking`] - Booking service tying the engine to storage
//! - [`api`] - HTTP server and handlers
//! - [`config`] - Configuration management and settings
//! - [`metrics`] - Prometheus metrics
//! - [`error`] - Unified error type
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use termin::booking::BookingService;
//! use termin::config::Config;
//! use termin::storage::SqliteBookingRepository;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let store = Arc::new(SqliteBookingRepository::new(&config.database.sqlite_path)?);
//!     let service = BookingService::new(store, &config);
//!     let days = service.unavailable_days("salon")?;
//!     println!("{days:?}");
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod booking;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod scheduler;
pub mod storage;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::booking::{BookingOutcome, BookingService, CreateReservation};
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result, TerminErrorTrait};
    pub use crate::models::{BookingMode, Profile, Reservation, ReservationStatus, StaffMember};
    pub use crate::scheduler::{Actor, Slot, SlotStatus, TimeOfDay};
    pub use crate::storage::SqliteBookingRepository;
}

// Direct re-exports for convenience
pub use models::{Profile, Reservation, ReservationStatus, StaffMember};
