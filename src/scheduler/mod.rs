//! Availability and slot scheduling engine
//!
//! This module turns a provider's working hours, staff roster, per-staff
//! capacity, existing reservations and service duration into a set of
//! bookable time slots, and decides whether a booking request may be
//! committed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  Calendar Model  │  weekly hours, breaks, durations, step/buffer
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐     ┌─────────────────────┐
//! │  Slot Generator  │────►│ Capacity Aggregator │
//! └────────┬─────────┘     └──────────┬──────────┘
//!          │                          ▼
//!          │               ┌─────────────────────┐
//!          │               │  Overlap Resolver   │
//!          │               └─────────────────────┘
//!          ▼
//! ┌──────────────────┐     ┌─────────────────────┐
//! │    Lifecycle     │     │  Day-Mode Allocator │
//! └──────────────────┘     └─────────────────────┘
//! ```
//!
//! Everything here is synchronous and free of I/O. Callers load the rows,
//! pass them in, and persist the outcome.
//!
//! # Modules
//!
//! - [`calendar`] - Time of day, weekly hours, durations, step and buffer
//! - [`slots`] - Candidate generation and slot tagging
//! - [`capacity`] - Solo, user-pick and auto-assign capacity regimes
//! - [`overlap`] - Buffered interval conflicts and slot classification
//! - [`lifecycle`] - Status transitions, permissions and booking admission
//! - [`day_mode`] - Whole-day blocking and duplicate-request guard
//!
//! # Defaults
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `step_minutes` | 15 | Distance between candidate starts |
//! | `buffer_minutes` | 15 | Gap kept free after every reservation |

pub mod calendar;
pub mod capacity;
pub mod day_mode;
pub mod error;
pub mod lifecycle;
pub mod overlap;
pub mod slots;

// Re-export main types
pub use calendar::{
    weekday_index, CalendarSettings, DurationUnit, ServiceDuration, TimeOfDay, TimeRange,
    WeeklyHours, DEFAULT_BUFFER_MINUTES, DEFAULT_STEP_MINUTES,
};
pub use capacity::{CapacityAggregator, CapacityMode, Occupancy, PoolMember};
pub use day_mode::DayModeAllocator;
pub use error::{ConflictReason, SchedulerError, SchedulerResult};
pub use lifecycle::{
    Actor, Admission, RepeatTransitionPolicy, ReservationLifecycle, TransitionOutcome,
};
pub use overlap::{Interval, OverlapResolver, SlotStatus};
pub use slots::{Resource, Slot, SlotGenerator, SlotQuery};
