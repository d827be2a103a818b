//! Integration tests module
//!
//! End-to-end tests of the booking engine over SQLite:
//! - Calendar bookings from availability to acceptance
//! - Request-blocking whole-day bookings
//! - Racing clients on one slot
//! - The HTTP surface

pub mod api_test;
pub mod booking_flow_test;
pub mod concurrency_test;
pub mod day_mode_test;
