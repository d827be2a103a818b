//! Persistence for profiles, staff and reservations
//!
//! SQLite holds everything. Reservation rows are the source of truth every
//! availability query is recomputed from; there is no in-process slot state.

pub mod repository;

pub use repository::{
    BookingStore, ProfileRepository, ReservationRepository, SqliteBookingRepository,
    StaffRepository, StatusChange,
};
