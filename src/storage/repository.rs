//! Repository Pattern for Database Abstraction
//!
//! Trait-based repositories decouple the booking service from SQLite:
//! - Profiles and staff records are stored as JSON documents mirrored from
//!   the services that own them
//! - Reservations are typed rows, the only durable scheduling state
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      BookingService                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      BookingStore                           │
//! │  ProfileRepository, StaffRepository, ReservationRepository  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 SqliteBookingRepository                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Atomicity
//!
//! Check-then-insert and status changes run inside `BEGIN IMMEDIATE`
//! transactions: the write lock is taken before the live rows are read, so
//! a concurrent request observes the winner's row and fails its own check.
//!
//! # Usage
//!
//! ```rust,ignore
//! use termin::storage::{ReservationRepository, SqliteBookingRepository};
//!
//! let repo = SqliteBookingRepository::new("data/termin.db")?;
//! let live = repo.reservations_on("salon", date)?;
//! ```

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use crate::error::{Error, Result};
use crate::models::{NewReservation, Profile, Reservation, ReservationStatus, StaffMember};
use crate::scheduler::error::{SchedulerError, SchedulerResult};

/// Storage format of timestamps; sorts lexicographically
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ============================================================================
// Core Types
// ============================================================================

/// Decision taken on a reservation inside a status transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// Leave the row untouched
    Keep,

    /// Write a new status
    Set {
        status: ReservationStatus,

        /// Also drop the reservation's `(date, fromTime, toTime)` from the
        /// profile's published available dates
        release_available_date: bool,
    },
}

// ============================================================================
// Repository Traits
// ============================================================================

/// Mirror of provider profiles
pub trait ProfileRepository: Send + Sync {
    /// Insert or replace a profile
    fn save_profile(&self, profile: &Profile) -> Result<()>;

    /// Get profile by ID
    fn get_profile(&self, id: &str) -> Result<Option<Profile>>;
}

/// Mirror of the staff directory
pub trait StaffRepository: Send + Sync {
    /// Insert or replace a staff member
    fn save_staff(&self, staff: &StaffMember) -> Result<()>;

    /// Remove a staff member; returns whether one existed
    fn remove_staff(&self, profile_id: &str, staff_id: &str) -> Result<bool>;

    /// Staff of a profile, ordered by ID
    fn staff_for_profile(&self, profile_id: &str) -> Result<Vec<StaffMember>>;
}

/// Durable reservation rows
pub trait ReservationRepository: Send + Sync {
    /// Get reservation by ID
    fn get_reservation(&self, id: &str) -> Result<Option<Reservation>>;

    /// Live (pending or accepted) reservations of a profile on a date
    fn reservations_on(&self, profile_id: &str, date: NaiveDate) -> Result<Vec<Reservation>>;

    /// Accepted whole-day reservations of a profile
    fn accepted_whole_days(&self, profile_id: &str) -> Result<Vec<Reservation>>;

    /// Insert a reservation produced by `check` from the live rows of
    /// `(profile_id, date)`, atomically with reading them
    fn insert_checked(
        &self,
        profile_id: &str,
        date: NaiveDate,
        now: NaiveDateTime,
        check: &mut dyn FnMut(&[Reservation]) -> SchedulerResult<NewReservation>,
    ) -> Result<Reservation>;

    /// Apply the status change decided by `decide`, atomically with reading
    /// the reservation and its profile
    fn transition(
        &self,
        id: &str,
        now: NaiveDateTime,
        decide: &mut dyn FnMut(&Reservation, &Profile) -> SchedulerResult<StatusChange>,
    ) -> Result<(Reservation, StatusChange)>;

    /// Expire pending reservations created before `cutoff`; returns how many
    fn expire_pending(&self, cutoff: NaiveDateTime, now: NaiveDateTime) -> Result<usize>;
}

/// Everything the booking service needs from storage
pub trait BookingStore: ProfileRepository + StaffRepository + ReservationRepository {}

impl<T> BookingStore for T where T: ProfileRepository + StaffRepository + ReservationRepository {}

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite implementation of the booking repositories
///
/// Uses `Mutex` to ensure thread-safety for the SQLite connection.
pub struct SqliteBookingRepository {
    conn: Mutex<Connection>,
}

impl SqliteBookingRepository {
    /// Create a new SQLite repository
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // WAL lets availability reads proceed while a booking commits
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA busy_timeout=5000;",
        )?;

        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.create_schema()?;

        tracing::info!(path = %path.display(), "SQLite booking repository initialized");
        Ok(repo)
    }

    /// Create in-memory repository (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.create_schema()?;
        Ok(repo)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::other("SQLite connection mutex poisoned"))
    }

    /// Create database schema
    fn create_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
                CREATE TABLE IF NOT EXISTS profiles (
                    id TEXT PRIMARY KEY,
                    owner_id TEXT NOT NULL,
                    document TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS staff_members (
                    id TEXT NOT NULL,
                    profile_id TEXT NOT NULL,
                    document TEXT NOT NULL,
                    PRIMARY KEY (profile_id, id)
                );

                CREATE TABLE IF NOT EXISTS reservations (
                    id TEXT PRIMARY KEY,
                    profile_id TEXT NOT NULL,
                    service_id TEXT,
                    staff_id TEXT,
                    client_id TEXT NOT NULL,
                    date TEXT NOT NULL,
                    from_time TEXT NOT NULL,
                    to_time TEXT NOT NULL,
                    status TEXT NOT NULL DEFAULT 'oczekująca',
                    date_only INTEGER NOT NULL DEFAULT 0,
                    note TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    CHECK (from_time < to_time)
                );

                CREATE INDEX IF NOT EXISTS idx_reservations_profile_date
                    ON reservations(profile_id, date);

                CREATE INDEX IF NOT EXISTS idx_reservations_status_created
                    ON reservations(status, created_at);
                "#,
        )?;

        Ok(())
    }

    fn load_profile(conn: &Connection, id: &str) -> Result<Option<Profile>> {
        let document: Option<String> = conn
            .query_row(
                "SELECT document FROM profiles WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        document
            .map(|doc| serde_json::from_str(&doc).map_err(Error::from))
            .transpose()
    }

    fn write_profile(conn: &Connection, profile: &Profile) -> Result<()> {
        let document = serde_json::to_string(profile)?;
        conn.execute(
            r#"
                INSERT INTO profiles (id, owner_id, document) VALUES (?1, ?2, ?3)
                ON CONFLICT(id) DO UPDATE SET owner_id = excluded.owner_id, document = excluded.document
                "#,
            params![profile.id, profile.owner_id, document],
        )?;
        Ok(())
    }

    fn load_reservation(conn: &Connection, id: &str) -> Result<Option<Reservation>> {
        let reservation = conn
            .query_row(
                &format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = ?1"),
                params![id],
                reservation_from_row,
            )
            .optional()?;
        Ok(reservation)
    }

    fn live_on(conn: &Connection, profile_id: &str, date: NaiveDate) -> Result<Vec<Reservation>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations
             WHERE profile_id = ?1 AND date = ?2 AND status IN (?3, ?4)
             ORDER BY from_time, created_at"
        ))?;

        let rows = stmt
            .query_map(
                params![
                    profile_id,
                    date.to_string(),
                    ReservationStatus::Pending.as_str(),
                    ReservationStatus::Accepted.as_str()
                ],
                reservation_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn insert_row(conn: &Connection, r: &Reservation) -> Result<()> {
        conn.execute(
            r#"
                INSERT INTO reservations (
                    id, profile_id, service_id, staff_id, client_id, date,
                    from_time, to_time, status, date_only, note, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
            params![
                r.id,
                r.profile_id,
                r.service_id,
                r.staff_id,
                r.client_id,
                r.date.to_string(),
                r.from_time.to_string(),
                r.to_time.to_string(),
                r.status.as_str(),
                r.date_only,
                r.note,
                format_timestamp(r.created_at),
                format_timestamp(r.updated_at),
            ],
        )?;
        Ok(())
    }
}

const RESERVATION_COLUMNS: &str = "id, profile_id, service_id, staff_id, client_id, date, \
     from_time, to_time, status, date_only, note, created_at, updated_at";

fn format_timestamp(value: NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Drop sub-second precision so stored and returned rows agree
fn whole_seconds(value: NaiveDateTime) -> NaiveDateTime {
    value.with_nanosecond(0).unwrap_or(value)
}

fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn reservation_from_row(row: &Row<'_>) -> rusqlite::Result<Reservation> {
    Ok(Reservation {
        id: row.get(0)?,
        profile_id: row.get(1)?,
        service_id: row.get(2)?,
        staff_id: row.get(3)?,
        client_id: row.get(4)?,
        date: parse_column(row, 5)?,
        from_time: parse_column(row, 6)?,
        to_time: parse_column(row, 7)?,
        status: parse_column(row, 8)?,
        date_only: row.get(9)?,
        note: row.get(10)?,
        created_at: parse_column(row, 11)?,
        updated_at: parse_column(row, 12)?,
    })
}

impl ProfileRepository for SqliteBookingRepository {
    fn save_profile(&self, profile: &Profile) -> Result<()> {
        let conn = self.conn()?;
        Self::write_profile(&conn, profile)
    }

    fn get_profile(&self, id: &str) -> Result<Option<Profile>> {
        let conn = self.conn()?;
        Self::load_profile(&conn, id)
    }
}

impl StaffRepository for SqliteBookingRepository {
    fn save_staff(&self, staff: &StaffMember) -> Result<()> {
        let conn = self.conn()?;
        let document = serde_json::to_string(staff)?;
        conn.execute(
            r#"
                INSERT INTO staff_members (id, profile_id, document) VALUES (?1, ?2, ?3)
                ON CONFLICT(profile_id, id) DO UPDATE SET document = excluded.document
                "#,
            params![staff.id, staff.profile_id, document],
        )?;
        Ok(())
    }

    fn remove_staff(&self, profile_id: &str, staff_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM staff_members WHERE profile_id = ?1 AND id = ?2",
            params![profile_id, staff_id],
        )?;
        Ok(removed > 0)
    }

    fn staff_for_profile(&self, profile_id: &str) -> Result<Vec<StaffMember>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT document FROM staff_members WHERE profile_id = ?1 ORDER BY id")?;
        let documents = stmt
            .query_map(params![profile_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        documents
            .iter()
            .map(|doc| serde_json::from_str(doc).map_err(Error::from))
            .collect()
    }
}

impl ReservationRepository for SqliteBookingRepository {
    fn get_reservation(&self, id: &str) -> Result<Option<Reservation>> {
        let conn = self.conn()?;
        Self::load_reservation(&conn, id)
    }

    fn reservations_on(&self, profile_id: &str, date: NaiveDate) -> Result<Vec<Reservation>> {
        let conn = self.conn()?;
        Self::live_on(&conn, profile_id, date)
    }

    fn accepted_whole_days(&self, profile_id: &str) -> Result<Vec<Reservation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations
             WHERE profile_id = ?1 AND date_only = 1 AND status = ?2
             ORDER BY date"
        ))?;
        let rows = stmt
            .query_map(
                params![profile_id, ReservationStatus::Accepted.as_str()],
                reservation_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn insert_checked(
        &self,
        profile_id: &str,
        date: NaiveDate,
        now: NaiveDateTime,
        check: &mut dyn FnMut(&[Reservation]) -> SchedulerResult<NewReservation>,
    ) -> Result<Reservation> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = Self::live_on(&tx, profile_id, date)?;
        let new = check(&existing)?;
        if new.profile_id != profile_id || new.date != date {
            return Err(SchedulerError::validation(
                "date",
                "reservation does not belong to the checked day",
            )
            .into());
        }
        new.validate()?;

        let reservation = new.into_reservation(whole_seconds(now));
        Self::insert_row(&tx, &reservation)?;
        tx.commit()?;

        tracing::debug!(
            reservation_id = %reservation.id,
            profile_id = %reservation.profile_id,
            date = %reservation.date,
            "Reservation inserted"
        );
        Ok(reservation)
    }

    fn transition(
        &self,
        id: &str,
        now: NaiveDateTime,
        decide: &mut dyn FnMut(&Reservation, &Profile) -> SchedulerResult<StatusChange>,
    ) -> Result<(Reservation, StatusChange)> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut reservation = Self::load_reservation(&tx, id)?
            .ok_or_else(|| SchedulerError::not_found("reservation", id))?;
        let mut profile = Self::load_profile(&tx, &reservation.profile_id)?
            .ok_or_else(|| SchedulerError::not_found("profile", &reservation.profile_id))?;

        let change = decide(&reservation, &profile)?;
        if let StatusChange::Set {
            status,
            release_available_date,
        } = change
        {
            let now = whole_seconds(now);
            tx.execute(
                "UPDATE reservations SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), format_timestamp(now), reservation.id],
            )?;
            reservation.status = status;
            reservation.updated_at = now;

            if release_available_date
                && profile.remove_available_date(
                    reservation.date,
                    reservation.from_time,
                    reservation.to_time,
                )
            {
                Self::write_profile(&tx, &profile)?;
            }
        }

        tx.commit()?;
        Ok((reservation, change))
    }

    fn expire_pending(&self, cutoff: NaiveDateTime, now: NaiveDateTime) -> Result<usize> {
        let conn = self.conn()?;
        let expired = conn.execute(
            "UPDATE reservations SET status = ?1, updated_at = ?2
             WHERE status = ?3 AND created_at < ?4",
            params![
                ReservationStatus::Expired.as_str(),
                format_timestamp(now),
                ReservationStatus::Pending.as_str(),
                format_timestamp(cutoff),
            ],
        )?;
        Ok(expired)
    }
}

// ============================================================================
// Tests
// ============================================================================
