//! Common test utilities

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use termin::booking::{BookingService, CreateReservation, FixedClock};
use termin::config::Config;
use termin::models::{
    AssignmentMode, BookingMode, NewReservation, Profile, Reservation, Service, StaffMember,
    TeamSettings, WorkingHours,
};
use termin::scheduler::{ServiceDuration, TimeOfDay, TimeRange, WeeklyHours};
use termin::storage::{ProfileRepository, SqliteBookingRepository, StaffRepository};

/// Parse "HH:MM"
pub fn t(s: &str) -> TimeOfDay {
    s.parse().unwrap()
}

/// A Monday
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
}

/// `date` at "HH:MM:SS"
pub fn at(date: NaiveDate, hms: &str) -> NaiveDateTime {
    let time = chrono::NaiveTime::parse_from_str(hms, "%H:%M:%S").unwrap();
    date.and_time(time)
}

/// The Friday before [`monday`], 09:00
pub fn friday_before() -> NaiveDateTime {
    at(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), "09:00:00")
}

pub fn service(id: &str, minutes: u32) -> Service {
    Service {
        id: id.to_string(),
        name: id.to_string(),
        duration: ServiceDuration::minutes(minutes),
    }
}

/// Profile open Monday to Friday between `from` and `to`
pub fn solo_profile(id: &str, mode: BookingMode, from: &str, to: &str) -> Profile {
    Profile {
        id: id.to_string(),
        owner_id: format!("{id}-owner"),
        booking_mode: mode,
        team: TeamSettings::default(),
        working_days: vec![1, 2, 3, 4, 5],
        working_hours: Some(WorkingHours {
            from: t(from),
            to: t(to),
        }),
        services: vec![service("cut", 45)],
        blocked_days: BTreeSet::new(),
        available_dates: Vec::new(),
    }
}

/// Calendar profile whose staff carry the hours
pub fn team_profile(id: &str, assignment: AssignmentMode) -> Profile {
    Profile {
        team: TeamSettings {
            enabled: true,
            assignment_mode: assignment,
        },
        working_hours: None,
        working_days: Vec::new(),
        ..solo_profile(id, BookingMode::Calendar, "09:00", "17:00")
    }
}

/// Staff member working Monday to Friday between `from` and `to`
pub fn staff(id: &str, profile_id: &str, services: &[&str], from: &str, to: &str) -> StaffMember {
    let mut member = StaffMember::new(id, profile_id);
    member.name = id.to_string();
    member.service_ids = services.iter().map(|s| s.to_string()).collect();
    member.working_hours =
        WeeklyHours::uniform(&[1, 2, 3, 4, 5], TimeRange::new(t(from), t(to))).unwrap();
    member
}

/// A reservation row for pure scheduling tests
pub fn reservation(staff_id: Option<&str>, from: &str, to: &str) -> Reservation {
    NewReservation {
        profile_id: "salon".to_string(),
        service_id: Some("cut".to_string()),
        staff_id: staff_id.map(str::to_string),
        client_id: "client".to_string(),
        date: monday(),
        from_time: t(from),
        to_time: t(to),
        date_only: false,
        note: None,
    }
    .into_reservation(friday_before())
}

/// Calendar booking request for [`monday`]
pub fn booking(profile_id: &str, from: &str) -> CreateReservation {
    CreateReservation {
        profile_id: profile_id.to_string(),
        service_id: Some("cut".to_string()),
        date: Some(monday()),
        from_time: Some(t(from)),
        ..Default::default()
    }
}

/// Booking service over a seeded store
pub struct Harness {
    pub store: Arc<SqliteBookingRepository>,
    pub clock: Arc<FixedClock>,
    pub service: Arc<BookingService>,
}

fn seed(store: &SqliteBookingRepository, profile: &Profile, roster: &[StaffMember]) {
    store.save_profile(profile).unwrap();
    for member in roster {
        store.save_staff(member).unwrap();
    }
}

/// In-memory harness with the clock at [`friday_before`]
pub fn harness(profile: Profile, roster: Vec<StaffMember>) -> Harness {
    let store = Arc::new(SqliteBookingRepository::in_memory().unwrap());
    seed(&store, &profile, &roster);
    build(store, Config::default())
}

/// File-backed harness
pub fn file_harness(path: &Path, profile: Profile, roster: Vec<StaffMember>) -> Harness {
    let store = Arc::new(SqliteBookingRepository::new(path).unwrap());
    seed(&store, &profile, &roster);
    build(store, Config::default())
}

/// Harness over an existing store
pub fn build(store: Arc<SqliteBookingRepository>, config: Config) -> Harness {
    let clock = Arc::new(FixedClock::new(friday_before()));
    let service = Arc::new(
        BookingService::new(store.clone(), &config).with_clock(clock.clone()),
    );
    Harness {
        store,
        clock,
        service,
    }
}
