//! Whole-day booking tests for `request-blocking` profiles

use chrono::NaiveDate;
use termin::booking::CreateDayReservation;
use termin::error::{ConflictReason, ErrorCategory, TerminErrorTrait};
use termin::models::{BookingMode, ReservationStatus};
use termin::scheduler::{Actor, TimeOfDay};

use crate::common::{harness, monday, solo_profile};

fn request(date: NaiveDate) -> CreateDayReservation {
    CreateDayReservation {
        profile_id: "dj".to_string(),
        date: Some(date),
        note: Some("wedding".to_string()),
    }
}

fn tuesday() -> NaiveDate {
    monday().succ_opt().unwrap()
}

#[test]
fn test_whole_day_request_uses_sentinel_interval() {
    let h = harness(
        solo_profile("dj", BookingMode::RequestBlocking, "09:00", "17:00"),
        Vec::new(),
    );
    let r = h.service.create_day_reservation("client", request(monday())).unwrap();

    assert!(r.date_only);
    assert_eq!(r.from_time, TimeOfDay::MIDNIGHT);
    assert_eq!(r.to_time, TimeOfDay::END_OF_DAY);
    assert_eq!(r.status, ReservationStatus::Pending);
    assert_eq!(r.note.as_deref(), Some("wedding"));
}

#[test]
fn test_unavailable_days_sorted_and_deduplicated() {
    let mut profile = solo_profile("dj", BookingMode::RequestBlocking, "09:00", "17:00");
    profile.blocked_days.insert(tuesday());
    profile.blocked_days.insert(monday());
    let h = harness(profile, Vec::new());

    assert_eq!(
        h.service.unavailable_days("dj").unwrap(),
        vec![monday(), tuesday()]
    );

    let wednesday = tuesday().succ_opt().unwrap();
    let r = h
        .service
        .create_day_reservation("client", request(wednesday))
        .unwrap();
    // Pending requests do not take the day
    assert_eq!(h.service.unavailable_days("dj").unwrap().len(), 2);

    h.service
        .update_status(&Actor::user("dj-owner"), &r.id, ReservationStatus::Accepted)
        .unwrap();
    assert_eq!(
        h.service.unavailable_days("dj").unwrap(),
        vec![monday(), tuesday(), wednesday]
    );
}

#[test]
fn test_unavailable_days_always_conflict() {
    let mut profile = solo_profile("dj", BookingMode::RequestBlocking, "09:00", "17:00");
    profile.blocked_days.insert(monday());
    let h = harness(profile, Vec::new());

    let accepted = h
        .service
        .create_day_reservation("first", request(tuesday()))
        .unwrap();
    h.service
        .update_status(&Actor::user("dj-owner"), &accepted.id, ReservationStatus::Accepted)
        .unwrap();

    for day in h.service.unavailable_days("dj").unwrap() {
        let err = h
            .service
            .create_day_reservation("someone", request(day))
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Conflict);
    }

    let err = h
        .service
        .create_day_reservation("someone", request(monday()))
        .unwrap_err();
    assert_eq!(err.conflict_reason(), Some(ConflictReason::BlockedDay));
    let err = h
        .service
        .create_day_reservation("someone", request(tuesday()))
        .unwrap_err();
    assert_eq!(err.conflict_reason(), Some(ConflictReason::DayTaken));
}

#[test]
fn test_pending_duplicates_only_block_the_same_client() {
    let h = harness(
        solo_profile("dj", BookingMode::RequestBlocking, "09:00", "17:00"),
        Vec::new(),
    );
    h.service.create_day_reservation("anna", request(monday())).unwrap();

    let err = h
        .service
        .create_day_reservation("anna", request(monday()))
        .unwrap_err();
    assert_eq!(err.conflict_reason(), Some(ConflictReason::DuplicateRequest));

    // Another client may still ask for the same day
    assert!(h.service.create_day_reservation("bart", request(monday())).is_ok());
}

#[test]
fn test_rejected_request_can_be_repeated() {
    let h = harness(
        solo_profile("dj", BookingMode::RequestBlocking, "09:00", "17:00"),
        Vec::new(),
    );
    let first = h.service.create_day_reservation("anna", request(monday())).unwrap();
    h.service
        .update_status(&Actor::user("dj-owner"), &first.id, ReservationStatus::Rejected)
        .unwrap();

    assert!(h.service.create_day_reservation("anna", request(monday())).is_ok());
}

#[test]
fn test_missing_date_is_validation_error() {
    let h = harness(
        solo_profile("dj", BookingMode::RequestBlocking, "09:00", "17:00"),
        Vec::new(),
    );
    let err = h
        .service
        .create_day_reservation(
            "anna",
            CreateDayReservation {
                profile_id: "dj".to_string(),
                date: None,
                note: None,
            },
        )
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);
}

#[test]
fn test_blocking_profile_has_no_calendar() {
    let h = harness(
        solo_profile("dj", BookingMode::RequestBlocking, "09:00", "17:00"),
        Vec::new(),
    );
    assert!(h
        .service
        .availability("dj", "cut", monday(), None)
        .unwrap()
        .is_empty());
}
