//! Calendar booking flow tests
//!
//! Availability, booking and status changes through `BookingService` on an
//! in-memory SQLite store.

use termin::error::ConflictReason;
use termin::models::{AssignmentMode, BookingMode, ReservationStatus, StaffOverride};
use termin::scheduler::{Actor, ServiceDuration, Slot, SlotStatus};

use crate::common::{at, booking, harness, monday, solo_profile, staff, t, team_profile};

fn status_at(slots: &[Slot], start: &str, staff_id: Option<&str>) -> Option<SlotStatus> {
    slots
        .iter()
        .find(|s| s.start == t(start) && s.staff_id.as_deref() == staff_id)
        .map(|s| s.status)
}

// ============================================================================
// Solo Calendar
// ============================================================================

#[test]
fn test_last_start_respects_duration_and_buffer() {
    let h = harness(
        solo_profile("salon", BookingMode::Calendar, "09:00", "17:00"),
        Vec::new(),
    );
    let slots = h.service.availability("salon", "cut", monday(), None).unwrap();

    assert_eq!(slots.first().unwrap().start, t("09:00"));
    assert_eq!(slots.last().unwrap().start, t("16:00"));
    assert!(status_at(&slots, "16:15", None).is_none());
    assert!(slots.iter().all(|s| s.minutes() == 45));
    assert!(slots.iter().all(|s| s.status == SlotStatus::Free));
}

#[test]
fn test_today_past_starts_are_disabled() {
    let h = harness(
        solo_profile("salon", BookingMode::Calendar, "09:00", "17:00"),
        Vec::new(),
    );
    h.clock.set(at(monday(), "14:07:00"));

    let slots = h.service.availability("salon", "cut", monday(), None).unwrap();
    for slot in &slots {
        if slot.start < t("14:15") {
            assert_eq!(slot.status, SlotStatus::Disabled, "{}", slot.start);
        } else {
            assert_eq!(slot.status, SlotStatus::Free, "{}", slot.start);
        }
    }

    let err = h
        .service
        .create_reservation("client", booking("salon", "14:00"))
        .unwrap_err();
    assert_eq!(err.conflict_reason(), Some(ConflictReason::SlotUnavailable));
    assert!(h
        .service
        .create_reservation("client", booking("salon", "14:15"))
        .is_ok());
}

#[test]
fn test_booking_lifecycle_updates_availability() {
    let h = harness(
        solo_profile("salon", BookingMode::Calendar, "09:00", "17:00"),
        Vec::new(),
    );
    let outcome = h
        .service
        .create_reservation("client", booking("salon", "10:00"))
        .unwrap();
    let id = outcome.reservation().unwrap().id.clone();

    let slots = h.service.availability("salon", "cut", monday(), None).unwrap();
    assert_eq!(status_at(&slots, "10:00", None), Some(SlotStatus::Pending));
    // Buffer keeps 09:15 (ends 10:00) from touching the booking
    assert_eq!(status_at(&slots, "09:15", None), Some(SlotStatus::Disabled));
    assert_eq!(status_at(&slots, "11:00", None), Some(SlotStatus::Free));

    h.service
        .update_status(&Actor::user("salon-owner"), &id, ReservationStatus::Accepted)
        .unwrap();
    let slots = h.service.availability("salon", "cut", monday(), None).unwrap();
    assert_eq!(status_at(&slots, "10:00", None), Some(SlotStatus::Reserved));
}

#[test]
fn test_cancel_frees_the_slot() {
    let h = harness(
        solo_profile("salon", BookingMode::Calendar, "09:00", "17:00"),
        Vec::new(),
    );
    let outcome = h
        .service
        .create_reservation("client", booking("salon", "10:00"))
        .unwrap();
    let id = outcome.reservation().unwrap().id.clone();

    let cancelled = h
        .service
        .update_status(&Actor::user("client"), &id, ReservationStatus::Cancelled)
        .unwrap();
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);

    let slots = h.service.availability("salon", "cut", monday(), None).unwrap();
    assert_eq!(status_at(&slots, "10:00", None), Some(SlotStatus::Free));
    assert!(h
        .service
        .create_reservation("other", booking("salon", "10:00"))
        .is_ok());
}

#[test]
fn test_expired_booking_frees_the_slot() {
    let h = harness(
        solo_profile("salon", BookingMode::Calendar, "09:00", "17:00"),
        Vec::new(),
    );
    h.service
        .create_reservation("client", booking("salon", "10:00"))
        .unwrap();

    h.clock.advance(chrono::Duration::hours(49));
    let slots = h.service.availability("salon", "cut", monday(), None).unwrap();
    assert_eq!(status_at(&slots, "10:00", None), Some(SlotStatus::Free));
}

#[test]
fn test_blocked_day_in_calendar_mode() {
    let mut profile = solo_profile("salon", BookingMode::Calendar, "09:00", "17:00");
    profile.blocked_days.insert(monday());
    let h = harness(profile, Vec::new());

    assert!(h
        .service
        .availability("salon", "cut", monday(), None)
        .unwrap()
        .is_empty());
    let err = h
        .service
        .create_reservation("client", booking("salon", "10:00"))
        .unwrap_err();
    assert_eq!(err.conflict_reason(), Some(ConflictReason::BlockedDay));
}

#[test]
fn test_to_time_must_match_duration() {
    let h = harness(
        solo_profile("salon", BookingMode::Calendar, "09:00", "17:00"),
        Vec::new(),
    );
    let mut request = booking("salon", "10:00");
    request.to_time = Some(t("11:00"));
    let err = h.service.create_reservation("client", request).unwrap_err();
    assert!(err.conflict_reason().is_none());

    let mut request = booking("salon", "10:00");
    request.to_time = Some(t("10:45"));
    assert!(h.service.create_reservation("client", request).is_ok());
}

// ============================================================================
// Teams
// ============================================================================

#[test]
fn test_user_pick_capacity_is_per_staff() {
    let h = harness(
        team_profile("salon", AssignmentMode::UserPick),
        vec![
            staff("anna", "salon", &["cut"], "09:00", "12:00"),
            staff("bart", "salon", &["cut"], "09:00", "12:00"),
        ],
    );

    let mut request = booking("salon", "10:00");
    request.staff_id = Some("anna".to_string());
    h.service.create_reservation("a", request.clone()).unwrap();

    let slots = h.service.availability("salon", "cut", monday(), None).unwrap();
    assert_eq!(status_at(&slots, "10:00", Some("anna")), Some(SlotStatus::Pending));
    assert_eq!(status_at(&slots, "10:00", Some("bart")), Some(SlotStatus::Free));

    let only_bart = h
        .service
        .availability("salon", "cut", monday(), Some("bart"))
        .unwrap();
    assert!(only_bart.iter().all(|s| s.staff_id.as_deref() == Some("bart")));

    let err = h.service.create_reservation("b", request).unwrap_err();
    assert_eq!(err.conflict_reason(), Some(ConflictReason::SlotUnavailable));
}

#[test]
fn test_user_pick_capacity_two_exhausted_by_pending() {
    let mut anna = staff("anna", "salon", &["cut"], "09:00", "12:00");
    anna.capacity = 2;
    let h = harness(team_profile("salon", AssignmentMode::UserPick), vec![anna]);

    let mut request = booking("salon", "10:00");
    request.staff_id = Some("anna".to_string());
    h.service.create_reservation("a", request.clone()).unwrap();

    let slots = h.service.availability("salon", "cut", monday(), None).unwrap();
    assert_eq!(status_at(&slots, "10:00", Some("anna")), Some(SlotStatus::Free));

    h.service.create_reservation("b", request.clone()).unwrap();
    let slots = h.service.availability("salon", "cut", monday(), None).unwrap();
    assert_eq!(status_at(&slots, "10:00", Some("anna")), Some(SlotStatus::Pending));

    let err = h.service.create_reservation("c", request).unwrap_err();
    assert_eq!(err.conflict_reason(), Some(ConflictReason::SlotUnavailable));
}

#[test]
fn test_auto_assign_spreads_bookings() {
    let h = harness(
        team_profile("salon", AssignmentMode::AutoAssign),
        vec![
            staff("anna", "salon", &["cut"], "09:00", "12:00"),
            staff("bart", "salon", &["cut"], "09:00", "12:00"),
        ],
    );

    let first = h
        .service
        .create_reservation("a", booking("salon", "10:00"))
        .unwrap();
    let second = h
        .service
        .create_reservation("b", booking("salon", "10:00"))
        .unwrap();

    let assigned: Vec<_> = [first, second]
        .iter()
        .map(|o| o.reservation().unwrap().staff_id.clone().unwrap())
        .collect();
    assert_eq!(assigned.len(), 2);
    assert_ne!(assigned[0], assigned[1]);

    let slots = h.service.availability("salon", "cut", monday(), None).unwrap();
    assert_eq!(status_at(&slots, "10:00", Some("anna")), Some(SlotStatus::Pending));
    assert_eq!(status_at(&slots, "10:00", Some("bart")), Some(SlotStatus::Pending));

    let err = h
        .service
        .create_reservation("c", booking("salon", "10:00"))
        .unwrap_err();
    assert_eq!(err.conflict_reason(), Some(ConflictReason::SlotUnavailable));
}

#[test]
fn test_staff_override_changes_slot_length() {
    let mut bart = staff("bart", "salon", &["cut"], "09:00", "12:00");
    bart.overrides.push(StaffOverride {
        service_id: "cut".to_string(),
        duration: Some(ServiceDuration::hours(1)),
        price: None,
    });
    let h = harness(
        team_profile("salon", AssignmentMode::UserPick),
        vec![staff("anna", "salon", &["cut"], "09:00", "12:00"), bart],
    );

    let slots = h.service.availability("salon", "cut", monday(), None).unwrap();
    for slot in &slots {
        let expected = if slot.staff_id.as_deref() == Some("bart") { 60 } else { 45 };
        assert_eq!(slot.minutes(), expected);
    }

    let mut request = booking("salon", "10:00");
    request.staff_id = Some("bart".to_string());
    let outcome = h.service.create_reservation("a", request).unwrap();
    assert_eq!(outcome.reservation().unwrap().to_time, t("11:00"));
}

#[test]
fn test_unknown_staff_is_not_found() {
    let h = harness(
        team_profile("salon", AssignmentMode::UserPick),
        vec![staff("anna", "salon", &["cut"], "09:00", "12:00")],
    );
    let err = h
        .service
        .availability("salon", "cut", monday(), Some("zoe"))
        .unwrap_err();
    assert_eq!(err.to_string(), "staff member not found: zoe");
}
