//! Racing clients on one slot
//!
//! Check-then-insert runs in one immediate transaction, so exactly one of
//! the racing requests wins and every loser gets a conflict.

use std::sync::{Arc, Barrier};
use std::thread;

use termin::booking::{BookingService, CreateDayReservation};
use termin::error::{ConflictReason, Result};
use termin::models::BookingMode;
use termin::storage::{ReservationRepository, SqliteBookingRepository};

use crate::common::{booking, build, file_harness, harness, monday, solo_profile};

fn race<T, F>(services: Vec<Arc<BookingService>>, threads: usize, attempt: F) -> Vec<Result<T>>
where
    T: Send + 'static,
    F: Fn(&BookingService, usize) -> Result<T> + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(threads));
    let attempt = Arc::new(attempt);

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let service = services[i % services.len()].clone();
            let barrier = barrier.clone();
            let attempt = attempt.clone();
            thread::spawn(move || {
                barrier.wait();
                attempt(&service, i)
            })
        })
        .collect();

    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

fn assert_single_winner<T>(results: &[Result<T>], loser_reason: ConflictReason) {
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for result in results.iter().filter(|r| r.is_err()) {
        let err = result.as_ref().err().unwrap();
        assert_eq!(err.conflict_reason(), Some(loser_reason), "{err}");
    }
}

#[test]
fn test_shared_service_single_winner() {
    let h = harness(
        solo_profile("salon", BookingMode::Calendar, "09:00", "17:00"),
        Vec::new(),
    );

    let results = race(vec![h.service.clone()], 8, |service, i| {
        service.create_reservation(&format!("client-{i}"), booking("salon", "10:00"))
    });

    assert_single_winner(&results, ConflictReason::SlotUnavailable);
    assert_eq!(h.store.reservations_on("salon", monday()).unwrap().len(), 1);
}

#[test]
fn test_separate_connections_single_winner() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("termin.db");
    let first = file_harness(
        &path,
        solo_profile("salon", BookingMode::Calendar, "09:00", "17:00"),
        Vec::new(),
    );
    let second = build(
        Arc::new(SqliteBookingRepository::new(&path).unwrap()),
        Default::default(),
    );

    let results = race(
        vec![first.service.clone(), second.service.clone()],
        6,
        |service, i| service.create_reservation(&format!("client-{i}"), booking("salon", "10:00")),
    );

    assert_single_winner(&results, ConflictReason::SlotUnavailable);
    assert_eq!(first.store.reservations_on("salon", monday()).unwrap().len(), 1);
    assert_eq!(second.store.reservations_on("salon", monday()).unwrap().len(), 1);
}

#[test]
fn test_duplicate_day_requests_single_winner() {
    let h = harness(
        solo_profile("dj", BookingMode::RequestBlocking, "09:00", "17:00"),
        Vec::new(),
    );

    let results = race(vec![h.service.clone()], 4, |service, _| {
        service.create_day_reservation(
            "anna",
            CreateDayReservation {
                profile_id: "dj".to_string(),
                date: Some(monday()),
                note: None,
            },
        )
    });

    assert_single_winner(&results, ConflictReason::DuplicateRequest);
}
