use busroster_core::db::open_db_in_memory;
use busroster_core::{
    AssignmentSet, AttendanceService, Driver, DriverId, DriverPatch, LedgerService, RepoError,
    RosterService, ServiceDate, SqliteLedgerRepository, SqliteRosterRepository, Student,
    StudentId, TripType,
};
use rusqlite::Connection;

const DAY: &str = "2026-01-10";

struct Fixture {
    conn: Connection,
}

impl Fixture {
    /// Students s1..s4 and two drivers with the given capacities.
    fn new(first_capacity: u32, second_capacity: u32) -> (Self, DriverId, DriverId) {
        let conn = open_db_in_memory().unwrap();
        let (first, second) = {
            let roster = RosterService::new(SqliteRosterRepository::try_new(&conn).unwrap());
            for code in ["s1", "s2", "s3", "s4"] {
                roster
                    .add_student(&Student::new(sid(code), format!("Student {code}")))
                    .unwrap();
            }
            let mut first = Driver::new("drv1");
            first.capacity = first_capacity;
            let mut second = Driver::new("drv2");
            second.capacity = second_capacity;
            (
                roster.add_driver(&first).unwrap().driver_id,
                roster.add_driver(&second).unwrap().driver_id,
            )
        };
        (Self { conn }, first, second)
    }

    fn ledger(&self) -> LedgerService<SqliteLedgerRepository<'_>> {
        LedgerService::new(SqliteLedgerRepository::try_new(&self.conn).unwrap())
    }

    fn roster(&self) -> RosterService<SqliteRosterRepository<'_>> {
        RosterService::new(SqliteRosterRepository::try_new(&self.conn).unwrap())
    }

    fn attendance(&self) -> AttendanceService<SqliteLedgerRepository<'_>> {
        AttendanceService::new(SqliteLedgerRepository::try_new(&self.conn).unwrap())
    }
}

fn sid(code: &str) -> StudentId {
    StudentId::new(code).unwrap()
}

fn set(codes: &[&str]) -> AssignmentSet {
    codes.iter().map(|code| sid(code)).collect()
}

fn date(iso: &str) -> ServiceDate {
    ServiceDate::parse(iso).unwrap()
}

#[test]
fn oversized_set_is_rejected_and_leaves_key_empty() {
    let (fixture, drv1, _) = Fixture::new(2, 14);
    let ledger = fixture.ledger();

    let err = ledger
        .set_assignment(date(DAY), drv1, &set(&["s1", "s2", "s3"]))
        .unwrap_err();
    match err {
        RepoError::CapacityExceeded {
            driver_id,
            requested,
            capacity,
        } => {
            assert_eq!(driver_id, drv1);
            assert_eq!(requested, 3);
            assert_eq!(capacity, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(ledger.get_assignment(date(DAY), drv1).unwrap().is_empty());
}

#[test]
fn set_within_capacity_is_accepted() {
    let (fixture, drv1, _) = Fixture::new(2, 14);
    let ledger = fixture.ledger();

    let outcome = ledger
        .set_assignment(date(DAY), drv1, &set(&["s1", "s2"]))
        .unwrap();
    assert_eq!(outcome.added, 2);
    assert_eq!(
        ledger.get_assignment(date(DAY), drv1).unwrap(),
        set(&["s1", "s2"])
    );
}

#[test]
fn second_set_replaces_instead_of_merging() {
    let (fixture, drv1, _) = Fixture::new(2, 14);
    let ledger = fixture.ledger();

    ledger
        .set_assignment(date(DAY), drv1, &set(&["s1", "s2"]))
        .unwrap();
    let outcome = ledger.set_assignment(date(DAY), drv1, &set(&["s1"])).unwrap();
    assert_eq!(outcome.added, 0);
    assert_eq!(outcome.removed, 1);
    assert_eq!(ledger.get_assignment(date(DAY), drv1).unwrap(), set(&["s1"]));
}

#[test]
fn oversized_replacement_keeps_previous_set() {
    let (fixture, drv1, _) = Fixture::new(2, 14);
    let ledger = fixture.ledger();

    ledger
        .set_assignment(date(DAY), drv1, &set(&["s1", "s2"]))
        .unwrap();
    ledger
        .set_assignment(date(DAY), drv1, &set(&["s2", "s3", "s4"]))
        .unwrap_err();
    assert_eq!(
        ledger.get_assignment(date(DAY), drv1).unwrap(),
        set(&["s1", "s2"])
    );
}

#[test]
fn setting_the_same_set_twice_is_idempotent() {
    let (fixture, drv1, _) = Fixture::new(4, 14);
    let ledger = fixture.ledger();

    ledger
        .set_assignment(date(DAY), drv1, &set(&["s1", "s3"]))
        .unwrap();
    let again = ledger
        .set_assignment(date(DAY), drv1, &set(&["s1", "s3"]))
        .unwrap();
    assert!(again.is_noop());
    assert_eq!(
        ledger.get_assignment(date(DAY), drv1).unwrap(),
        set(&["s1", "s3"])
    );
}

#[test]
fn empty_set_clears_the_key() {
    let (fixture, drv1, _) = Fixture::new(4, 14);
    let ledger = fixture.ledger();

    ledger
        .set_assignment(date(DAY), drv1, &set(&["s1", "s2"]))
        .unwrap();
    let outcome = ledger.set_assignment(date(DAY), drv1, &set(&[])).unwrap();
    assert_eq!(outcome.removed, 2);
    assert!(ledger.get_assignment(date(DAY), drv1).unwrap().is_empty());
}

#[test]
fn unknown_references_are_rejected_without_writes() {
    let (fixture, drv1, _) = Fixture::new(4, 14);
    let ledger = fixture.ledger();

    let err = ledger
        .set_assignment(date(DAY), uuid::Uuid::new_v4(), &set(&["s1"]))
        .unwrap_err();
    assert!(matches!(err, RepoError::UnknownDriver(_)));

    let err = ledger
        .set_assignment(date(DAY), drv1, &set(&["s1", "ghost"]))
        .unwrap_err();
    assert!(matches!(err, RepoError::UnknownStudent(ref id) if id.as_str() == "ghost"));
    assert_eq!(err.code(), "unknown_reference");
    assert!(ledger.get_assignment(date(DAY), drv1).unwrap().is_empty());
}

#[test]
fn student_cannot_ride_two_drivers_on_the_same_trip() {
    let (fixture, drv1, drv2) = Fixture::new(4, 4);
    let ledger = fixture.ledger();

    ledger
        .set_assignment(date(DAY), drv1, &set(&["s1", "s2"]))
        .unwrap();
    let err = ledger
        .set_assignment(date(DAY), drv2, &set(&["s2", "s3"]))
        .unwrap_err();
    match err {
        RepoError::AssignmentConflict {
            student_id,
            trip,
            assigned_driver,
            ..
        } => {
            assert_eq!(student_id, sid("s2"));
            assert_eq!(trip, TripType::Outbound);
            assert_eq!(assigned_driver, drv1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(ledger.get_assignment(date(DAY), drv2).unwrap().is_empty());

    // Moving the student is a release followed by a new set.
    ledger.set_assignment(date(DAY), drv1, &set(&["s1"])).unwrap();
    ledger
        .set_assignment(date(DAY), drv2, &set(&["s2", "s3"]))
        .unwrap();
}

#[test]
fn trips_are_independent_keys() {
    let (fixture, drv1, drv2) = Fixture::new(4, 4);
    let ledger = fixture.ledger();

    ledger
        .set_trip_assignment(date(DAY), drv1, TripType::Outbound, &set(&["s1"]))
        .unwrap();
    ledger
        .set_trip_assignment(date(DAY), drv2, TripType::Return, &set(&["s1", "s2"]))
        .unwrap();

    assert_eq!(
        ledger
            .get_trip_assignment(date(DAY), drv2, Some(TripType::Return))
            .unwrap(),
        set(&["s1", "s2"])
    );
    assert!(ledger.get_assignment(date(DAY), drv2).unwrap().is_empty());

    let merged = ledger
        .get_trip_assignments_for_date(date(DAY), None)
        .unwrap();
    assert_eq!(merged.len(), 2);
    let outbound_only = ledger.get_assignments_for_date(date(DAY)).unwrap();
    assert_eq!(outbound_only.len(), 1);
    assert_eq!(outbound_only.get(&drv1), Some(&set(&["s1"])));

    assert!(ledger.is_student_assigned(date(DAY), &sid("s2")).unwrap());
    assert!(!ledger.is_student_assigned(date(DAY), &sid("s3")).unwrap());
}

#[test]
fn remove_assignment_is_idempotent() {
    let (fixture, drv1, _) = Fixture::new(4, 4);
    let ledger = fixture.ledger();

    ledger
        .set_trip_assignment(date(DAY), drv1, TripType::Outbound, &set(&["s1"]))
        .unwrap();
    ledger
        .set_trip_assignment(date(DAY), drv1, TripType::Return, &set(&["s1", "s2"]))
        .unwrap();

    assert_eq!(ledger.remove_assignment(date(DAY), drv1).unwrap(), 1);
    assert_eq!(ledger.remove_assignment(date(DAY), drv1).unwrap(), 0);
    assert_eq!(
        ledger
            .get_trip_assignment(date(DAY), drv1, None)
            .unwrap(),
        set(&["s1", "s2"])
    );
    assert_eq!(
        ledger.remove_trip_assignment(date(DAY), drv1, None).unwrap(),
        2
    );
    assert!(ledger
        .get_trip_assignment(date(DAY), drv1, None)
        .unwrap()
        .is_empty());
}

#[test]
fn reading_unknown_keys_returns_empty_sets() {
    let (fixture, _, _) = Fixture::new(4, 4);
    let ledger = fixture.ledger();

    assert!(ledger
        .get_assignment(date("1999-12-31"), uuid::Uuid::new_v4())
        .unwrap()
        .is_empty());
    assert!(ledger
        .get_assignments_for_date(date("1999-12-31"))
        .unwrap()
        .is_empty());
}

#[test]
fn capacity_cut_does_not_rewrite_committed_sets() {
    let (fixture, drv1, _) = Fixture::new(3, 4);
    let ledger = fixture.ledger();
    let roster = fixture.roster();

    ledger
        .set_assignment(date(DAY), drv1, &set(&["s1", "s2", "s3"]))
        .unwrap();
    roster
        .update_driver(
            drv1,
            &DriverPatch {
                capacity: Some(1),
                ..DriverPatch::default()
            },
        )
        .unwrap();

    assert_eq!(ledger.get_assignment(date(DAY), drv1).unwrap().len(), 3);
    let err = ledger
        .set_assignment(date("2026-01-11"), drv1, &set(&["s1", "s2"]))
        .unwrap_err();
    assert!(matches!(err, RepoError::CapacityExceeded { capacity: 1, .. }));
}

#[test]
fn attendance_counts_distinct_dates_across_drivers_and_trips() {
    let (fixture, drv1, drv2) = Fixture::new(4, 4);
    let ledger = fixture.ledger();
    let attendance = fixture.attendance();

    ledger.set_assignment(date(DAY), drv1, &set(&["s1"])).unwrap();
    ledger
        .set_assignment(date("2026-01-11"), drv1, &set(&["s1"]))
        .unwrap();
    ledger
        .set_trip_assignment(date(DAY), drv2, TripType::Return, &set(&["s1"]))
        .unwrap();

    assert_eq!(attendance.attendance_days(&sid("s1")).unwrap(), 2);
    assert_eq!(
        ledger.assigned_dates(&sid("s1")).unwrap(),
        vec![date(DAY), date("2026-01-11")]
    );
}

#[test]
fn size_never_exceeds_capacity_after_successful_sets() {
    let (fixture, drv1, _) = Fixture::new(2, 4);
    let ledger = fixture.ledger();

    let attempts: [&[&str]; 4] = [
        &["s1"],
        &["s1", "s2", "s3"],
        &["s3", "s4"],
        &["s1", "s2", "s3", "s4"],
    ];
    for attempt in attempts {
        let result = ledger.set_assignment(date(DAY), drv1, &set(attempt));
        assert_eq!(result.is_ok(), attempt.len() <= 2);
        assert!(ledger.get_assignment(date(DAY), drv1).unwrap().len() <= 2);
    }
    assert_eq!(
        ledger.get_assignment(date(DAY), drv1).unwrap(),
        set(&["s3", "s4"])
    );
}
