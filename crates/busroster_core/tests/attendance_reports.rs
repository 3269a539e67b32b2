use busroster_core::db::open_db_in_memory;
use busroster_core::{
    student_report_csv, AssignmentSet, AttendanceService, DateRange, Driver, DriverId, GeoPoint,
    LedgerService, PaymentFilter, ReportFilter, ReportService, RosterService, ServiceDate,
    SqliteLedgerRepository, SqliteRosterRepository, Student, StudentId, StudentStatus, TripType,
};
use rusqlite::Connection;

fn sid(code: &str) -> StudentId {
    StudentId::new(code).unwrap()
}

fn date(iso: &str) -> ServiceDate {
    ServiceDate::parse(iso).unwrap()
}

fn reports(
    conn: &Connection,
) -> ReportService<SqliteRosterRepository<'_>, SqliteLedgerRepository<'_>> {
    ReportService::new(
        SqliteRosterRepository::try_new(conn).unwrap(),
        SqliteLedgerRepository::try_new(conn).unwrap(),
    )
}

/// Three students with mixed fees, two drivers, and a few days of rides.
fn seeded() -> (Connection, DriverId, DriverId) {
    let conn = open_db_in_memory().unwrap();
    let (bus1, bus2) = {
        let roster = RosterService::new(SqliteRosterRepository::try_new(&conn).unwrap());
        let ledger = LedgerService::new(SqliteLedgerRepository::try_new(&conn).unwrap());

        let mut noura = Student::new(sid("101"), "Noura");
        noura.fees_total = 5000;
        noura.fees_paid = 5000;
        noura.area = Some("Al Rawdah".to_string());
        noura.location = Some(GeoPoint::new(24.77, 46.76).unwrap());
        let mut sara = Student::new(sid("102"), "Sara, Jr.");
        sara.fees_total = 5000;
        sara.fees_paid = 1250;
        let mut layan = Student::new(sid("103"), "Layan");
        layan.status = StudentStatus::Suspended;
        for student in [&noura, &sara, &layan] {
            roster.add_student(student).unwrap();
        }

        let mut bus1 = Driver::new("Ahmed Mohammed");
        bus1.vehicle = Some("Bus 1".to_string());
        bus1.capacity = 3;
        let bus2 = Driver::new("Khalid Ali");
        let bus1 = roster.add_driver(&bus1).unwrap().driver_id;
        let bus2 = roster.add_driver(&bus2).unwrap().driver_id;

        ledger
            .set_assignment(
                date("2026-01-10"),
                bus1,
                &AssignmentSet::from([sid("101"), sid("102")]),
            )
            .unwrap();
        ledger
            .set_assignment(
                date("2026-01-11"),
                bus1,
                &AssignmentSet::from([sid("101")]),
            )
            .unwrap();
        ledger
            .set_trip_assignment(
                date("2026-01-10"),
                bus2,
                TripType::Return,
                &AssignmentSet::from([sid("101")]),
            )
            .unwrap();
        (bus1, bus2)
    };

    (conn, bus1, bus2)
}

#[test]
fn attendance_matches_assigned_dates() {
    let (conn, _, _) = seeded();
    let attendance = AttendanceService::new(SqliteLedgerRepository::try_new(&conn).unwrap());
    let ledger = LedgerService::new(SqliteLedgerRepository::try_new(&conn).unwrap());

    for code in ["101", "102", "103"] {
        let days = attendance.attendance_days(&sid(code)).unwrap();
        let assigned = ["2026-01-09", "2026-01-10", "2026-01-11", "2026-01-12"]
            .into_iter()
            .filter(|day| ledger.is_student_assigned(date(day), &sid(code)).unwrap())
            .count();
        assert_eq!(days as usize, assigned, "student {code}");
    }
    assert_eq!(attendance.attendance_days(&sid("101")).unwrap(), 2);
    assert_eq!(attendance.attendance_days(&sid("103")).unwrap(), 0);
    assert_eq!(attendance.attendance_days(&sid("never")).unwrap(), 0);
}

#[test]
fn attendance_range_is_inclusive() {
    let (conn, _, _) = seeded();
    let attendance = AttendanceService::new(SqliteLedgerRepository::try_new(&conn).unwrap());

    let range = DateRange::new(date("2026-01-11"), date("2026-01-31")).unwrap();
    assert_eq!(
        attendance
            .attendance_days_between(&sid("101"), range)
            .unwrap(),
        1
    );

    let all = attendance.attendance_days_all().unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[&sid("101")], 2);
    assert_eq!(all[&sid("102")], 1);
    assert_eq!(all[&sid("103")], 0);
}

#[test]
fn student_report_projects_fees_and_attendance() {
    let (conn, _, _) = seeded();
    let rows = reports(&conn)
        .student_report(&ReportFilter::default())
        .unwrap();

    let ids = rows.iter().map(|row| row.student_id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["103", "101", "102"]);

    let noura = &rows[1];
    assert_eq!(noura.balance, 0);
    assert_eq!(noura.payment_ratio, 1.0);
    assert_eq!(noura.attendance_days, 2);

    let sara = &rows[2];
    assert_eq!(sara.balance, 3750);
    assert_eq!(sara.payment_ratio, 0.25);

    let layan = &rows[0];
    assert_eq!(layan.payment_ratio, 0.0);
    assert_eq!(layan.attendance_days, 0);
}

#[test]
fn student_report_filters_combine() {
    let (conn, _, _) = seeded();
    let reports = reports(&conn);

    let unpaid = reports
        .student_report(&ReportFilter {
            payment: PaymentFilter::Unpaid,
            ..ReportFilter::default()
        })
        .unwrap();
    assert_eq!(unpaid.len(), 1);
    assert_eq!(unpaid[0].student_id, "102");

    // Nothing owed counts as paid.
    let paid_active = reports
        .student_report(&ReportFilter {
            payment: PaymentFilter::Paid,
            status: Some(StudentStatus::Active),
            ..ReportFilter::default()
        })
        .unwrap();
    assert_eq!(paid_active.len(), 1);
    assert_eq!(paid_active[0].student_id, "101");

    let by_text = reports
        .student_report(&ReportFilter {
            text: Some("lay".to_string()),
            ..ReportFilter::default()
        })
        .unwrap();
    assert_eq!(by_text.len(), 1);
    assert_eq!(by_text[0].name, "Layan");
}

#[test]
fn daily_sheet_lists_every_driver_with_remaining_seats() {
    let (conn, bus1, bus2) = seeded();
    let reports = reports(&conn);

    let outbound = reports
        .daily_sheet(date("2026-01-10"), Some(TripType::Outbound))
        .unwrap();
    assert_eq!(outbound.len(), 2);
    let first = outbound.iter().find(|row| row.driver_id == bus1).unwrap();
    assert_eq!(first.assigned, 2);
    assert_eq!(first.seats_left, 1);
    assert_eq!(first.vehicle.as_deref(), Some("Bus 1"));
    assert_eq!(first.student_names, vec!["Noura", "Sara, Jr."]);
    let second = outbound.iter().find(|row| row.driver_id == bus2).unwrap();
    assert_eq!(second.assigned, 0);
    assert_eq!(second.seats_left, 14);

    let merged = reports.daily_sheet(date("2026-01-10"), None).unwrap();
    let second = merged.iter().find(|row| row.driver_id == bus2).unwrap();
    assert_eq!(second.student_ids, vec!["101"]);
}

#[test]
fn daily_sheet_keeps_ids_and_names_paired_when_orders_differ() {
    let conn = open_db_in_memory().unwrap();
    let bus = {
        let roster = RosterService::new(SqliteRosterRepository::try_new(&conn).unwrap());
        roster.add_student(&Student::new(sid("1"), "Zed")).unwrap();
        roster.add_student(&Student::new(sid("2"), "Amy")).unwrap();
        roster.add_driver(&Driver::new("Ahmed")).unwrap().driver_id
    };
    LedgerService::new(SqliteLedgerRepository::try_new(&conn).unwrap())
        .set_assignment(date("2026-01-10"), bus, &AssignmentSet::from([sid("1"), sid("2")]))
        .unwrap();

    let sheet = reports(&conn).daily_sheet(date("2026-01-10"), None).unwrap();
    let row = &sheet[0];
    assert_eq!(row.student_names, vec!["Amy", "Zed"]);
    assert_eq!(row.student_ids, vec!["2", "1"]);
}

#[test]
fn dashboard_counts_distinct_riders() {
    let (conn, bus1, bus2) = seeded();
    let summary = reports(&conn)
        .dashboard_summary(date("2026-01-10"))
        .unwrap();

    assert_eq!(summary.students, 3);
    assert_eq!(summary.paid_students, 2);
    assert_eq!(summary.drivers, 2);
    assert_eq!(summary.assigned_students, 2);
    let load = |id| {
        summary
            .per_driver
            .iter()
            .find(|entry| entry.driver_id == id)
            .map(|entry| entry.assigned)
    };
    assert_eq!(load(bus1), Some(2));
    assert_eq!(load(bus2), Some(1));

    let quiet = reports(&conn)
        .dashboard_summary(date("2026-02-01"))
        .unwrap();
    assert_eq!(quiet.assigned_students, 0);
}

#[test]
fn map_points_skip_students_without_location() {
    let (conn, _, _) = seeded();
    let points = reports(&conn).map_points().unwrap();

    assert_eq!(points.len(), 1);
    assert_eq!(points[0].student_id, "101");
    assert_eq!(points[0].lat, 24.77);
}

#[test]
fn csv_export_has_header_and_quoted_cells() {
    let (conn, _, _) = seeded();
    let rows = reports(&conn)
        .student_report(&ReportFilter::default())
        .unwrap();
    let csv = student_report_csv(&rows);

    let lines = csv.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("student_id,name,"));
    assert!(lines[3].starts_with("102,\"Sara, Jr.\","));
    assert!(lines[3].ends_with(",0.2500,1"));
}

#[test]
fn report_rows_serialize_to_json() {
    let (conn, _, _) = seeded();
    let rows = reports(&conn)
        .student_report(&ReportFilter::default())
        .unwrap();
    let value = serde_json::to_value(&rows).unwrap();

    assert_eq!(value[1]["student_id"], "101");
    assert_eq!(value[1]["status"], "active");
    assert_eq!(value[0]["status"], "suspended");
}
