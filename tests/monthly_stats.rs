// Per-class monthly tallies, the detail listing and menstrual leave.
use attendo::analysis::menstrual;
use attendo::analysis::monthly::{Reason, class_stats, monthly_detail};
use attendo::calendar::{AcademicYear, HolidayCalendar};
use attendo::config::MenstrualLimits;
use attendo::holidays::StaticHolidays;
use attendo::model::{AttendanceEvent, MarkKind, Roster};
use chrono::NaiveDate;

fn d(m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, m, day).unwrap()
}

fn roster() -> Roster {
    Roster::from([
        (1, "김철수".to_string()),
        (2, "이영희".to_string()),
        (3, "박민수".to_string()),
    ])
}

fn march() -> Vec<AttendanceEvent> {
    let mut unexcused = AttendanceEvent::new(2, "이영희", "결석", d(3, 5));
    unexcused.unexcused = true;
    vec![
        AttendanceEvent::new(1, "김철수", "질병결석", d(3, 2)),
        AttendanceEvent::new(1, "김철수", "질병결석", d(3, 3)),
        AttendanceEvent::new(1, "김철수", "인정결석", d(3, 10)),
        AttendanceEvent::new(1, "김철수", "기타지각", d(3, 4)).with_period("1교시"),
        unexcused,
        AttendanceEvent::new(2, "이영희", "질병조퇴", d(3, 6)).with_period("5-7교시"),
        AttendanceEvent::new(2, "이영희", "질병결과", d(3, 9)).with_annotation("병원"),
        // Not on the roster.
        AttendanceEvent::new(9, "전학생", "질병결석", d(3, 2)),
        // Another month.
        AttendanceEvent::new(3, "박민수", "질병결석", d(4, 1)),
    ]
}

#[test]
fn class_stats_tally_kind_by_reason() {
    let cal = HolidayCalendar::new(StaticHolidays::from_iso(["2026-03-02"]));
    let report = class_stats(&cal, &roster(), &march(), 2026, 3).unwrap();

    // 22 weekdays in March 2026, minus the 03-02 holiday.
    assert_eq!(report.school_days, 21);
    assert_eq!(report.period_label(), "2026.03.01. - 2026.03.31.");
    assert_eq!(report.rows.len(), 3);

    let kim = &report.rows[0];
    assert_eq!(kim.count(MarkKind::Absence, Reason::Sick), 2);
    assert_eq!(kim.count(MarkKind::Absence, Reason::Authorized), 1);
    assert_eq!(kim.count(MarkKind::Late, Reason::Other), 1);
    // Authorized days stay out of the totals.
    assert_eq!(kim.total(MarkKind::Absence), vec![d(3, 2), d(3, 3)]);

    let lee = &report.rows[1];
    assert_eq!(lee.dates(MarkKind::Absence, Reason::Unexcused), &[d(3, 5)]);
    assert_eq!(lee.count(MarkKind::EarlyLeave, Reason::Sick), 1);
    assert_eq!(lee.count(MarkKind::Partial, Reason::Sick), 1);

    assert!(report.rows[2].is_clear());
    assert!(class_stats(&cal, &roster(), &march(), 2026, 13).is_none());
}

#[test]
fn ranged_record_is_tallied_on_school_days_in_the_month() {
    let cal = HolidayCalendar::weekends_only();
    // Thu 03-26 .. Thu 04-02.
    let events =
        vec![AttendanceEvent::new(3, "박민수", "질병결석", d(3, 26)).with_range(d(4, 2))];
    let report = class_stats(&cal, &roster(), &events, 2026, 3).unwrap();
    assert_eq!(
        report.rows[2].dates(MarkKind::Absence, Reason::Sick),
        &[d(3, 26), d(3, 27), d(3, 30), d(3, 31)]
    );
}

#[test]
fn detail_rows_flag_documents_in_date_order() {
    let rows = monthly_detail(&roster(), &march(), 2026, 3);
    let summary: Vec<(NaiveDate, u32, bool)> = rows
        .iter()
        .map(|r| (r.date, r.number, r.needs_documents))
        .collect();
    assert_eq!(
        summary,
        vec![
            (d(3, 2), 1, true),
            (d(3, 3), 1, true),
            (d(3, 4), 1, false),
            (d(3, 5), 2, false),
            (d(3, 6), 2, false),
            (d(3, 9), 2, false),
            (d(3, 10), 1, true),
        ]
    );
    assert_eq!(rows[2].period, "1교시");
    assert_eq!(rows[5].reason, "병원");
}

#[test]
fn menstrual_leave_per_month_with_violations() {
    let cal = HolidayCalendar::weekends_only();
    let events = vec![
        // March: one absence, within the allowance.
        AttendanceEvent::new(2, "이영희", "생리인정결석", d(3, 3)),
        // April: absence plus a partial day in the same month.
        AttendanceEvent::new(2, "이영희", "인정결석", d(4, 7)).with_annotation("생리통"),
        AttendanceEvent::new(2, "이영희", "인정조퇴", d(4, 20)).with_annotation("생리"),
        // May: four partial days.
        AttendanceEvent::new(3, "박민수", "생리인정지각", d(5, 4)),
        AttendanceEvent::new(3, "박민수", "생리인정지각", d(5, 6)),
        AttendanceEvent::new(3, "박민수", "생리인정결과", d(5, 7)),
        AttendanceEvent::new(3, "박민수", "생리인정조퇴", d(5, 8)),
        // Unrelated sick day.
        AttendanceEvent::new(1, "김철수", "질병결석", d(3, 3)),
    ];
    let limits = MenstrualLimits::default();
    let report = menstrual::analyze(&cal, &roster(), &events, AcademicYear::new(2026), &limits);

    assert_eq!(report.rows.len(), 3);
    assert!(!report.rows[0].is_used());

    let lee = &report.rows[1];
    assert_eq!(lee.months.len(), 12);
    assert_eq!(lee.months[0].month, 3);
    assert_eq!(lee.months[0].absences, vec![d(3, 3)]);
    assert!(!lee.months[0].is_violation(&limits));
    assert!(lee.months[1].is_violation(&limits));

    let park = &report.rows[2];
    assert_eq!(park.months[2].partials.len(), 4);
    assert!(park.months[2].is_violation(&limits));

    assert_eq!(report.alerts.len(), 2);
    assert!(report.alerts[0].starts_with("이영희 (month 4)"), "{:?}", report.alerts);
    assert!(report.alerts[1].starts_with("박민수 (month 5)"), "{:?}", report.alerts);
}
