// Instructional-day calendar: weekends, holidays and counting.
use attendo::calendar::{DayKind, HolidayCalendar};
use attendo::config::Config;
use attendo::context::{AppContext, TestContext};
use attendo::holidays::{HolidaySource, JsonHolidaySource, StaticHolidays};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn calendar_with(dates: &[&str]) -> HolidayCalendar {
    HolidayCalendar::new(StaticHolidays::from_iso(dates.iter().copied()))
}

#[test]
fn weekends_are_never_instructional() {
    let cal = HolidayCalendar::weekends_only();
    // 2026-03-07 is a Saturday.
    assert!(!cal.is_instructional_day(d(2026, 3, 7)));
    assert!(!cal.is_instructional_day(d(2026, 3, 8)));
    assert!(cal.is_instructional_day(d(2026, 3, 9)));
    assert_eq!(cal.day_kind(d(2026, 3, 7)), DayKind::Weekend);
}

#[test]
fn holidays_are_not_instructional() {
    let cal = calendar_with(&["2026-05-05"]);
    assert_eq!(cal.day_kind(d(2026, 5, 5)), DayKind::Holiday);
    assert!(!cal.is_instructional_day(d(2026, 5, 5)));
    assert!(cal.is_instructional_day(d(2026, 5, 4)));
}

#[test]
fn holiday_on_weekend_reports_weekend() {
    // 2026-06-06 is a Saturday.
    let cal = calendar_with(&["2026-06-06"]);
    assert_eq!(cal.day_kind(d(2026, 6, 6)), DayKind::Weekend);
}

#[test]
fn count_over_a_plain_week() {
    let cal = HolidayCalendar::weekends_only();
    assert_eq!(cal.instructional_day_count(d(2026, 3, 2), d(2026, 3, 6)), 5);
    assert_eq!(cal.instructional_day_count(d(2026, 3, 2), d(2026, 3, 8)), 5);
    assert_eq!(cal.instructional_day_count(d(2026, 3, 2), d(2026, 3, 9)), 6);
}

#[test]
fn count_of_single_day_and_reversed_range() {
    let cal = calendar_with(&["2026-05-05"]);
    assert_eq!(cal.instructional_day_count(d(2026, 5, 4), d(2026, 5, 4)), 1);
    assert_eq!(cal.instructional_day_count(d(2026, 5, 5), d(2026, 5, 5)), 0);
    assert_eq!(cal.instructional_day_count(d(2026, 5, 9), d(2026, 5, 9)), 0);
    assert_eq!(cal.instructional_day_count(d(2026, 5, 8), d(2026, 5, 4)), 0);
}

#[test]
fn count_matches_day_by_day_check() {
    let cal = calendar_with(&["2026-05-05", "2026-05-25", "2026-06-03"]);
    let start = d(2026, 4, 20);
    let end = d(2026, 6, 19);
    let manual = start
        .iter_days()
        .take_while(|x| *x <= end)
        .filter(|x| cal.is_instructional_day(*x))
        .count() as u32;
    assert_eq!(cal.instructional_day_count(start, end), manual);
}

#[test]
fn count_is_additive_over_a_split() {
    let cal = calendar_with(&["2026-05-05"]);
    let (a, m, b) = (d(2026, 4, 27), d(2026, 5, 6), d(2026, 5, 15));
    let whole = cal.instructional_day_count(a, b);
    let left = cal.instructional_day_count(a, m);
    let right = cal.instructional_day_count(m.succ_opt().unwrap(), b);
    assert_eq!(whole, left + right);
}

#[test]
fn count_across_year_boundary_uses_both_years() {
    let cal = calendar_with(&["2026-12-25", "2027-01-01"]);
    // Mon 2026-12-21 .. Fri 2027-01-08: 15 weekdays minus two holidays.
    assert_eq!(cal.instructional_day_count(d(2026, 12, 21), d(2027, 1, 8)), 13);
    assert_eq!(cal.cached_years(), vec![2026, 2027]);
}

struct CountingSource {
    loads: Arc<AtomicUsize>,
}

impl HolidaySource for CountingSource {
    fn holidays_for_year(&self, year: i32) -> anyhow::Result<Option<HashSet<NaiveDate>>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if year == 2030 {
            anyhow::bail!("broken source");
        }
        Ok(Some(HashSet::from([NaiveDate::from_ymd_opt(year, 5, 5).unwrap()])))
    }
}

#[test]
fn holiday_sets_load_once_per_year_until_invalidated() {
    let loads = Arc::new(AtomicUsize::new(0));
    let cal = HolidayCalendar::new(CountingSource {
        loads: loads.clone(),
    });

    cal.instructional_day_count(d(2026, 3, 2), d(2026, 12, 31));
    cal.is_instructional_day(d(2026, 5, 5));
    assert_eq!(loads.load(Ordering::SeqCst), 1);

    cal.invalidate(2026);
    assert!(!cal.is_instructional_day(d(2026, 5, 5)));
    assert_eq!(loads.load(Ordering::SeqCst), 2);

    cal.clear();
    assert!(cal.cached_years().is_empty());
}

#[test]
fn failing_source_degrades_to_weekends_only() {
    let loads = Arc::new(AtomicUsize::new(0));
    let cal = HolidayCalendar::new(CountingSource { loads });
    // 2030-05-06 is a Monday, 2030-05-05 a Sunday.
    assert!(cal.is_instructional_day(d(2030, 5, 6)));
    assert!(!cal.is_instructional_day(d(2030, 5, 5)));
    assert_eq!(cal.cached_years(), vec![2030]);
}

#[test]
fn json_source_reads_both_file_shapes() {
    let ctx = TestContext::new();
    let data = ctx.get_data_dir().unwrap();
    fs::write(
        data.join("holidays_2026.json"),
        r#"{"2026-05-05": "어린이날", "2026-05-25": "대체공휴일", "not-a-date": "x"}"#,
    )
    .unwrap();
    fs::write(data.join("holidays_2027.json"), r#"["2027-01-01"]"#).unwrap();

    let cal = HolidayCalendar::new(JsonHolidaySource::from_context(&ctx, &Config::default()));
    assert!(!cal.is_instructional_day(d(2026, 5, 5)));
    assert!(!cal.is_instructional_day(d(2026, 5, 25)));
    assert!(cal.is_instructional_day(d(2026, 5, 26)));
    assert!(!cal.is_instructional_day(d(2027, 1, 1)));
    // No file for 2028: weekends only.
    assert!(cal.is_instructional_day(d(2028, 5, 5)));
}

#[test]
fn json_source_with_corrupt_file_yields_no_holidays() {
    let ctx = TestContext::new();
    let data = ctx.get_data_dir().unwrap();
    fs::write(data.join("holidays_2026.json"), "{ not json").unwrap();

    let cal = HolidayCalendar::new(JsonHolidaySource::from_context(&ctx, &Config::default()));
    assert!(cal.is_instructional_day(d(2026, 5, 5)));
}

#[test]
fn configured_holiday_dirs_take_precedence() {
    let ctx = TestContext::new();
    let extra = ctx.root.join("shared");
    fs::create_dir_all(&extra).unwrap();
    fs::write(extra.join("holidays_2026.json"), r#"["2026-05-06"]"#).unwrap();
    fs::write(
        ctx.get_data_dir().unwrap().join("holidays_2026.json"),
        r#"["2026-05-05"]"#,
    )
    .unwrap();

    let config = Config {
        holiday_dirs: vec![extra],
        ..Config::default()
    };
    let cal = HolidayCalendar::new(JsonHolidaySource::from_context(&ctx, &config));
    assert!(!cal.is_instructional_day(d(2026, 5, 6)));
    assert!(cal.is_instructional_day(d(2026, 5, 5)));
}
