// Config persistence and the imported-data cache.
use attendo::cache::EventCache;
use attendo::config::Config;
use attendo::context::{AppContext, TestContext};
use attendo::model::{AttendanceEvent, Roster};
use chrono::{Duration, NaiveDate};
use std::fs;

#[test]
fn missing_config_falls_back_to_defaults() {
    let ctx = TestContext::new();
    let err = Config::load(&ctx).unwrap_err();
    assert!(Config::is_missing_config_error(&err));

    let cfg = Config::load_or_default(&ctx).unwrap();
    assert_eq!(cfg.long_absence.first_notice, 30);
    assert_eq!(cfg.long_absence.consecutive_limit, 7);
    assert_eq!(cfg.field_trip.domestic_consecutive, 5);
    assert_eq!(cfg.document_deadline_days, 5);
}

#[test]
fn partial_config_keeps_defaults_for_missing_keys() {
    let ctx = TestContext::new();
    fs::write(
        ctx.get_config_file_path().unwrap(),
        "academic_year = 2026\n\n[long_absence]\nfirst_notice = 20\n",
    )
    .unwrap();
    let cfg = Config::load(&ctx).unwrap();
    assert_eq!(cfg.academic_year, 2026);
    assert_eq!(cfg.long_absence.first_notice, 20);
    assert_eq!(cfg.long_absence.second_notice, 40);
    assert_eq!(cfg.field_trip.international_total, 10);
}

#[test]
fn broken_config_is_an_error() {
    let ctx = TestContext::new();
    fs::write(ctx.get_config_file_path().unwrap(), "academic_year = [").unwrap();
    let err = Config::load_or_default(&ctx).unwrap_err();
    assert!(!Config::is_missing_config_error(&err));
}

#[test]
fn config_round_trips_through_disk() {
    let ctx = TestContext::new();
    let mut cfg = Config::default();
    cfg.academic_year = 2027;
    cfg.school_name = "한빛고등학교".to_string();
    cfg.notifications = true;
    cfg.save(&ctx).unwrap();

    let loaded = Config::load(&ctx).unwrap();
    assert_eq!(loaded.academic_year, 2027);
    assert_eq!(loaded.school_name, "한빛고등학교");
    assert!(loaded.notifications);
}

#[test]
fn cache_ages_are_optional() {
    let cfg = Config {
        event_cache_minutes: 0,
        ..Config::default()
    };
    assert_eq!(cfg.event_cache_max_age(), None);
    assert_eq!(Config::default().roster_cache_max_age(), Some(Duration::days(7)));
}

#[test]
fn month_events_are_cached_per_month() {
    let ctx = TestContext::new();
    let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
    let events = vec![
        AttendanceEvent::new(1, "김철수", "질병결석", date).with_period("1-3교시"),
    ];
    EventCache::save_month(&ctx, 2026, 3, &events).unwrap();

    let cached = EventCache::load_month(&ctx, 2026, 3).unwrap().unwrap();
    assert_eq!(cached.data, events);
    assert!(cached.is_fresh(Some(Duration::minutes(30))));
    assert!(cached.is_fresh(None));
    assert!(EventCache::load_month(&ctx, 2026, 4).unwrap().is_none());
    assert_eq!(
        EventCache::load_month_fresh(&ctx, 2026, 3, Some(Duration::zero())).unwrap(),
        None
    );
}

#[test]
fn stale_cache_versions_read_as_missing() {
    let ctx = TestContext::new();
    let path = ctx.get_cache_dir().unwrap().join("roster.json");
    fs::write(
        &path,
        r#"{"version": 1, "saved_at": "2026-03-01T00:00:00Z", "data": {"1": "김철수"}}"#,
    )
    .unwrap();
    assert!(EventCache::load_roster(&ctx).unwrap().is_none());

    let roster = Roster::from([(1, "김철수".to_string())]);
    EventCache::save_roster(&ctx, &roster).unwrap();
    assert_eq!(EventCache::load_roster(&ctx).unwrap().unwrap().data, roster);
}

#[test]
fn corrupt_cache_reads_as_missing() {
    let ctx = TestContext::new();
    let path = ctx.get_cache_dir().unwrap().join("events_2026_03.json");
    fs::write(&path, "not json").unwrap();
    assert!(EventCache::load_month(&ctx, 2026, 3).unwrap().is_none());
}
