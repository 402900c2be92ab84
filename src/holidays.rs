// File: ./src/holidays.rs
//! Holiday data: where the per-year holiday sets come from.
//!
//! The calendar only needs "which dates of year Y are holidays". This module
//! provides the `HolidaySource` seam plus two implementations (JSON files on
//! disk, and an in-memory set), and the tooling that builds a
//! `holidays_<year>.json` file out of the school's yearly schedule sheet.

use crate::config::Config;
use crate::context::{self, AppContext};
use crate::storage::LocalStorage;
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::PathBuf;

/// Supplies the non-weekend, non-instructional dates of a calendar year.
///
/// `Ok(None)` means there is no data for that year, which the calendar treats
/// as an empty set. `Err` means data exists but could not be read.
pub trait HolidaySource: Send + Sync {
    fn holidays_for_year(&self, year: i32) -> Result<Option<HashSet<NaiveDate>>>;
}

/// Both on-disk shapes are accepted: `{"2026-05-05": "Children's Day"}` and
/// `["2026-05-05"]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum HolidayFile {
    Named(BTreeMap<String, serde_json::Value>),
    Plain(Vec<String>),
}

impl HolidayFile {
    fn into_keys(self) -> Vec<String> {
        match self {
            HolidayFile::Named(map) => map.into_keys().collect(),
            HolidayFile::Plain(list) => list,
        }
    }
}

pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Reads `holidays_<year>.json` from the first directory that has one.
#[derive(Debug, Clone)]
pub struct JsonHolidaySource {
    dirs: Vec<PathBuf>,
}

impl JsonHolidaySource {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Configured directories first, then the data dir, then the config dir.
    pub fn from_context(ctx: &dyn AppContext, config: &Config) -> Self {
        let mut dirs = config.holiday_dirs.clone();
        if let Ok(d) = ctx.get_data_dir() {
            dirs.push(d);
        }
        if let Ok(d) = ctx.get_config_dir() {
            dirs.push(d);
        }
        Self::new(dirs)
    }

    fn locate(&self, year: i32) -> Option<PathBuf> {
        let name = context::holiday_file_name(year);
        self.dirs.iter().map(|d| d.join(&name)).find(|p| p.exists())
    }
}

impl HolidaySource for JsonHolidaySource {
    fn holidays_for_year(&self, year: i32) -> Result<Option<HashSet<NaiveDate>>> {
        let Some(path) = self.locate(year) else {
            return Ok(None);
        };

        let content = LocalStorage::with_lock(&path, || {
            fs::read_to_string(&path)
                .with_context(|| format!("Failed to read holiday file '{}'", path.display()))
        })?;
        let file: HolidayFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse holiday file '{}'", path.display()))?;

        let mut set = HashSet::new();
        for key in file.into_keys() {
            match parse_iso_date(&key) {
                Some(date) => {
                    set.insert(date);
                }
                None => log::warn!("Ignoring malformed holiday date '{}' in {:?}", key, path),
            }
        }
        log::debug!("Loaded {} holidays from {:?}", set.len(), path);
        Ok(Some(set))
    }
}

/// In-memory holiday data, grouped by year on construction.
#[derive(Debug, Clone, Default)]
pub struct StaticHolidays {
    by_year: HashMap<i32, HashSet<NaiveDate>>,
}

impl StaticHolidays {
    pub fn new<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Self {
        let mut by_year: HashMap<i32, HashSet<NaiveDate>> = HashMap::new();
        for d in dates {
            by_year.entry(d.year()).or_default().insert(d);
        }
        Self { by_year }
    }

    /// Accepts `YYYY-MM-DD` strings; anything else is dropped.
    pub fn from_iso<'a, I: IntoIterator<Item = &'a str>>(dates: I) -> Self {
        Self::new(dates.into_iter().filter_map(parse_iso_date))
    }
}

impl HolidaySource for StaticHolidays {
    fn holidays_for_year(&self, year: i32) -> Result<Option<HashSet<NaiveDate>>> {
        Ok(self.by_year.get(&year).cloned())
    }
}

// --- Schedule extraction ---

/// Subjects that mark a day off.
const HOLIDAY_INCLUDE: &[&str] = &[
    "대체공휴일",
    "재량휴업",
    "개교기념일",
    "어린이날",
    "석가탄신일",
    "부처님",
    "성탄절",
    "현충일",
    "광복절",
    "추석",
    "개천절",
    "한글날",
    "신정",
    "구정",
    "설날",
    "선거",
    "수능",
    "공휴일",
    "방학",
];

/// Subjects that look like a holiday but describe a school activity.
const HOLIDAY_EXCLUDE: &[&str] = &[
    "자치", "동아리", "방과후", "시업", "입학", "진단", "고사", "수업", "식", "회의",
];

const VACATION: &str = "방학";
const CEREMONY: &str = "식";

/// One line of the yearly school schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub date: NaiveDate,
    pub subject: String,
}

pub fn is_holiday_subject(subject: &str) -> bool {
    if subject.contains(VACATION) && !subject.contains(CEREMONY) {
        return true;
    }
    let include = HOLIDAY_INCLUDE.iter().any(|k| subject.contains(k));
    let exclude = HOLIDAY_EXCLUDE.iter().any(|k| subject.contains(k));
    include && !exclude
}

/// National holidays with a fixed calendar date, for the school year
/// starting in March of `academic_year`.
pub fn fixed_holidays(academic_year: i32) -> Vec<(NaiveDate, &'static str)> {
    let y = academic_year;
    [
        (y, 3, 1, "3.1절"),
        (y, 5, 5, "어린이날"),
        (y, 6, 6, "현충일"),
        (y, 8, 15, "광복절"),
        (y, 10, 3, "개천절"),
        (y, 10, 9, "한글날"),
        (y, 12, 25, "성탄절"),
        (y + 1, 1, 1, "신정"),
    ]
    .into_iter()
    .filter_map(|(yy, m, d, name)| NaiveDate::from_ymd_opt(yy, m, d).map(|date| (date, name)))
    .collect()
}

/// Picks the days off out of the schedule and adds the fixed national
/// holidays that the sheet did not mention. Schedule names win on collisions.
pub fn extract_holidays(
    entries: &[ScheduleEntry],
    academic_year: i32,
) -> BTreeMap<NaiveDate, String> {
    let mut holidays = BTreeMap::new();
    for entry in entries {
        if is_holiday_subject(&entry.subject) {
            holidays.insert(entry.date, entry.subject.clone());
        }
    }
    for (date, name) in fixed_holidays(academic_year) {
        holidays.entry(date).or_insert_with(|| name.to_string());
    }
    holidays
}

/// Splits an extracted map by calendar year, since holiday files are per year
/// while a school year spans two.
pub fn split_by_year(
    holidays: &BTreeMap<NaiveDate, String>,
) -> BTreeMap<i32, BTreeMap<NaiveDate, String>> {
    let mut out: BTreeMap<i32, BTreeMap<NaiveDate, String>> = BTreeMap::new();
    for (date, name) in holidays {
        out.entry(date.year())
            .or_default()
            .insert(*date, name.clone());
    }
    out
}

/// Writes `holidays_<year>.json` (object form) into the data dir.
pub fn save_holidays(
    ctx: &dyn AppContext,
    year: i32,
    holidays: &BTreeMap<NaiveDate, String>,
) -> Result<PathBuf> {
    let path = ctx.get_data_dir()?.join(ctx.get_holiday_file_name(year));
    let named: BTreeMap<String, &String> = holidays
        .iter()
        .map(|(d, name)| (d.format("%Y-%m-%d").to_string(), name))
        .collect();
    LocalStorage::write_json(&path, &named)?;
    log::info!("Saved {} holidays to {:?}", named.len(), path);
    Ok(path)
}

// --- Schedule sheet parsing ---

/// (day-number column, event column) for Monday..Friday.
const WEEKDAY_COLUMNS: [(usize, usize); 5] = [(3, 5), (6, 8), (9, 11), (12, 14), (15, 17)];
const MONTH_COLUMN: usize = 1;

fn first_number(s: &str) -> Option<u32> {
    let digits: String = s
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn parse_month(cell: &str) -> Option<u32> {
    first_number(cell).filter(|m| (1..=12).contains(m))
}

/// Day cells hold either a bare day number or a full date.
fn parse_day_cell(cell: &str, month: u32, academic_year: i32) -> Option<NaiveDate> {
    let s = cell.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(d) = parse_iso_date(s) {
        return Some(d);
    }
    let normalized: String = s
        .split(|c: char| c == '.' || c == '/' || c == '-' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if normalized.matches('-').count() == 2
        && let Ok(d) = NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
    {
        return Some(d);
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        let day: u32 = s.parse().ok()?;
        let year = crate::calendar::AcademicYear::new(academic_year).year_of_month(month);
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    None
}

/// Reads the weekly schedule grid: a forward-filled month column and five
/// (day, event) column pairs. A day number smaller than the previous one in
/// the same row means the week crossed into the next month.
pub fn parse_schedule_grid(rows: &[Vec<String>], academic_year: i32) -> Vec<ScheduleEntry> {
    let mut entries = Vec::new();
    let mut current_month: Option<u32> = None;

    for row in rows {
        if let Some(cell) = row.get(MONTH_COLUMN)
            && let Some(m) = parse_month(cell)
        {
            current_month = Some(m);
        }
        let Some(base_month) = current_month else {
            continue;
        };

        let mut last_day: Option<u32> = None;
        let mut offset = 0;

        for (date_idx, event_idx) in WEEKDAY_COLUMNS {
            let (Some(date_cell), Some(event_cell)) = (row.get(date_idx), row.get(event_idx))
            else {
                continue;
            };
            let Some(day_num) = first_number(date_cell) else {
                continue;
            };
            if let Some(prev) = last_day
                && day_num < prev
            {
                offset += 1;
            }
            last_day = Some(day_num);

            let subject = event_cell.replace('\n', " ").trim().to_string();
            if subject.is_empty() {
                continue;
            }

            let month = (base_month - 1 + offset) % 12 + 1;
            if let Some(date) = parse_day_cell(date_cell, month, academic_year) {
                entries.push(ScheduleEntry { date, subject });
            }
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn subject_filter() {
        assert!(is_holiday_subject("재량휴업일"));
        assert!(is_holiday_subject("여름방학"));
        assert!(!is_holiday_subject("여름방학식"));
        assert!(!is_holiday_subject("동아리 (추석 행사)"));
        assert!(!is_holiday_subject("1학기 중간고사"));
    }

    #[test]
    fn fixed_holidays_span_two_years() {
        let fixed = fixed_holidays(2026);
        assert_eq!(fixed.len(), 8);
        assert!(fixed.iter().any(|(date, _)| *date == d(2027, 1, 1)));
        assert!(fixed.iter().any(|(date, _)| *date == d(2026, 5, 5)));
    }

    #[test]
    fn day_cells() {
        assert_eq!(parse_day_cell("4", 3, 2026), Some(d(2026, 3, 4)));
        assert_eq!(parse_day_cell("4", 1, 2026), Some(d(2027, 1, 4)));
        assert_eq!(parse_day_cell("2026. 3. 4", 3, 2026), Some(d(2026, 3, 4)));
        assert_eq!(parse_day_cell("2026-03-04", 3, 2026), Some(d(2026, 3, 4)));
        assert_eq!(parse_day_cell("31", 2, 2026), None);
        assert_eq!(parse_day_cell("x", 3, 2026), None);
    }

    #[test]
    fn static_source_groups_by_year() {
        let src = StaticHolidays::from_iso(["2026-05-05", "2027-01-01", "garbage"]);
        let y26 = src.holidays_for_year(2026).unwrap().unwrap();
        assert!(y26.contains(&d(2026, 5, 5)));
        assert_eq!(y26.len(), 1);
        assert!(src.holidays_for_year(2025).unwrap().is_none());
    }
}
