// File: ./src/calendar.rs
//! Instructional-day calendar.
//!
//! A date is an instructional day when it is neither a weekend day nor in the
//! holiday set of its year. Holiday sets are pulled from a `HolidaySource` on
//! first use and kept for the lifetime of the calendar.

use crate::holidays::{HolidaySource, StaticHolidays};
use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

pub const WEEKEND: [Weekday; 2] = [Weekday::Sat, Weekday::Sun];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayKind {
    Instructional,
    Weekend,
    Holiday,
}

impl DayKind {
    pub fn is_instructional(&self) -> bool {
        matches!(self, DayKind::Instructional)
    }
}

type HolidaySet = Arc<HashSet<NaiveDate>>;

pub struct HolidayCalendar {
    source: Box<dyn HolidaySource>,
    cache: Mutex<HashMap<i32, HolidaySet>>,
}

impl std::fmt::Debug for HolidayCalendar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HolidayCalendar")
            .field("cached_years", &self.cached_years())
            .finish()
    }
}

impl HolidayCalendar {
    pub fn new<S: HolidaySource + 'static>(source: S) -> Self {
        Self {
            source: Box::new(source),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// A calendar where only weekends are days off.
    pub fn weekends_only() -> Self {
        Self::new(StaticHolidays::default())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i32, HolidaySet>> {
        // Cached values are immutable once inserted, so a poisoned lock is still usable.
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The holiday set for `year`, loading it on first access.
    /// Missing or unreadable data yields an empty set.
    pub fn holidays(&self, year: i32) -> HolidaySet {
        if let Some(set) = self.lock().get(&year) {
            return set.clone();
        }

        // Load outside the lock; two racing loaders compute the same set.
        let loaded = match self.source.holidays_for_year(year) {
            Ok(Some(set)) => {
                log::info!("Loaded {} holidays for {}", set.len(), year);
                set
            }
            Ok(None) => {
                log::warn!("No holiday data for {}, only weekends are days off", year);
                HashSet::new()
            }
            Err(e) => {
                log::warn!("Failed to load holidays for {}: {:#}", year, e);
                HashSet::new()
            }
        };

        self.lock()
            .entry(year)
            .or_insert_with(|| Arc::new(loaded))
            .clone()
    }

    pub fn day_kind(&self, date: NaiveDate) -> DayKind {
        if WEEKEND.contains(&date.weekday()) {
            DayKind::Weekend
        } else if self.holidays(date.year()).contains(&date) {
            DayKind::Holiday
        } else {
            DayKind::Instructional
        }
    }

    pub fn is_instructional_day(&self, date: NaiveDate) -> bool {
        self.day_kind(date).is_instructional()
    }

    /// Instructional days in `[start, end]`, both inclusive. Zero when `start > end`.
    pub fn instructional_day_count(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        days_between_inclusive(start, end)
            .filter(|d| self.is_instructional_day(*d))
            .count() as u32
    }

    /// True when every date strictly between `after` and `before` is a day
    /// off. Vacuously true when there is nothing between them.
    pub fn is_break_between(&self, after: NaiveDate, before: NaiveDate) -> bool {
        let Some(first) = after.checked_add_days(Days::new(1)) else {
            return true;
        };
        let Some(last) = before.checked_sub_days(Days::new(1)) else {
            return true;
        };
        days_between_inclusive(first, last).all(|d| !self.is_instructional_day(d))
    }

    /// Drops the cached set for `year`; the next lookup reloads it.
    pub fn invalidate(&self, year: i32) {
        self.lock().remove(&year);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn cached_years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.lock().keys().copied().collect();
        years.sort_unstable();
        years
    }
}

/// Iterates every date in `[start, end]`; empty when `start > end`.
pub fn days_between_inclusive(
    start: NaiveDate,
    end: NaiveDate,
) -> impl Iterator<Item = NaiveDate> {
    start
        .iter_days()
        .take_while(move |d| *d <= end)
}

/// A Korean school year: March of `start_year` through February of the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcademicYear {
    pub start_year: i32,
}

impl AcademicYear {
    pub const MONTHS: [u32; 12] = [3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 1, 2];

    pub fn new(start_year: i32) -> Self {
        Self { start_year }
    }

    pub fn of_date(date: NaiveDate) -> Self {
        if date.month() < 3 {
            Self::new(date.year() - 1)
        } else {
            Self::new(date.year())
        }
    }

    pub fn months(&self) -> [u32; 12] {
        Self::MONTHS
    }

    /// Calendar year of `month` within this school year.
    pub fn year_of_month(&self, month: u32) -> i32 {
        if month < 3 {
            self.start_year + 1
        } else {
            self.start_year
        }
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.start_year, 3, 1)
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.start_year + 1, 3, 1)?.pred_opt()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::of_date(date) == *self
    }

    /// First and last date of `month` in this school year.
    pub fn month_range(&self, month: u32) -> Option<(NaiveDate, NaiveDate)> {
        month_bounds(self.year_of_month(month), month)
    }

    /// The school month before `month`, if it is still in this school year.
    pub fn previous_month(&self, month: u32) -> Option<u32> {
        let idx = Self::MONTHS.iter().position(|m| *m == month)?;
        idx.checked_sub(1).map(|i| Self::MONTHS[i])
    }
}

pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next.pred_opt()?))
}
