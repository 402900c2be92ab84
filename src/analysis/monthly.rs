// File: ./src/analysis/monthly.rs
//! Per-class monthly statistics and the month's detail listing.

use crate::analysis::marked_days;
use crate::calendar::{HolidayCalendar, days_between_inclusive, month_bounds};
use crate::model::category;
use crate::model::{AttendanceEvent, MarkKind, Roster};
use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;
use std::fmt;
use strum::EnumIter;

/// Mark kinds tallied as columns, in report order.
pub const COLUMNS: [MarkKind; 4] = [
    MarkKind::Absence,
    MarkKind::Late,
    MarkKind::EarlyLeave,
    MarkKind::Partial,
];

/// Why the student was out: the sub-column of every kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Reason {
    Sick,
    Unexcused,
    Other,
    Authorized,
}

impl Reason {
    pub fn of(event: &AttendanceEvent) -> Self {
        if event.unexcused || category::is_unexcused(&event.category) {
            Reason::Unexcused
        } else if category::is_authorized(&event.category) {
            Reason::Authorized
        } else if category::is_other(&event.category) {
            Reason::Other
        } else {
            Reason::Sick
        }
    }

    /// Authorized marks are listed but left out of the totals.
    pub fn counts_in_total(&self) -> bool {
        *self != Reason::Authorized
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Sick => write!(f, "sick"),
            Reason::Unexcused => write!(f, "unexcused"),
            Reason::Other => write!(f, "other"),
            Reason::Authorized => write!(f, "authorized"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClassRow {
    pub number: u32,
    pub name: String,
    marks: HashMap<(MarkKind, Reason), Vec<NaiveDate>>,
}

impl ClassRow {
    pub fn dates(&self, kind: MarkKind, reason: Reason) -> &[NaiveDate] {
        self.marks
            .get(&(kind, reason))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn count(&self, kind: MarkKind, reason: Reason) -> usize {
        self.dates(kind, reason).len()
    }

    /// Sorted dates of `kind` over every reason except authorized.
    pub fn total(&self, kind: MarkKind) -> Vec<NaiveDate> {
        let mut all: Vec<NaiveDate> = self
            .marks
            .iter()
            .filter(|((k, r), _)| *k == kind && r.counts_in_total())
            .flat_map(|(_, dates)| dates.iter().copied())
            .collect();
        all.sort();
        all
    }

    pub fn is_clear(&self) -> bool {
        self.marks.values().all(Vec::is_empty)
    }
}

#[derive(Debug, Clone)]
pub struct ClassReport {
    pub year: i32,
    pub month: u32,
    /// Instructional days in the month.
    pub school_days: u32,
    /// Every roster student, by number.
    pub rows: Vec<ClassRow>,
}

impl ClassReport {
    /// `2026.03.01. - 2026.03.31.`
    pub fn period_label(&self) -> String {
        match month_bounds(self.year, self.month) {
            Some((first, last)) => format!(
                "{} - {}",
                first.format("%Y.%m.%d."),
                last.format("%Y.%m.%d.")
            ),
            None => String::new(),
        }
    }
}

fn in_month(date: NaiveDate, year: i32, month: u32) -> bool {
    date.year() == year && date.month() == month
}

/// Tallies `events` of `month` per roster student. `None` for an invalid month.
pub fn class_stats(
    calendar: &HolidayCalendar,
    roster: &Roster,
    events: &[AttendanceEvent],
    year: i32,
    month: u32,
) -> Option<ClassReport> {
    let (first, last) = month_bounds(year, month)?;
    let school_days = calendar.instructional_day_count(first, last);

    let mut rows: Vec<ClassRow> = roster
        .iter()
        .map(|(number, name)| ClassRow {
            number: *number,
            name: name.clone(),
            ..Default::default()
        })
        .collect();

    for event in events {
        let Some(row) = event
            .student_id
            .and_then(|id| rows.iter_mut().find(|r| r.number == id))
        else {
            continue;
        };
        let kind = MarkKind::of(&event.category);
        if !COLUMNS.contains(&kind) {
            continue;
        }
        let reason = Reason::of(event);
        let dates = row.marks.entry((kind, reason)).or_default();
        for day in marked_days(calendar, event) {
            if in_month(day, year, month) && !dates.contains(&day) {
                dates.push(day);
            }
        }
        dates.sort();
    }

    log::debug!(
        "{}-{:02}: {} students, {} school days",
        year,
        month,
        rows.len(),
        school_days
    );
    Some(ClassReport {
        year,
        month,
        school_days,
        rows,
    })
}

/// One line of the month's attendance listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRow {
    pub date: NaiveDate,
    pub number: u32,
    pub name: String,
    pub category: String,
    pub period: String,
    pub reason: String,
    /// Supporting documents are expected for this mark.
    pub needs_documents: bool,
}

/// Absences and authorized marks need paperwork unless unexcused.
fn requires_documents(event: &AttendanceEvent) -> bool {
    if event.unexcused || category::is_unexcused(&event.category) {
        return false;
    }
    category::is_absence(&event.category) || category::is_authorized(&event.category)
}

/// Marks of roster students in `month`, ordered by date then number.
/// Multi-day records list every day they cover inside the month.
pub fn monthly_detail(
    roster: &Roster,
    events: &[AttendanceEvent],
    year: i32,
    month: u32,
) -> Vec<DetailRow> {
    let mut rows = Vec::new();
    for event in events {
        let Some(number) = event.student_id.filter(|id| roster.contains_key(id)) else {
            continue;
        };
        for date in days_between_inclusive(event.start(), event.end()) {
            if !in_month(date, year, month) {
                continue;
            }
            rows.push(DetailRow {
                date,
                number,
                name: event.student_name.clone(),
                category: event.category.clone(),
                period: event.period.clone().unwrap_or_default(),
                reason: event.annotation.clone(),
                needs_documents: requires_documents(event),
            });
        }
    }
    rows.sort_by(|a, b| a.date.cmp(&b.date).then(a.number.cmp(&b.number)));
    rows
}
