// File: ./src/analysis/menstrual.rs
//! Menstrual leave usage per school month against the monthly allowance.

use crate::analysis::marked_days;
use crate::calendar::{AcademicYear, HolidayCalendar};
use crate::config::MenstrualLimits;
use crate::model::category;
use crate::model::{AttendanceEvent, MarkKind, Roster};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthUse {
    pub month: u32,
    pub absences: Vec<NaiveDate>,
    /// Late arrivals, early leaves and partial absences.
    pub partials: Vec<NaiveDate>,
}

impl MonthUse {
    pub fn is_used(&self) -> bool {
        !self.absences.is_empty() || !self.partials.is_empty()
    }

    /// Both kinds in one month, or either kind over its allowance.
    pub fn is_violation(&self, limits: &MenstrualLimits) -> bool {
        (!self.absences.is_empty() && !self.partials.is_empty())
            || self.absences.len() > limits.absences_per_month
            || self.partials.len() > limits.partials_per_month
    }

    /// `None` for an unused month.
    pub fn summary(&self, limits: &MenstrualLimits) -> Option<String> {
        if !self.is_used() {
            return None;
        }
        Some(if self.is_violation(limits) {
            format!(
                "absent {} / partial {} (over limit)",
                self.absences.len(),
                self.partials.len()
            )
        } else if !self.absences.is_empty() {
            format!("absent {}", self.absences.len())
        } else {
            format!("partial {}", self.partials.len())
        })
    }

    fn fmt_dates(dates: &[NaiveDate]) -> String {
        dates
            .iter()
            .map(|d| d.format("%m.%d").to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `absent: 03.02 | partial: 03.10, 03.11`
    pub fn detail(&self) -> String {
        let mut parts = Vec::new();
        if !self.absences.is_empty() {
            parts.push(format!("absent: {}", Self::fmt_dates(&self.absences)));
        }
        if !self.partials.is_empty() {
            parts.push(format!("partial: {}", Self::fmt_dates(&self.partials)));
        }
        parts.join(" | ")
    }
}

#[derive(Debug, Clone)]
pub struct MenstrualRow {
    pub number: u32,
    pub name: String,
    /// One entry per school month, March first.
    pub months: Vec<MonthUse>,
}

impl MenstrualRow {
    pub fn is_used(&self) -> bool {
        self.months.iter().any(MonthUse::is_used)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MenstrualReport {
    pub rows: Vec<MenstrualRow>,
    pub alerts: Vec<String>,
}

fn is_menstrual_mark(event: &AttendanceEvent) -> bool {
    category::is_menstrual(&event.category) || category::is_menstrual(&event.annotation)
}

/// Every roster student gets a row; marks of other students are ignored.
pub fn analyze(
    calendar: &HolidayCalendar,
    roster: &Roster,
    events: &[AttendanceEvent],
    academic_year: AcademicYear,
    limits: &MenstrualLimits,
) -> MenstrualReport {
    let mut used: BTreeMap<(u32, u32), MonthUse> = BTreeMap::new();
    for event in events.iter().filter(|e| is_menstrual_mark(e)) {
        let Some(number) = event.student_id.filter(|id| roster.contains_key(id)) else {
            continue;
        };
        let kind = MarkKind::of(&event.category);
        if kind == MarkKind::Other {
            continue;
        }
        for day in marked_days(calendar, event) {
            if !academic_year.contains(day) {
                continue;
            }
            let entry = used.entry((number, day.month())).or_default();
            let dates = if kind == MarkKind::Absence {
                &mut entry.absences
            } else {
                &mut entry.partials
            };
            if !dates.contains(&day) {
                dates.push(day);
                dates.sort();
            }
        }
    }

    let mut report = MenstrualReport::default();
    for (number, name) in roster {
        let months: Vec<MonthUse> = academic_year
            .months()
            .into_iter()
            .map(|month| {
                let mut m = used.remove(&(*number, month)).unwrap_or_default();
                m.month = month;
                m
            })
            .collect();

        for m in months.iter().filter(|m| m.is_violation(limits)) {
            report.alerts.push(format!(
                "{} (month {}): absent {} / partial {} over the monthly limit",
                name,
                m.month,
                m.absences.len(),
                m.partials.len()
            ));
        }
        report.rows.push(MenstrualRow {
            number: *number,
            name: name.clone(),
            months,
        });
    }
    log::debug!("Menstrual leave: {} alerts", report.alerts.len());
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    #[test]
    fn violation_rules() {
        let limits = MenstrualLimits::default();
        let one_absence = MonthUse {
            month: 3,
            absences: vec![d(3, 2)],
            partials: vec![],
        };
        assert!(!one_absence.is_violation(&limits));
        assert_eq!(one_absence.summary(&limits).as_deref(), Some("absent 1"));

        let mixed = MonthUse {
            partials: vec![d(3, 10)],
            ..one_absence.clone()
        };
        assert!(mixed.is_violation(&limits));
        assert_eq!(mixed.detail(), "absent: 03.02 | partial: 03.10");

        let many_partials = MonthUse {
            month: 4,
            absences: vec![],
            partials: vec![d(4, 1), d(4, 2), d(4, 3), d(4, 6)],
        };
        assert!(many_partials.is_violation(&limits));
        assert_eq!(MonthUse::default().summary(&limits), None);
    }
}
