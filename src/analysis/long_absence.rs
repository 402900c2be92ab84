// File: ./src/analysis/long_absence.rs
//! Cumulative and consecutive absence tracking against the notice ladder.

use crate::analysis::marked_days;
use crate::calendar::HolidayCalendar;
use crate::config::LongAbsenceLimits;
use crate::grouper::EpisodeGrouper;
use crate::model::category;
use crate::model::{AttendanceEvent, Episode, Roster};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Label given to every counted absence before streak detection, so that a
/// sick day followed by an unexcused day still forms one streak.
const STREAK_CATEGORY: &str = "absence";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AbsenceStatus {
    Normal,
    /// Below every threshold but with a long consecutive run.
    Warning,
    FirstNotice,
    SecondNotice,
    HomeNotice,
    ThirdNotice,
}

impl AbsenceStatus {
    pub fn from_count(count: usize, limits: &LongAbsenceLimits) -> Self {
        let count = count as u32;
        if count >= limits.third_notice {
            AbsenceStatus::ThirdNotice
        } else if count >= limits.home_notice {
            AbsenceStatus::HomeNotice
        } else if count >= limits.second_notice {
            AbsenceStatus::SecondNotice
        } else if count >= limits.first_notice {
            AbsenceStatus::FirstNotice
        } else {
            AbsenceStatus::Normal
        }
    }

    pub fn is_notice(&self) -> bool {
        *self >= AbsenceStatus::FirstNotice
    }
}

impl fmt::Display for AbsenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AbsenceStatus::Normal => "normal",
            AbsenceStatus::Warning => "warning (long streak)",
            AbsenceStatus::FirstNotice => "1st notice",
            AbsenceStatus::SecondNotice => "2nd notice",
            AbsenceStatus::HomeNotice => "home visit notice",
            AbsenceStatus::ThirdNotice => "3rd notice (over quota)",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone)]
pub struct AbsenceRow {
    pub number: u32,
    pub name: String,
    /// Distinct dates with a counted absence.
    pub count: usize,
    pub status: AbsenceStatus,
    /// Runs of at least `consecutive_limit` instructional days.
    pub long_streaks: Vec<Episode>,
}

impl AbsenceRow {
    pub fn streak_summary(&self) -> String {
        self.long_streaks
            .iter()
            .map(Episode::span_label)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Default)]
pub struct LongAbsenceReport {
    pub rows: Vec<AbsenceRow>,
    pub alerts: Vec<String>,
}

pub fn analyze(
    calendar: &HolidayCalendar,
    roster: &Roster,
    events: &[AttendanceEvent],
    limits: &LongAbsenceLimits,
) -> LongAbsenceReport {
    let mut per_student: BTreeMap<u32, Vec<AttendanceEvent>> = BTreeMap::new();
    for event in events {
        let Some(id) = event.student_id else {
            continue;
        };
        if !roster.contains_key(&id) || !category::counts_toward_long_absence(&event.category) {
            continue;
        }
        let mut unified = event.clone();
        unified.category = STREAK_CATEGORY.to_string();
        per_student.entry(id).or_default().push(unified);
    }

    let grouper = EpisodeGrouper::new(calendar);
    let mut report = LongAbsenceReport::default();

    for (number, name) in roster {
        let absences = per_student.remove(number).unwrap_or_default();
        let dates: BTreeSet<NaiveDate> = absences
            .iter()
            .flat_map(|e| marked_days(calendar, e))
            .collect();
        let count = dates.len();

        let long_streaks: Vec<Episode> = grouper
            .group(&absences)
            .into_iter()
            .filter(|ep| ep.instructional_day_count >= limits.consecutive_limit)
            .collect();

        if count == 0 && long_streaks.is_empty() {
            continue;
        }

        let mut status = AbsenceStatus::from_count(count, limits);
        if status == AbsenceStatus::Normal && !long_streaks.is_empty() {
            status = AbsenceStatus::Warning;
        }

        let row = AbsenceRow {
            number: *number,
            name: name.clone(),
            count,
            status,
            long_streaks,
        };

        if row.status.is_notice() {
            report.alerts.push(format!(
                "{}: {} absences ({})",
                row.name, row.count, row.status
            ));
        }
        if !row.long_streaks.is_empty() {
            report.alerts.push(format!(
                "{}: {}+ consecutive days absent [{}]",
                row.name,
                limits.consecutive_limit,
                row.streak_summary()
            ));
        }
        report.rows.push(row);
    }

    report
        .rows
        .sort_by(|a, b| b.count.cmp(&a.count).then(a.number.cmp(&b.number)));
    log::debug!(
        "Long absence: {} students listed, {} alerts",
        report.rows.len(),
        report.alerts.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_thresholds() {
        let l = LongAbsenceLimits::default();
        assert_eq!(AbsenceStatus::from_count(0, &l), AbsenceStatus::Normal);
        assert_eq!(AbsenceStatus::from_count(29, &l), AbsenceStatus::Normal);
        assert_eq!(AbsenceStatus::from_count(30, &l), AbsenceStatus::FirstNotice);
        assert_eq!(AbsenceStatus::from_count(40, &l), AbsenceStatus::SecondNotice);
        assert_eq!(AbsenceStatus::from_count(45, &l), AbsenceStatus::HomeNotice);
        assert_eq!(AbsenceStatus::from_count(50, &l), AbsenceStatus::ThirdNotice);
        assert!(!AbsenceStatus::Warning.is_notice());
    }
}
