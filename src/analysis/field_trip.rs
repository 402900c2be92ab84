// File: ./src/analysis/field_trip.rs
//! Field-trip ("교외체험학습") usage per student against the yearly limits.

use crate::calendar::HolidayCalendar;
use crate::config::FieldTripLimits;
use crate::grouper::EpisodeGrouper;
use crate::model::category;
use crate::model::{AttendanceEvent, Episode, Roster, StudentKey};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripViolation {
    DomesticTotal,
    InternationalTotal,
    DomesticConsecutive,
}

impl TripViolation {
    pub fn badge(&self) -> &'static str {
        match self {
            TripViolation::DomesticTotal => "domestic total exceeded",
            TripViolation::InternationalTotal => "international total exceeded",
            TripViolation::DomesticConsecutive => "domestic run too long",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TripRow {
    pub number: Option<u32>,
    pub name: String,
    pub domestic_days: usize,
    pub international_days: usize,
    pub domestic_periods: Vec<Episode>,
    pub international_periods: Vec<Episode>,
    pub violations: Vec<TripViolation>,
}

impl TripRow {
    pub fn longest_domestic(&self) -> u32 {
        self.domestic_periods
            .iter()
            .map(|e| e.instructional_day_count)
            .max()
            .unwrap_or(0)
    }

    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FieldTripReport {
    pub rows: Vec<TripRow>,
    pub alerts: Vec<String>,
}

fn trip_text(event: &AttendanceEvent) -> String {
    format!("{} {}", event.category, event.annotation)
}

pub fn is_trip_event(event: &AttendanceEvent) -> bool {
    !event.unexcused && category::is_field_trip(&trip_text(event))
}

fn distinct_days(events: &[AttendanceEvent]) -> usize {
    events
        .iter()
        .flat_map(|e| crate::calendar::days_between_inclusive(e.start(), e.end()))
        .collect::<BTreeSet<NaiveDate>>()
        .len()
}

#[derive(Default)]
struct Trips {
    number: Option<u32>,
    name: String,
    domestic: Vec<AttendanceEvent>,
    international: Vec<AttendanceEvent>,
}

pub fn analyze(
    calendar: &HolidayCalendar,
    roster: &Roster,
    events: &[AttendanceEvent],
    limits: &FieldTripLimits,
) -> FieldTripReport {
    let mut by_student: BTreeMap<StudentKey, Trips> = BTreeMap::new();
    for event in events.iter().filter(|e| is_trip_event(e)) {
        let Some(key) = event.identity() else {
            continue;
        };
        let trips = by_student.entry(key).or_insert_with(|| Trips {
            number: event.student_id,
            name: event
                .student_id
                .and_then(|n| roster.get(&n).cloned())
                .unwrap_or_else(|| event.student_name.clone()),
            ..Default::default()
        });
        if category::is_international_trip(&trip_text(event)) {
            trips.international.push(event.clone());
        } else {
            trips.domestic.push(event.clone());
        }
    }

    let grouper = EpisodeGrouper::new(calendar);
    let mut report = FieldTripReport::default();

    for trips in by_student.into_values() {
        let mut row = TripRow {
            number: trips.number,
            name: trips.name,
            domestic_days: distinct_days(&trips.domestic),
            international_days: distinct_days(&trips.international),
            domestic_periods: grouper.group(&trips.domestic),
            international_periods: grouper.group(&trips.international),
            violations: Vec::new(),
        };

        if row.domestic_days > limits.domestic_total {
            row.violations.push(TripViolation::DomesticTotal);
        }
        if row.international_days > limits.international_total {
            row.violations.push(TripViolation::InternationalTotal);
        }
        if row.longest_domestic() > limits.domestic_consecutive {
            row.violations.push(TripViolation::DomesticConsecutive);
        }

        for v in &row.violations {
            let detail = match v {
                TripViolation::DomesticTotal => {
                    format!("{} / {} days", row.domestic_days, limits.domestic_total)
                }
                TripViolation::InternationalTotal => format!(
                    "{} / {} days",
                    row.international_days, limits.international_total
                ),
                TripViolation::DomesticConsecutive => format!(
                    "{} days in a row (limit {})",
                    row.longest_domestic(),
                    limits.domestic_consecutive
                ),
            };
            report
                .alerts
                .push(format!("{}: {} ({})", row.name, v.badge(), detail));
        }
        report.rows.push(row);
    }

    // Roster students first, in number order; others by name.
    report.rows.sort_by(|a, b| match (a.number, b.number) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    });
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    #[test]
    fn trip_detection_uses_annotation() {
        let plain = AttendanceEvent::new(1, "A", "인정결석", d(4, 1));
        assert!(!is_trip_event(&plain));
        assert!(is_trip_event(&plain.clone().with_annotation("교외 체험학습")));

        let mut unexcused = AttendanceEvent::new(1, "A", "체험학습", d(4, 1));
        unexcused.unexcused = true;
        assert!(!is_trip_event(&unexcused));
    }
}
