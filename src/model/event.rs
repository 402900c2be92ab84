// File: ./src/model/event.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Student number -> display name, for one academic year.
pub type Roster = BTreeMap<u32, String>;

/// Identity used for grouping. A roster number always wins over a name,
/// since two students can share a display name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StudentKey {
    Id(u32),
    Name(String),
}

impl fmt::Display for StudentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StudentKey::Id(n) => write!(f, "#{}", n),
            StudentKey::Name(s) => write!(f, "{}", s),
        }
    }
}

/// One attendance mark for one student on one date (or an explicit range).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    #[serde(default)]
    pub student_id: Option<u32>,
    #[serde(default)]
    pub student_name: String,
    /// Cleaned label, e.g. "질병결석" or "sick-absence".
    pub category: String,
    #[serde(default)]
    pub unexcused: bool,
    pub date: NaiveDate,
    /// Inclusive end when the source already recorded a range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Class-period annotation, e.g. "1-3교시". Metadata only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default)]
    pub annotation: String,
}

impl AttendanceEvent {
    pub fn new(student_id: u32, student_name: &str, category: &str, date: NaiveDate) -> Self {
        Self {
            student_id: Some(student_id),
            student_name: student_name.to_string(),
            unexcused: super::category::is_unexcused(category),
            category: category.to_string(),
            date,
            end_date: None,
            period: None,
            annotation: String::new(),
        }
    }

    pub fn with_range(mut self, end: NaiveDate) -> Self {
        self.end_date = Some(end);
        self
    }

    pub fn with_annotation(mut self, annotation: &str) -> Self {
        self.annotation = annotation.to_string();
        self
    }

    pub fn with_period(mut self, period: &str) -> Self {
        self.period = Some(period.to_string());
        self
    }

    /// `None` when the event carries neither a number nor a non-blank name.
    pub fn identity(&self) -> Option<StudentKey> {
        if let Some(id) = self.student_id {
            return Some(StudentKey::Id(id));
        }
        let name = self.student_name.trim();
        if name.is_empty() {
            None
        } else {
            Some(StudentKey::Name(name.to_string()))
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.date
    }

    pub fn end(&self) -> NaiveDate {
        self.end_date.unwrap_or(self.date)
    }

    pub fn covers(&self, day: NaiveDate) -> bool {
        self.start() <= day && day <= self.end()
    }
}

/// A merged run of same-student, same-category events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub student_id: Option<u32>,
    pub student_name: String,
    pub category: String,
    pub unexcused: bool,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Instructional days inside `[start_date, end_date]`, not calendar days.
    pub instructional_day_count: u32,
    pub event_count: usize,
    pub period: Option<String>,
    pub annotation: String,
}

impl Episode {
    pub fn from_event(event: &AttendanceEvent) -> Self {
        Self {
            student_id: event.student_id,
            student_name: event.student_name.clone(),
            category: event.category.clone(),
            unexcused: event.unexcused,
            start_date: event.start(),
            end_date: event.end(),
            instructional_day_count: 0,
            event_count: 1,
            period: event.period.clone(),
            annotation: event.annotation.clone(),
        }
    }

    pub fn is_single_day(&self) -> bool {
        self.start_date == self.end_date
    }

    pub fn calendar_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    /// "03.02" or "03.02 ~ 03.06".
    pub fn period_label(&self) -> String {
        let mut s = self.start_date.format("%m.%d").to_string();
        if !self.is_single_day() {
            s.push_str(&format!(" ~ {}", self.end_date.format("%m.%d")));
        }
        s
    }

    /// "03.02~03.06(5d)", used in alert lines.
    pub fn span_label(&self) -> String {
        format!(
            "{}~{}({}d)",
            self.start_date.format("%m.%d"),
            self.end_date.format("%m.%d"),
            self.instructional_day_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn identity_prefers_number() {
        let mut e = AttendanceEvent::new(5, "Kim", "sick-absence", d(2026, 3, 2));
        assert_eq!(e.identity(), Some(StudentKey::Id(5)));

        e.student_id = None;
        assert_eq!(e.identity(), Some(StudentKey::Name("Kim".into())));

        e.student_name = "   ".into();
        assert_eq!(e.identity(), None);
    }

    #[test]
    fn id_keys_sort_before_name_keys() {
        assert!(StudentKey::Id(99) < StudentKey::Name("Aaron".into()));
        assert!(StudentKey::Id(2) < StudentKey::Id(10));
    }

    #[test]
    fn period_labels() {
        let e = AttendanceEvent::new(1, "Lee", "late", d(2026, 3, 2)).with_range(d(2026, 3, 6));
        let mut ep = Episode::from_event(&e);
        ep.instructional_day_count = 5;
        assert_eq!(ep.period_label(), "03.02 ~ 03.06");
        assert_eq!(ep.span_label(), "03.02~03.06(5d)");
        assert_eq!(ep.calendar_days(), 5);
    }
}
