// File: ./src/analysis/mod.rs
// Reports built on top of the episode grouper.
pub mod checklist;
pub mod daily;
pub mod field_trip;
pub mod long_absence;
pub mod menstrual;
pub mod monthly;
pub mod views;

use crate::calendar::{HolidayCalendar, days_between_inclusive};
use crate::model::AttendanceEvent;
use chrono::NaiveDate;

pub use checklist::{ChecklistRow, ChecklistStore, build_checklist};
pub use daily::{Briefing, Reminder, briefing, document_reminders, instructional_days_since};
pub use field_trip::{FieldTripReport, TripRow, TripViolation};
pub use long_absence::{AbsenceRow, AbsenceStatus, LongAbsenceReport};
pub use menstrual::{MenstrualReport, MenstrualRow, MonthUse};
pub use monthly::{ClassReport, ClassRow, DetailRow, Reason};
pub use views::{DayCell, WeekWindow, month_grid, weekly_summary};

/// Days a record marks: a single-day mark counts as is, a multi-day record
/// only on its instructional days.
pub(crate) fn marked_days(calendar: &HolidayCalendar, event: &AttendanceEvent) -> Vec<NaiveDate> {
    if event.start() == event.end() {
        return vec![event.date];
    }
    days_between_inclusive(event.start(), event.end())
        .filter(|d| calendar.is_instructional_day(*d))
        .collect()
}
