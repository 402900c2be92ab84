// File: ./src/analysis/views.rs
//! Month grid and weekly summary views.

use crate::calendar::{DayKind, HolidayCalendar, days_between_inclusive, month_bounds};
use crate::model::{AttendanceEvent, Roster};
use chrono::{Datelike, Days, NaiveDate, Weekday};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
    /// 0 for padding cells outside the month.
    pub day: u32,
    pub date: Option<NaiveDate>,
    pub kind: Option<DayKind>,
    pub events: Vec<AttendanceEvent>,
}

impl DayCell {
    fn padding() -> Self {
        Self {
            day: 0,
            date: None,
            kind: None,
            events: Vec::new(),
        }
    }

    pub fn is_padding(&self) -> bool {
        self.day == 0
    }

    /// "sun", "sat", "holiday" or "" for plain school days.
    pub fn color_class(&self) -> &'static str {
        match (self.date.map(|d| d.weekday()), self.kind) {
            (Some(Weekday::Sun), _) => "sun",
            (Some(Weekday::Sat), _) => "sat",
            (_, Some(DayKind::Holiday)) => "holiday",
            _ => "",
        }
    }
}

/// Sunday-first weeks of `month`. `None` for an invalid month.
pub fn month_grid(
    calendar: &HolidayCalendar,
    year: i32,
    month: u32,
    events: &[AttendanceEvent],
) -> Option<Vec<[DayCell; 7]>> {
    let (first, last) = month_bounds(year, month)?;
    let lead = first.weekday().num_days_from_sunday() as usize;

    let mut cells: Vec<DayCell> = (0..lead).map(|_| DayCell::padding()).collect();
    for date in days_between_inclusive(first, last) {
        cells.push(DayCell {
            day: date.day(),
            date: Some(date),
            kind: Some(calendar.day_kind(date)),
            events: events.iter().filter(|e| e.covers(date)).cloned().collect(),
        });
    }
    while cells.len() % 7 != 0 {
        cells.push(DayCell::padding());
    }

    let mut weeks = Vec::with_capacity(cells.len() / 7);
    let mut iter = cells.into_iter();
    loop {
        let week: Vec<DayCell> = iter.by_ref().take(7).collect();
        let Ok(week) = <[DayCell; 7]>::try_from(week) else {
            break;
        };
        weeks.push(week);
    }
    Some(weeks)
}

#[derive(Debug, Clone)]
pub struct WeekWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// (number, name, that student's events in the window by date)
    pub students: Vec<(u32, String, Vec<AttendanceEvent>)>,
}

impl WeekWindow {
    pub fn label(&self) -> String {
        format!("{} ~ {}", self.start.format("%m.%d"), self.end.format("%m.%d"))
    }
}

/// Sunday-to-Saturday windows covering `month`.
pub fn weekly_summary(
    year: i32,
    month: u32,
    roster: &Roster,
    events: &[AttendanceEvent],
) -> Vec<WeekWindow> {
    let Some((first, last)) = month_bounds(year, month) else {
        return Vec::new();
    };
    let lead = first.weekday().num_days_from_sunday() as u64;
    let Some(mut start) = first.checked_sub_days(Days::new(lead)) else {
        return Vec::new();
    };

    let mut windows = Vec::new();
    while start <= last {
        let Some(end) = start.checked_add_days(Days::new(6)) else {
            break;
        };
        let students = roster
            .iter()
            .map(|(number, name)| {
                let mut evs: Vec<AttendanceEvent> = events
                    .iter()
                    .filter(|e| e.student_id == Some(*number))
                    .filter(|e| e.start() <= end && e.end() >= start)
                    .cloned()
                    .collect();
                evs.sort_by_key(|e| e.date);
                (*number, name.clone(), evs)
            })
            .collect();
        windows.push(WeekWindow {
            start,
            end,
            students,
        });
        let Some(next) = end.succ_opt() else {
            break;
        };
        start = next;
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_padding() {
        let cal = HolidayCalendar::weekends_only();
        // March 2026 starts on a Sunday and has 31 days.
        let weeks = month_grid(&cal, 2026, 3, &[]).unwrap();
        assert_eq!(weeks.len(), 5);
        assert_eq!(weeks[0][0].day, 1);
        assert_eq!(weeks[0][0].color_class(), "sun");
        assert_eq!(weeks[4][2].day, 31);
        assert!(weeks[4][3].is_padding());
        assert!(month_grid(&cal, 2026, 13, &[]).is_none());
    }
}
