// File: ./src/analysis/daily.rs
use crate::analysis::checklist::ChecklistStore;
use crate::calendar::{AcademicYear, HolidayCalendar};
use crate::grouper::EpisodeGrouper;
use crate::model::category;
use crate::model::{AttendanceEvent, Episode, MarkKind};
use chrono::{Datelike, NaiveDate};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Briefing {
    pub date: Option<NaiveDate>,
    pub absences: Vec<String>,
    pub tardies: Vec<String>,
    pub others: Vec<String>,
}

impl Briefing {
    pub fn total(&self) -> usize {
        self.absences.len() + self.tardies.len() + self.others.len()
    }

    pub fn lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (title, items) in [
            ("Absent", &self.absences),
            ("Late/early", &self.tardies),
            ("Other", &self.others),
        ] {
            if !items.is_empty() {
                out.push(format!("{} ({}): {}", title, items.len(), items.join(", ")));
            }
        }
        out
    }
}

fn describe(event: &AttendanceEvent) -> String {
    match &event.period {
        Some(p) => format!("{}({} {})", event.student_name, event.category, p),
        None => format!("{}({})", event.student_name, event.category),
    }
}

/// Who is out on `date`. `None` when nobody has a mark that day.
pub fn briefing(date: NaiveDate, events: &[AttendanceEvent]) -> Option<Briefing> {
    let mut todays: Vec<&AttendanceEvent> = events.iter().filter(|e| e.covers(date)).collect();
    if todays.is_empty() {
        return None;
    }
    todays.sort_by(|a, b| {
        a.student_id
            .cmp(&b.student_id)
            .then(a.student_name.cmp(&b.student_name))
    });

    let mut b = Briefing {
        date: Some(date),
        ..Default::default()
    };
    for event in todays {
        let kind = MarkKind::of(&event.category);
        let line = describe(event);
        if kind == MarkKind::Absence {
            b.absences.push(line);
        } else if kind.is_tardy() {
            b.tardies.push(line);
        } else {
            b.others.push(line);
        }
    }
    Some(b)
}

/// Instructional days from `start` up to and including `today`.
pub fn instructional_days_since(
    calendar: &HolidayCalendar,
    start: NaiveDate,
    today: NaiveDate,
) -> u32 {
    calendar.instructional_day_count(start, today)
}

#[derive(Debug, Clone)]
pub struct Reminder {
    pub episode: Episode,
    pub days_elapsed: i64,
}

impl Reminder {
    pub fn line(&self) -> String {
        format!(
            "{}({} {}): {} days outstanding",
            self.episode.student_name,
            self.episode.period_label(),
            self.episode.category,
            self.days_elapsed
        )
    }
}

/// Episodes of the current and previous school month whose supporting
/// documents are overdue by `deadline_days` calendar days and not yet
/// recorded in `store`.
pub fn document_reminders(
    calendar: &HolidayCalendar,
    events: &[AttendanceEvent],
    today: NaiveDate,
    store: &ChecklistStore,
    deadline_days: i64,
) -> Vec<Reminder> {
    let academic_year = AcademicYear::of_date(today);
    let mut months = vec![today.month()];
    if let Some(prev) = academic_year.previous_month(today.month()) {
        months.push(prev);
    }

    let recent: Vec<AttendanceEvent> = events
        .iter()
        .filter(|e| academic_year.contains(e.date) && months.contains(&e.date.month()))
        .filter(|e| category::needs_documents(&e.category, e.unexcused))
        .cloned()
        .collect();

    let mut reminders: Vec<Reminder> = EpisodeGrouper::new(calendar)
        .group(&recent)
        .into_iter()
        .filter(|ep| ep.start_date <= today)
        .filter(|ep| !store.is_episode_submitted(ep))
        .filter_map(|episode| {
            let days_elapsed = (today - episode.start_date).num_days();
            (days_elapsed >= deadline_days).then_some(Reminder {
                episode,
                days_elapsed,
            })
        })
        .collect();

    reminders.sort_by(|a, b| {
        b.days_elapsed
            .cmp(&a.days_elapsed)
            .then(a.episode.student_id.cmp(&b.episode.student_id))
    });
    reminders
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    #[test]
    fn briefing_buckets() {
        let events = vec![
            AttendanceEvent::new(2, "B", "질병지각", d(3, 4)).with_period("1교시"),
            AttendanceEvent::new(1, "A", "질병결석", d(3, 4)),
            AttendanceEvent::new(3, "C", "기타", d(3, 4)),
            AttendanceEvent::new(4, "D", "질병결석", d(3, 5)),
        ];
        let b = briefing(d(3, 4), &events).unwrap();
        assert_eq!(b.absences, vec!["A(질병결석)"]);
        assert_eq!(b.tardies, vec!["B(질병지각 1교시)"]);
        assert_eq!(b.others, vec!["C(기타)"]);
        assert_eq!(b.total(), 3);
        assert!(briefing(d(3, 6), &events).is_none());
    }
}
