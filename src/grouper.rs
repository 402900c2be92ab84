// File: ./src/grouper.rs
//! Merges attendance events into episodes.
//!
//! Events of the same student and category join one episode when they touch
//! or overlap, or when every date between them is a weekend or holiday
//! ("bridging"). Each closed episode carries its instructional-day length.

use crate::calendar::HolidayCalendar;
use crate::model::{AttendanceEvent, Episode, StudentKey};
use chrono::Days;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Neither a student number nor a name.
    MissingIdentity,
    /// `end_date` before `date`.
    ReversedRange,
}

/// Grouping output plus the input positions that were left out.
#[derive(Debug, Clone, Default)]
pub struct GroupReport {
    pub episodes: Vec<Episode>,
    pub skipped: Vec<(usize, SkipReason)>,
}

impl GroupReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

pub struct EpisodeGrouper<'a> {
    calendar: &'a HolidayCalendar,
}

struct Keyed<'e> {
    key: StudentKey,
    event: &'e AttendanceEvent,
}

fn sort_order(a: &Keyed<'_>, b: &Keyed<'_>) -> Ordering {
    // Ties past (student, start) are broken on every remaining field so that
    // the output does not depend on input order.
    a.key
        .cmp(&b.key)
        .then_with(|| a.event.start().cmp(&b.event.start()))
        .then_with(|| a.event.category.cmp(&b.event.category))
        .then_with(|| a.event.end().cmp(&b.event.end()))
        .then_with(|| a.event.unexcused.cmp(&b.event.unexcused))
        .then_with(|| a.event.period.cmp(&b.event.period))
        .then_with(|| a.event.annotation.cmp(&b.event.annotation))
        .then_with(|| a.event.student_name.cmp(&b.event.student_name))
}

impl<'a> EpisodeGrouper<'a> {
    pub fn new(calendar: &'a HolidayCalendar) -> Self {
        Self { calendar }
    }

    pub fn group(&self, events: &[AttendanceEvent]) -> Vec<Episode> {
        self.group_with_report(events).episodes
    }

    pub fn group_with_report(&self, events: &[AttendanceEvent]) -> GroupReport {
        let mut report = GroupReport::default();

        let mut keyed: Vec<Keyed<'_>> = Vec::with_capacity(events.len());
        for (idx, event) in events.iter().enumerate() {
            let Some(key) = event.identity() else {
                log::debug!("Skipping event #{} on {}: no student identity", idx, event.date);
                report.skipped.push((idx, SkipReason::MissingIdentity));
                continue;
            };
            if event.end() < event.start() {
                log::debug!(
                    "Skipping event #{} for {}: range {}..{} is reversed",
                    idx,
                    key,
                    event.start(),
                    event.end()
                );
                report.skipped.push((idx, SkipReason::ReversedRange));
                continue;
            }
            keyed.push(Keyed { key, event });
        }

        keyed.sort_by(sort_order);

        let mut current: Option<(StudentKey, Episode)> = None;
        for item in keyed {
            current = Some(match current.take() {
                None => (item.key, Episode::from_event(item.event)),
                Some((key, mut episode)) => {
                    let same_track = key == item.key && episode.category == item.event.category;
                    if same_track && self.connects(&episode, item.event) {
                        Self::extend(&mut episode, item.event);
                        (key, episode)
                    } else {
                        report.episodes.push(self.close(episode));
                        (item.key, Episode::from_event(item.event))
                    }
                }
            });
        }
        if let Some((_, episode)) = current {
            report.episodes.push(self.close(episode));
        }

        if !report.skipped.is_empty() {
            log::info!(
                "Grouped {} events into {} episodes ({} skipped)",
                events.len(),
                report.episodes.len(),
                report.skipped.len()
            );
        }
        report
    }

    /// Whether `next` continues `episode` without an instructional day in between.
    fn connects(&self, episode: &Episode, next: &AttendanceEvent) -> bool {
        if next.start() < episode.start_date {
            // Cannot happen after sorting; refuse to merge rather than guess.
            log::debug!(
                "Out-of-order event for {} on {}, keeping it separate",
                episode.student_name,
                next.start()
            );
            return false;
        }
        let touches = episode
            .end_date
            .checked_add_days(Days::new(1))
            .is_none_or(|day_after| next.start() <= day_after);
        touches || self.calendar.is_break_between(episode.end_date, next.start())
    }

    fn extend(episode: &mut Episode, next: &AttendanceEvent) {
        if next.end() > episode.end_date {
            episode.end_date = next.end();
        }
        episode.event_count += 1;
        if episode.period.is_none() {
            episode.period = next.period.clone();
        }
    }

    fn close(&self, mut episode: Episode) -> Episode {
        episode.instructional_day_count = self
            .calendar
            .instructional_day_count(episode.start_date, episode.end_date);
        episode
    }
}

/// Shorthand for `EpisodeGrouper::new(calendar).group(events)`.
pub fn group_events(calendar: &HolidayCalendar, events: &[AttendanceEvent]) -> Vec<Episode> {
    EpisodeGrouper::new(calendar).group(events)
}
