// Classification of attendance mark labels.
//
// Labels come straight from the attendance sheet, so both the Korean
// administrative terms and their English equivalents are recognised.
// Matching is by substring on the label with whitespace removed.
use std::fmt;
use strum::EnumIter;

const ABSENCE: &[&str] = &["결석", "absence", "absent"];
const LATE: &[&str] = &["지각", "late"];
const EARLY_LEAVE: &[&str] = &["조퇴", "early-leave", "earlyleave"];
const PARTIAL: &[&str] = &["결과", "partial"];
const UNEXCUSED: &[&str] = &["미인정", "무단", "unexcused", "unauthorized"];
const AUTHORIZED: &[&str] = &["인정", "authorized", "excused"];
const OTHER: &[&str] = &["기타", "other"];
const FIELD_TRIP: &[&str] = &["체험", "교외", "field-trip", "fieldtrip"];
const MENSTRUAL: &[&str] = &["생리", "menstrual"];
const INTERNATIONAL: &[&str] = &[
    "국외", "해외", "유학", "출국", "비자", "abroad", "international",
];

fn squash(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    let t = squash(text);
    needles.iter().any(|n| t.contains(n))
}

pub fn is_unexcused(label: &str) -> bool {
    contains_any(label, UNEXCUSED)
}

/// "인정결석" / "authorized-absence". "미인정" contains "인정", so unexcused
/// labels are ruled out first.
pub fn is_authorized(label: &str) -> bool {
    !is_unexcused(label) && contains_any(label, AUTHORIZED)
}

pub fn is_absence(label: &str) -> bool {
    contains_any(label, ABSENCE)
}

pub fn is_other(label: &str) -> bool {
    contains_any(label, OTHER)
}

pub fn is_late_or_early(label: &str) -> bool {
    contains_any(label, LATE) || contains_any(label, EARLY_LEAVE) || contains_any(label, PARTIAL)
}

/// Absences that count toward the long-term absence ladder.
pub fn counts_toward_long_absence(label: &str) -> bool {
    is_absence(label) && !is_authorized(label)
}

pub fn is_field_trip(text: &str) -> bool {
    contains_any(text, FIELD_TRIP)
}

pub fn is_international_trip(text: &str) -> bool {
    contains_any(text, INTERNATIONAL)
}

pub fn is_menstrual(text: &str) -> bool {
    contains_any(text, MENSTRUAL)
}

/// Marks for which the family must hand in supporting documents.
pub fn needs_documents(label: &str, unexcused: bool) -> bool {
    if unexcused || is_unexcused(label) {
        return false;
    }
    is_absence(label) || is_authorized(label) || is_other(label)
}

/// Coarse bucket used by the daily briefing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum MarkKind {
    Absence,
    Late,
    EarlyLeave,
    Partial,
    Other,
}

impl MarkKind {
    pub fn of(label: &str) -> Self {
        if is_absence(label) {
            MarkKind::Absence
        } else if contains_any(label, LATE) {
            MarkKind::Late
        } else if contains_any(label, EARLY_LEAVE) {
            MarkKind::EarlyLeave
        } else if contains_any(label, PARTIAL) {
            MarkKind::Partial
        } else {
            MarkKind::Other
        }
    }

    pub fn is_tardy(&self) -> bool {
        matches!(self, MarkKind::Late | MarkKind::EarlyLeave | MarkKind::Partial)
    }
}

impl fmt::Display for MarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkKind::Absence => write!(f, "absence"),
            MarkKind::Late => write!(f, "late"),
            MarkKind::EarlyLeave => write!(f, "early leave"),
            MarkKind::Partial => write!(f, "partial absence"),
            MarkKind::Other => write!(f, "other"),
        }
    }
}
