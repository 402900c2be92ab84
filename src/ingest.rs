// File: ./src/ingest.rs
//! Turning exported attendance sheets into typed events.
//!
//! Input is a grid of strings (one tab-separated export per monthly sheet);
//! validation happens here so the grouping core only ever sees well-formed
//! `AttendanceEvent`s.

use crate::calendar::AcademicYear;
use crate::model::category;
use crate::model::{AttendanceEvent, Roster};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::Path;

const HEADER_SCAN_ROWS: usize = 10;
/// What a ticked checkbox with no text beside it means.
const PLAIN_ABSENCE: &str = "결석";
const UNKNOWN_NAME: &str = "Unknown";

/// A single attendance cell, decomposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMark {
    pub category: String,
    pub period: Option<String>,
    pub reason: String,
    pub unexcused: bool,
}

fn first_delimited(s: &str, open: char, close: char) -> Option<&str> {
    let start = s.find(open)? + open.len_utf8();
    let len = s[start..].find(close)?;
    Some(&s[start..start + len])
}

/// Drops the first `open..close` group, delimiters included.
fn remove_first_delimited(s: &str, open: char, close: char) -> String {
    let Some(start) = s.find(open) else {
        return s.to_string();
    };
    let Some(len) = s[start..].find(close) else {
        return s.to_string();
    };
    format!("{}{}", &s[..start], &s[start + len + close.len_utf8()..])
}

fn remove_delimited(s: &str, open: char, close: char) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find(open) {
        let Some(len) = rest[start..].find(close) else {
            break;
        };
        out.push_str(&rest[..start]);
        rest = &rest[start + len + close.len_utf8()..];
    }
    out.push_str(rest);
    out
}

/// Parses `"<category>(<period>)[<reason>]"`, e.g. `"질병조퇴(5-7교시)[병원]"`.
/// Returns `None` for cells that carry no mark.
///
/// A cell holding only a period or a reason yields an empty category, which
/// matches no absence, tardy or documents rule.
pub fn parse_cell(text: &str) -> Option<ParsedMark> {
    let text = text.trim();
    if text.is_empty() || text == "-" || text == "0" || text.eq_ignore_ascii_case("false") {
        return None;
    }

    let period = first_delimited(text, '(', ')')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    let reason = first_delimited(text, '[', ']')
        .map(|r| r.trim().to_string())
        .unwrap_or_default();

    let label = remove_delimited(text, '(', ')');
    let label = remove_first_delimited(&label, '[', ']').replace("[]", "");

    Some(ParsedMark {
        unexcused: category::is_unexcused(text),
        category: label.trim().to_string(),
        period,
        reason,
    })
}

/// Resolves the checkbox column and the text column next to it into a mark.
fn cell_value(check: &str, text: &str) -> Option<String> {
    let check = check.trim();
    let text = text.trim();
    if !text.is_empty() {
        Some(text.to_string())
    } else if check.eq_ignore_ascii_case("true") {
        Some(PLAIN_ABSENCE.to_string())
    } else if !check.is_empty() && !check.eq_ignore_ascii_case("false") {
        Some(check.to_string())
    } else {
        None
    }
}

fn squash(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn is_number_header(cell: &str) -> bool {
    let c = squash(cell).to_lowercase();
    (c.contains("번호") && !c.contains("핸드폰")) || c == "no" || c == "number"
}

fn is_name_header(cell: &str) -> bool {
    let c = squash(cell).to_lowercase();
    c.contains("이름") || c.contains("성명") || c == "name"
}

struct SheetHeader {
    row: usize,
    number_col: usize,
    name_col: usize,
    cells: Vec<String>,
}

fn find_header(rows: &[Vec<String>]) -> Option<SheetHeader> {
    for (i, row) in rows.iter().take(HEADER_SCAN_ROWS).enumerate() {
        if !row.iter().any(|c| is_number_header(c)) || !row.iter().any(|c| is_name_header(c)) {
            continue;
        }
        let mut number_col = None;
        let mut name_col = None;
        for (idx, cell) in row.iter().enumerate() {
            if is_number_header(cell) {
                number_col = Some(idx);
            } else if is_name_header(cell) {
                name_col = Some(idx);
            }
        }
        return Some(SheetHeader {
            row: i,
            number_col: number_col?,
            name_col: name_col?,
            cells: row.clone(),
        });
    }
    None
}

/// `3/4`, `3.4`, `2026-3-4` -> day of `month`, when the month matches.
fn header_date(cell: &str, month: u32, year: i32) -> Option<NaiveDate> {
    let parts: Vec<u32> = cell
        .trim()
        .split(['.', '/', '-'])
        .map(str::trim)
        .filter(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|p| p.parse().ok())
        .collect();
    if parts.len() < 2 {
        return None;
    }
    let (m, d) = if parts[0] == month {
        (parts[0], parts[1])
    } else if parts[parts.len() - 2] == month {
        (parts[parts.len() - 2], parts[parts.len() - 1])
    } else {
        return None;
    };
    NaiveDate::from_ymd_opt(year, m, d)
}

/// Parses one monthly attendance sheet.
///
/// Rows whose number cell is not numeric are skipped; a blank name falls back
/// to the roster.
pub fn parse_month_sheet(
    rows: &[Vec<String>],
    month: u32,
    academic_year: AcademicYear,
    roster: &Roster,
) -> Result<Vec<AttendanceEvent>> {
    let header = find_header(rows).ok_or_else(|| {
        anyhow::anyhow!("Month {}: could not find the number/name header row", month)
    })?;
    let year = academic_year.year_of_month(month);

    let date_cols: Vec<(usize, NaiveDate)> = header
        .cells
        .iter()
        .enumerate()
        .filter_map(|(idx, cell)| header_date(cell, month, year).map(|d| (idx, d)))
        .collect();
    if date_cols.is_empty() {
        log::warn!("Month {}: header has no date columns", month);
    }

    let mut events = Vec::new();
    for row in rows.iter().skip(header.row + 1) {
        let Some(num) = row
            .get(header.number_col)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
            .and_then(|s| s.parse::<u32>().ok())
        else {
            continue;
        };

        let name = row
            .get(header.name_col)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| roster.get(&num).cloned())
            .unwrap_or_else(|| UNKNOWN_NAME.to_string());

        for (col, date) in &date_cols {
            let Some(check) = row.get(*col) else {
                continue;
            };
            let text = row.get(col + 1).map(String::as_str).unwrap_or("");
            let Some(value) = cell_value(check, text) else {
                continue;
            };
            let Some(mark) = parse_cell(&value) else {
                continue;
            };
            events.push(AttendanceEvent {
                student_id: Some(num),
                student_name: name.clone(),
                category: mark.category,
                unexcused: mark.unexcused,
                date: *date,
                end_date: None,
                period: mark.period,
                annotation: mark.reason,
            });
        }
    }

    log::info!("Month {}: parsed {} attendance marks", month, events.len());
    Ok(events)
}

/// Column A holds the student number (1..=99), column B the name.
pub fn parse_roster(rows: &[Vec<String>]) -> Roster {
    let mut roster = Roster::new();
    for row in rows {
        let (Some(num), Some(name)) = (row.first(), row.get(1)) else {
            continue;
        };
        let Ok(num) = num.trim().parse::<u32>() else {
            continue;
        };
        if !(1..100).contains(&num) {
            continue;
        }
        let name = name.trim();
        if name.is_empty() || is_name_header(name) {
            continue;
        }
        roster.insert(num, name.to_string());
    }
    roster
}

pub fn parse_tsv(content: &str) -> Vec<Vec<String>> {
    content
        .lines()
        .map(|line| {
            line.trim_end_matches('\r')
                .split('\t')
                .map(str::to_string)
                .collect()
        })
        .collect()
}

pub fn read_tsv(path: &Path) -> Result<Vec<Vec<String>>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    Ok(parse_tsv(&content))
}

/// Reads a JSON array of events, skipping (and logging) malformed entries
/// instead of rejecting the whole file.
pub fn read_events_json(path: &Path) -> Result<Vec<AttendanceEvent>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    let values: Vec<serde_json::Value> = serde_json::from_str(&content)
        .with_context(|| format!("'{}' is not a JSON array", path.display()))?;

    let mut events = Vec::with_capacity(values.len());
    for (idx, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<AttendanceEvent>(value) {
            Ok(e) => events.push(e),
            Err(e) => log::warn!("Skipping entry #{} of {:?}: {}", idx, path, e),
        }
    }
    Ok(events)
}
