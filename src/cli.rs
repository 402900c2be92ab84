// File: ./src/cli.rs
//! Command-line parsing and command dispatch for the `attendo` binary.

use crate::analysis::monthly::{self, COLUMNS, Reason};
use crate::analysis::{self, ChecklistStore, checklist};
use crate::cache::EventCache;
use crate::calendar::{AcademicYear, DayKind, HolidayCalendar};
use crate::config::Config;
use crate::context::AppContext;
use crate::grouper::EpisodeGrouper;
use crate::holidays::{self, JsonHolidaySource};
use crate::ingest;
use crate::model::{AttendanceEvent, MarkKind, Roster};
use crate::notify::{Notifier, send_alerts};
use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate, Weekday};
use std::io::Write;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use unicode_width::UnicodeWidthStr;

pub fn print_help(binary_name: &str) {
    println!(
        "Attendo v{} - Attendance episode grouping and reporting for homeroom teachers",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("USAGE:");
    println!("    {} [--root <path>] [--verbose] [--notify] <command>", binary_name);
    println!();
    println!("OPTIONS:");
    println!("    -r, --root <path>     Use a different directory for config and data.");
    println!("    -v, --verbose         Print debug logging to stderr.");
    println!("    -n, --notify          Also send alerts as desktop notifications.");
    println!("    -h, --help            Show this help message.");
    println!();
    println!("CALENDAR:");
    println!("    school-day <YYYY-MM-DD>          Is the date an instructional day?");
    println!("    count <start> <end>              Instructional days in the inclusive range");
    println!("    holidays <schedule.tsv>          Extract holidays from the yearly schedule");
    println!();
    println!("DATA:");
    println!("    import-roster <file.tsv>         Load the class roster (number, name)");
    println!("    import <month> <file.tsv|json>   Load one month of attendance marks");
    println!();
    println!("REPORTS:");
    println!("    episodes <month>                 Grouped episodes of a month");
    println!("    monthly <month>                  Every mark of a month, documents flagged");
    println!("    class-stats <month>              Per-student tallies by kind and reason");
    println!("    calendar <month>                 Month grid with holidays and mark counts");
    println!("    weekly <month>                   Marks per student, week by week");
    println!("    long-absence                     Cumulative/consecutive absence ladder");
    println!("    field-trips                      Field-trip usage against the limits");
    println!("    menstrual                        Menstrual leave against the monthly limits");
    println!("    checklist <month>                Evidence checklist");
    println!("    mark <name> <MM.DD>              Record documents as submitted");
    println!("    merge-checklist <file.json>      Merge a checklist update file");
    println!("    briefing [YYYY-MM-DD]            Who is out today");
    println!("    reminders [YYYY-MM-DD]           Overdue supporting documents");
    println!();
    println!("Schedule and attendance sheets are read as tab-separated exports.");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SchoolDay(NaiveDate),
    Count(NaiveDate, NaiveDate),
    ImportRoster(PathBuf),
    Import(u32, PathBuf),
    Episodes(u32),
    Monthly(u32),
    ClassStats(u32),
    Calendar(u32),
    Weekly(u32),
    LongAbsence,
    FieldTrips,
    Menstrual,
    Checklist(u32),
    Mark(String, String),
    MergeChecklist(PathBuf),
    Briefing(Option<NaiveDate>),
    Reminders(Option<NaiveDate>),
    Holidays(PathBuf),
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    pub root: Option<PathBuf>,
    pub verbose: bool,
    pub notify: bool,
    pub command: Command,
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

fn parse_month(s: &str) -> Result<u32> {
    match s.trim().parse::<u32>() {
        Ok(m) if (1..=12).contains(&m) => Ok(m),
        _ => bail!("Invalid month '{}', expected 1-12", s),
    }
}

fn positional<'a>(rest: &[&'a str], n: usize, what: &str) -> Result<&'a str> {
    rest.get(n)
        .copied()
        .ok_or_else(|| anyhow::anyhow!("Missing argument: {}", what))
}

/// `args` excludes the binary name.
pub fn parse_args(args: &[String]) -> Result<Cli> {
    let mut root = None;
    let mut verbose = false;
    let mut notify = false;
    let mut rest: Vec<&str> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--root" | "-r" => {
                let Some(path) = args.get(i + 1) else {
                    bail!("--root requires a path");
                };
                root = Some(PathBuf::from(path));
                i += 1;
            }
            "--verbose" | "-v" => verbose = true,
            "--notify" | "-n" => notify = true,
            "--help" | "-h" => rest.push("help"),
            other => rest.push(other),
        }
        i += 1;
    }

    let arg = |n: usize, what: &str| positional(&rest, n, what);

    let command = match rest.first().copied() {
        None | Some("help") => Command::Help,
        Some("school-day") => Command::SchoolDay(parse_date(arg(1, "date")?)?),
        Some("count") => Command::Count(
            parse_date(arg(1, "start date")?)?,
            parse_date(arg(2, "end date")?)?,
        ),
        Some("import-roster") => Command::ImportRoster(PathBuf::from(arg(1, "roster file")?)),
        Some("import") => Command::Import(
            parse_month(arg(1, "month")?)?,
            PathBuf::from(arg(2, "attendance file")?),
        ),
        Some("episodes") => Command::Episodes(parse_month(arg(1, "month")?)?),
        Some("monthly") => Command::Monthly(parse_month(arg(1, "month")?)?),
        Some("class-stats") => Command::ClassStats(parse_month(arg(1, "month")?)?),
        Some("calendar") => Command::Calendar(parse_month(arg(1, "month")?)?),
        Some("weekly") => Command::Weekly(parse_month(arg(1, "month")?)?),
        Some("long-absence") => Command::LongAbsence,
        Some("field-trips") => Command::FieldTrips,
        Some("menstrual") => Command::Menstrual,
        Some("checklist") => Command::Checklist(parse_month(arg(1, "month")?)?),
        Some("mark") => Command::Mark(
            arg(1, "name")?.to_string(),
            checklist::normalize_date_key(arg(2, "MM.DD")?)?,
        ),
        Some("merge-checklist") => Command::MergeChecklist(PathBuf::from(arg(1, "update file")?)),
        Some("briefing") => Command::Briefing(rest.get(1).map(|s| parse_date(s)).transpose()?),
        Some("reminders") => Command::Reminders(rest.get(1).map(|s| parse_date(s)).transpose()?),
        Some("holidays") => Command::Holidays(PathBuf::from(arg(1, "schedule file")?)),
        Some(other) => bail!("Unknown command '{}'. Try --help.", other),
    };

    Ok(Cli {
        root,
        verbose,
        notify,
        command,
    })
}

/// Left-aligns `s` to `width` terminal columns (Hangul names are double width).
fn pad(s: &str, width: usize) -> String {
    let w = UnicodeWidthStr::width(s);
    format!("{}{}", s, " ".repeat(width.saturating_sub(w)))
}

fn name_width<'a, I: IntoIterator<Item = &'a str>>(names: I) -> usize {
    names
        .into_iter()
        .map(UnicodeWidthStr::width)
        .max()
        .unwrap_or(0)
        .max(4)
}

fn load_roster(ctx: &dyn AppContext, config: &Config) -> Result<Roster> {
    match EventCache::load_roster(ctx)? {
        Some(cached) => {
            if !cached.is_fresh(config.roster_cache_max_age()) {
                log::warn!(
                    "Roster was imported {} days ago, consider re-importing",
                    cached.age().num_days()
                );
            }
            Ok(cached.data)
        }
        None => {
            log::warn!("No roster imported yet, run `import-roster` first");
            Ok(Roster::new())
        }
    }
}

fn load_month(ctx: &dyn AppContext, config: &Config, month: u32) -> Result<Vec<AttendanceEvent>> {
    let year = AcademicYear::new(config.academic_year).year_of_month(month);
    match EventCache::load_month(ctx, year, month)? {
        Some(cached) => {
            if !cached.is_fresh(config.event_cache_max_age()) {
                log::info!(
                    "{}-{:02} data is {} minutes old",
                    year,
                    month,
                    cached.age().num_minutes()
                );
            }
            Ok(cached.data)
        }
        None => Ok(Vec::new()),
    }
}

fn load_year(ctx: &dyn AppContext, config: &Config) -> Result<Vec<AttendanceEvent>> {
    let mut events = Vec::new();
    for month in AcademicYear::MONTHS {
        events.extend(load_month(ctx, config, month)?);
    }
    Ok(events)
}

fn publish(
    out: &mut dyn Write,
    notifier: Option<&dyn Notifier>,
    title: &str,
    alerts: &[String],
) -> Result<()> {
    if alerts.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "{}:", title)?;
    for line in alerts {
        writeln!(out, "  ! {}", line)?;
    }
    if let Some(n) = notifier
        && let Err(e) = send_alerts(n, title, alerts)
    {
        log::warn!("Failed to send notification: {:#}", e);
    }
    Ok(())
}

fn kind_label(kind: MarkKind) -> &'static str {
    match kind {
        MarkKind::Absence => "absent",
        MarkKind::Late => "late",
        MarkKind::EarlyLeave => "early",
        MarkKind::Partial => "partial",
        MarkKind::Other => "other",
    }
}

/// `MM.DD category period` for the weekly view.
fn describe_mark(event: &AttendanceEvent) -> String {
    let span = if event.start() == event.end() {
        event.date.format("%m.%d").to_string()
    } else {
        format!("{}~{}", event.start().format("%m.%d"), event.end().format("%m.%d"))
    };
    match &event.period {
        Some(p) => format!("{} {} {}", span, event.category, p),
        None => format!("{} {}", span, event.category),
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Runs one command. Output goes to `out`; alerts additionally go to
/// `notifier` when one is given.
pub fn run(
    command: &Command,
    ctx: &dyn AppContext,
    out: &mut dyn Write,
    notifier: Option<&dyn Notifier>,
) -> Result<()> {
    let config = Config::load_or_default(ctx)?;
    let calendar = HolidayCalendar::new(JsonHolidaySource::from_context(ctx, &config));
    let academic_year = AcademicYear::new(config.academic_year);

    match command {
        Command::Help => print_help("attendo"),

        Command::SchoolDay(date) => {
            let kind = match calendar.day_kind(*date) {
                DayKind::Instructional => "instructional day",
                DayKind::Weekend => "weekend",
                DayKind::Holiday => "holiday",
            };
            writeln!(out, "{} ({}): {}", date, date.format("%a"), kind)?;
        }

        Command::Count(start, end) => {
            writeln!(out, "{}", calendar.instructional_day_count(*start, *end))?;
        }

        Command::ImportRoster(path) => {
            let roster = ingest::parse_roster(&ingest::read_tsv(path)?);
            if roster.is_empty() {
                bail!("No students found in '{}'", path.display());
            }
            EventCache::save_roster(ctx, &roster)?;
            writeln!(out, "Imported {} students", roster.len())?;
        }

        Command::Import(month, path) => {
            let events = if is_json(path) {
                ingest::read_events_json(path)?
            } else {
                let roster = load_roster(ctx, &config)?;
                ingest::parse_month_sheet(&ingest::read_tsv(path)?, *month, academic_year, &roster)?
            };
            let year = academic_year.year_of_month(*month);
            EventCache::save_month(ctx, year, *month, &events)?;
            writeln!(out, "Imported {} marks for {}-{:02}", events.len(), year, month)?;
        }

        Command::Episodes(month) => {
            let events = load_month(ctx, &config, *month)?;
            let report = EpisodeGrouper::new(&calendar).group_with_report(&events);
            let width = name_width(report.episodes.iter().map(|e| e.student_name.as_str()));
            for ep in &report.episodes {
                writeln!(
                    out,
                    "{:>3} {} {:<15} {:<12} {:>2}d{}",
                    ep.student_id.map(|n| n.to_string()).unwrap_or_default(),
                    pad(&ep.student_name, width),
                    ep.period_label(),
                    ep.category,
                    ep.instructional_day_count,
                    ep.period
                        .as_deref()
                        .map(|p| format!(" ({})", p))
                        .unwrap_or_default()
                )?;
            }
            if report.skipped_count() > 0 {
                writeln!(out, "({} malformed marks skipped)", report.skipped_count())?;
            }
        }

        Command::Monthly(month) => {
            let roster = load_roster(ctx, &config)?;
            let events = load_month(ctx, &config, *month)?;
            let year = academic_year.year_of_month(*month);
            let rows = monthly::monthly_detail(&roster, &events, year, *month);
            let width = name_width(rows.iter().map(|r| r.name.as_str()));
            for row in &rows {
                writeln!(
                    out,
                    "{} {} {:>3} {} {:<10} {:<8} {}",
                    if row.needs_documents { "*" } else { " " },
                    row.date.format("%Y.%m.%d"),
                    row.number,
                    pad(&row.name, width),
                    row.category,
                    row.period,
                    row.reason
                )?;
            }
            if rows.is_empty() {
                writeln!(out, "No marks for {}-{:02}", year, month)?;
            } else {
                writeln!(out, "({} marks, * = documents required)", rows.len())?;
            }
        }

        Command::ClassStats(month) => {
            let roster = load_roster(ctx, &config)?;
            let events = load_month(ctx, &config, *month)?;
            let year = academic_year.year_of_month(*month);
            let Some(report) = monthly::class_stats(&calendar, &roster, &events, year, *month)
            else {
                bail!("Invalid month {}", month);
            };
            writeln!(
                out,
                "{} ({} school days)",
                report.period_label(),
                report.school_days
            )?;
            let reasons: Vec<String> = Reason::iter().map(|r| r.to_string()).collect();
            writeln!(out, "columns per kind: {}", reasons.join("/"))?;

            let width = name_width(report.rows.iter().map(|r| r.name.as_str()));
            let mut header = format!("{:>3} {}", "No", pad("Name", width));
            for kind in COLUMNS {
                header.push_str(&format!(" {:>9}", kind_label(kind)));
            }
            header.push_str("  totals");
            writeln!(out, "{}", header)?;

            for row in &report.rows {
                let mut line = format!("{:>3} {}", row.number, pad(&row.name, width));
                for kind in COLUMNS {
                    let cells: Vec<String> = Reason::iter()
                        .map(|r| row.count(kind, r).to_string())
                        .collect();
                    line.push_str(&format!(" {:>9}", cells.join("/")));
                }
                let totals: Vec<String> = COLUMNS
                    .iter()
                    .map(|k| row.total(*k).len().to_string())
                    .collect();
                line.push_str(&format!("  {}", totals.join("/")));
                writeln!(out, "{}", line)?;
            }
        }

        Command::Calendar(month) => {
            let events = load_month(ctx, &config, *month)?;
            let year = academic_year.year_of_month(*month);
            let Some(weeks) = analysis::month_grid(&calendar, year, *month, &events) else {
                bail!("Invalid month {}", month);
            };
            writeln!(out, "{}-{:02}", year, month)?;
            let names: Vec<String> = [
                Weekday::Sun,
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
            ]
            .iter()
            .map(|w| format!("{:<6}", w.to_string()))
            .collect();
            writeln!(out, "{}", names.concat().trim_end())?;
            for week in &weeks {
                let cells: Vec<String> = week
                    .iter()
                    .map(|cell| {
                        if cell.is_padding() {
                            return " ".repeat(6);
                        }
                        let mark = if cell.color_class() == "holiday" { "*" } else { "" };
                        let count = if cell.events.is_empty() {
                            String::new()
                        } else {
                            format!("+{}", cell.events.len())
                        };
                        format!("{:<6}", format!("{:>2}{}{}", cell.day, mark, count))
                    })
                    .collect();
                writeln!(out, "{}", cells.concat().trim_end())?;
            }
            writeln!(out, "(* holiday, +N marks)")?;
        }

        Command::Weekly(month) => {
            let roster = load_roster(ctx, &config)?;
            let events = load_year(ctx, &config)?;
            let year = academic_year.year_of_month(*month);
            let width = name_width(roster.values().map(String::as_str));
            for window in analysis::weekly_summary(year, *month, &roster, &events) {
                writeln!(out, "{}", window.label())?;
                let mut any = false;
                for (number, name, evs) in &window.students {
                    if evs.is_empty() {
                        continue;
                    }
                    any = true;
                    let marks: Vec<String> = evs.iter().map(describe_mark).collect();
                    writeln!(out, "  {:>3} {} {}", number, pad(name, width), marks.join(", "))?;
                }
                if !any {
                    writeln!(out, "  (no marks)")?;
                }
            }
        }

        Command::Menstrual => {
            let roster = load_roster(ctx, &config)?;
            let events = load_year(ctx, &config)?;
            let report = analysis::menstrual::analyze(
                &calendar,
                &roster,
                &events,
                academic_year,
                &config.menstrual,
            );
            let width = name_width(report.rows.iter().map(|r| r.name.as_str()));
            let mut listed = 0;
            for row in report.rows.iter().filter(|r| r.is_used()) {
                listed += 1;
                writeln!(out, "{:>3} {}", row.number, pad(&row.name, width))?;
                for m in &row.months {
                    if let Some(summary) = m.summary(&config.menstrual) {
                        writeln!(out, "      {:>2}: {}  [{}]", m.month, summary, m.detail())?;
                    }
                }
            }
            if listed == 0 {
                writeln!(out, "No menstrual leave recorded")?;
            }
            publish(out, notifier, "Menstrual leave", &report.alerts)?;
        }

        Command::LongAbsence => {
            let roster = load_roster(ctx, &config)?;
            let events = load_year(ctx, &config)?;
            let report =
                analysis::long_absence::analyze(&calendar, &roster, &events, &config.long_absence);
            let width = name_width(report.rows.iter().map(|r| r.name.as_str()));
            for row in &report.rows {
                writeln!(
                    out,
                    "{:>3} {} {:>3}  {}{}",
                    row.number,
                    pad(&row.name, width),
                    row.count,
                    row.status,
                    if row.long_streaks.is_empty() {
                        String::new()
                    } else {
                        format!("  [{}]", row.streak_summary())
                    }
                )?;
            }
            if report.rows.is_empty() {
                writeln!(out, "No counted absences")?;
            }
            publish(out, notifier, "Long-term absence", &report.alerts)?;
        }

        Command::FieldTrips => {
            let roster = load_roster(ctx, &config)?;
            let events = load_year(ctx, &config)?;
            let report =
                analysis::field_trip::analyze(&calendar, &roster, &events, &config.field_trip);
            let width = name_width(report.rows.iter().map(|r| r.name.as_str()));
            for row in &report.rows {
                let badges: Vec<&str> = row.violations.iter().map(|v| v.badge()).collect();
                writeln!(
                    out,
                    "{:>3} {} domestic {:>2}/{} (max run {}d)  international {:>2}/{}  {}",
                    row.number.map(|n| n.to_string()).unwrap_or_default(),
                    pad(&row.name, width),
                    row.domestic_days,
                    config.field_trip.domestic_total,
                    row.longest_domestic(),
                    row.international_days,
                    config.field_trip.international_total,
                    if badges.is_empty() {
                        "ok".to_string()
                    } else {
                        badges.join(", ")
                    }
                )?;
            }
            if report.rows.is_empty() {
                writeln!(out, "No field trips recorded")?;
            }
            publish(out, notifier, "Field trips", &report.alerts)?;
        }

        Command::Checklist(month) => {
            let events = load_month(ctx, &config, *month)?;
            let store = ChecklistStore::open(ctx)?;
            let rows = analysis::build_checklist(&calendar, &events, *month, &store);
            let width = name_width(rows.iter().map(|r| r.name.as_str()));
            for row in &rows {
                writeln!(
                    out,
                    "[{}] {:>2}. {} {:<15} {}{}",
                    if row.done { "x" } else { " " },
                    row.index,
                    pad(&row.name, width),
                    row.period,
                    row.category,
                    if row.annotation.is_empty() {
                        String::new()
                    } else {
                        format!(" [{}]", row.annotation)
                    }
                )?;
            }
            let done = rows.iter().filter(|r| r.done).count();
            writeln!(out, "{}/{} submitted", done, rows.len())?;
        }

        Command::Mark(name, start) => {
            let mut store = ChecklistStore::open(ctx)?;
            let key = store.mark_submitted(name, start)?;
            writeln!(out, "Marked {} as submitted", key)?;
        }

        Command::MergeChecklist(path) => {
            let mut store = ChecklistStore::open(ctx)?;
            let added = store.merge_update(path)?;
            writeln!(out, "Merged {} new entries", added)?;
        }

        Command::Briefing(date) => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let events = load_year(ctx, &config)?;
            match analysis::briefing(date, &events) {
                Some(b) => {
                    writeln!(out, "{} briefing ({} students)", date, b.total())?;
                    for line in b.lines() {
                        writeln!(out, "  {}", line)?;
                    }
                }
                None => writeln!(out, "{}: no attendance marks", date)?,
            }
        }

        Command::Reminders(date) => {
            let today = date.unwrap_or_else(|| Local::now().date_naive());
            let events = load_year(ctx, &config)?;
            let store = ChecklistStore::open(ctx)?;
            let reminders = analysis::document_reminders(
                &calendar,
                &events,
                today,
                &store,
                config.document_deadline_days,
            );
            if reminders.is_empty() {
                writeln!(out, "No overdue documents")?;
            }
            let lines: Vec<String> = reminders.iter().map(|r| r.line()).collect();
            for line in &lines {
                writeln!(out, "  {}", line)?;
            }
            if let Some(n) = notifier
                && let Err(e) = send_alerts(n, "Documents due", &lines)
            {
                log::warn!("Failed to send notification: {:#}", e);
            }
        }

        Command::Holidays(path) => {
            let rows = ingest::read_tsv(path)?;
            let entries = holidays::parse_schedule_grid(&rows, config.academic_year);
            let extracted = holidays::extract_holidays(&entries, config.academic_year);
            for (year, map) in holidays::split_by_year(&extracted) {
                let saved = holidays::save_holidays(ctx, year, &map)?;
                writeln!(out, "{}: {} holidays -> {}", year, map.len(), saved.display())?;
            }
        }
    }
    Ok(())
}
